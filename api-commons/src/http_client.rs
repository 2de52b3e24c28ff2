//! Outbound HTTP calls returning [`Outcome`]
//!
//! Every call succeeds with the decoded body or fails with a message built
//! from the response, so callers can hand the result straight to
//! [`failure_with`](crate::responses::failure_with).

use std::time::Duration;

use http::{
    header::{ACCEPT, CONTENT_TYPE, COOKIE},
    HeaderMap, HeaderValue, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    constants::JSON_MIME,
    error::{Error, Result},
    outcome::{Failure, Outcome},
};

/// Per-request extras
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Sent as `Authorization: Bearer <token>`
    pub bearer_token: Option<String>,
    /// Sent verbatim as the `Cookie` header
    pub sso_cookie: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn sso_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.sso_cookie = Some(cookie.into());
        self
    }
}

/// Failure for a non-2xx response
///
/// 400, 401 and 404 append the status code to the body: `"<body> -> 404"`.
/// Any other status keeps the body alone.
pub fn failure_from_status(status: StatusCode, body: &str) -> Failure {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
            Failure::new(format!("{} -> {}", body, status.as_u16()))
        }
        _ => Failure::new(body),
    }
}

fn decode<T: DeserializeOwned>(body: String) -> Outcome<T> {
    match serde_json::from_str(&body) {
        Ok(value) => Outcome::success(value),
        Err(e) => {
            tracing::debug!(error = %e, "response body is not the expected JSON");
            Outcome::failure(format!("Failed to deserialize {}", body))
        }
    }
}

/// JSON HTTP client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
}

impl ApiClient {
    /// Client sending `Accept` and `Content-Type: application/json` by default
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client as is
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: &RequestOptions) -> Outcome<T> {
        match self.get_text(url, options).await {
            Outcome::Success(body) => decode(body),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    pub async fn get_text(&self, url: &str, options: &RequestOptions) -> Outcome<String> {
        self.execute(self.client.get(url), options).await
    }

    pub async fn post<B, T>(&self, url: &str, body: &B, options: &RequestOptions) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.post_text(url, body, options).await {
            Outcome::Success(body) => decode(body),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    pub async fn post_text<B>(&self, url: &str, body: &B, options: &RequestOptions) -> Outcome<String>
    where
        B: Serialize + ?Sized,
    {
        self.execute(self.client.post(url).json(body), options).await
    }

    pub async fn put<B, T>(&self, url: &str, body: &B, options: &RequestOptions) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.execute(self.client.put(url).json(body), options).await {
            Outcome::Success(body) => decode(body),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// DELETE with an optional JSON body; an empty response body decodes as `()`
    pub async fn delete<B, T>(&self, url: &str, body: Option<&B>, options: &RequestOptions) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.delete(url);
        if let Some(body) = body {
            request = request.json(body);
        }

        match self.execute(request, options).await {
            Outcome::Success(body) if body.trim().is_empty() => decode("null".to_string()),
            Outcome::Success(body) => decode(body),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    async fn execute(&self, mut request: reqwest::RequestBuilder, options: &RequestOptions) -> Outcome<String> {
        if !options.params.is_empty() {
            request = request.query(&options.params);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &options.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(cookie) = &options.sso_cookie {
            request = request.header(COOKIE, cookie.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "outbound request failed");
                return Outcome::failure_from(Error::from(e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::failure_from(Error::from(e)),
        };

        if status.is_success() {
            Outcome::success(body)
        } else {
            tracing::debug!(status = status.as_u16(), "outbound request returned an error status");
            Outcome::Failure(failure_from_status(status, &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::HeaderMap as AxumHeaders,
        routing::{get, post},
        Json, Router,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        name: String,
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client() -> ApiClient {
        ApiClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_failure_from_status() {
        let failure = failure_from_status(StatusCode::NOT_FOUND, "{\"error\":\"missing\"}");
        assert_eq!(failure.message(), Some("{\"error\":\"missing\"} -> 404"));

        let failure = failure_from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(failure.message(), Some("boom"));
    }

    #[tokio::test]
    async fn test_get_with_params_and_token() {
        let app = Router::new().route(
            "/echo",
            get(|Query(q): Query<HashMap<String, String>>, headers: AxumHeaders| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(serde_json::json!({ "name": format!("{}|{}", q["name"], auth) }))
            }),
        );
        let base = spawn(app).await;

        let options = RequestOptions::new().param("name", "ana").bearer_token("t0k");
        let outcome: Outcome<Echo> = client().get(&format!("{}/echo", base), &options).await;

        assert_eq!(outcome.get_or_none().unwrap().name, "ana|Bearer t0k");
    }

    #[tokio::test]
    async fn test_post_decode_failure() {
        let app = Router::new().route("/text", post(|| async { "plain text" }));
        let base = spawn(app).await;

        let outcome: Outcome<Echo> = client()
            .post(&format!("{}/text", base), &serde_json::json!({}), &RequestOptions::new())
            .await;

        assert_eq!(outcome.message(), Some("Failed to deserialize plain text"));
    }

    #[tokio::test]
    async fn test_error_status_becomes_failure() {
        let app = Router::new().route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        );
        let base = spawn(app).await;

        let outcome = client()
            .get_text(&format!("{}/missing", base), &RequestOptions::new())
            .await;
        assert_eq!(outcome.message(), Some("nope -> 404"));
    }

    #[tokio::test]
    async fn test_transport_error_keeps_cause() {
        let outcome: Outcome<Value> = client()
            .get("http://127.0.0.1:1/unreachable", &RequestOptions::new())
            .await;
        assert!(outcome.is_failure());
        assert!(outcome.cause().is_some());
    }
}
