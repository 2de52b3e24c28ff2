//! Spring Boot Admin registration
//!
//! Registers this service with an admin server so its health, info and log
//! file endpoints show up in the admin UI. Registration is best effort:
//! callers log a returned error and keep serving.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::{
    config::{AdminClientConfig, Config},
    error::{Error, Result},
    health::{AppInfo, HealthStatus, InfoResponse},
};

/// Payload posted to the admin server
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub management_url: String,
    pub health_url: String,
    pub service_url: String,
    pub status_info: StatusInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    pub info: InfoResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub status: HealthStatus,
}

impl Registration {
    /// Describe this service as configured
    ///
    /// URLs are `<service_base_url><context path>`, falling back to
    /// `http://localhost:<port>` when no public base URL is set.
    pub fn from_config(config: &Config, admin: &AdminClientConfig) -> Self {
        let service = &config.service;
        let base_url = admin
            .service_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", service.port));
        let service_url = format!("{}{}", base_url, service.base_path());

        Self {
            name: admin
                .instance_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| service.name.clone()),
            management_url: format!("{}/admin", service_url),
            health_url: format!("{}/admin/health", service_url),
            service_url,
            status_info: StatusInfo {
                status: HealthStatus::Up,
            },
            metadata: None,
            info: InfoResponse {
                app: AppInfo {
                    name: service.name.clone(),
                },
                version: service.version.clone(),
            },
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Client for the admin server's instance registry
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: reqwest::Client,
}

impl Default for AdminClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl AdminClient {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Register with the configured admin server
    ///
    /// Returns `Ok(false)` without any request when the admin URL or the
    /// credentials are missing.
    pub async fn register(&self, config: &Config) -> Result<bool> {
        let Some(admin) = config.admin.as_ref() else {
            tracing::debug!("Spring Boot Admin not configured, skipping registration");
            return Ok(false);
        };

        let (Some(username), Some(password)) = (admin.username.as_deref(), admin.password.as_deref())
        else {
            tracing::debug!("Spring Boot Admin credentials missing, skipping registration");
            return Ok(false);
        };

        if admin.url.trim().is_empty() {
            return Ok(false);
        }

        let registration = Registration::from_config(config, admin);
        let endpoint = format!("{}{}", admin.url.trim_end_matches('/'), admin.api_path);

        let response = self
            .client
            .post(&endpoint)
            .basic_auth(username, Some(password))
            .json(&registration)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::External(format!(
                "Spring Boot Admin registration failed: {} - {}",
                status, body
            )));
        }

        tracing::info!(
            endpoint = %endpoint,
            instance = %registration.name,
            "Registered with Spring Boot Admin: {}",
            body
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    fn admin_config(url: &str) -> AdminClientConfig {
        AdminClientConfig {
            url: url.to_string(),
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            api_path: "/instances".to_string(),
            instance_name: None,
            service_base_url: Some("https://orders.example.com/".to_string()),
        }
    }

    #[test]
    fn test_registration_urls() {
        let mut config = Config::default();
        config.service.name = "orders".to_string();

        let registration = Registration::from_config(&config, &admin_config("http://admin"));
        assert_eq!(registration.name, "orders");
        assert_eq!(registration.service_url, "https://orders.example.com/api");
        assert_eq!(registration.health_url, "https://orders.example.com/api/admin/health");
        assert_eq!(registration.management_url, "https://orders.example.com/api/admin");

        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["statusInfo"]["status"], "UP");
        assert_eq!(json["info"]["app"]["name"], "orders");
        assert!(json.get("metadata").is_none());
    }

    #[tokio::test]
    async fn test_register_skipped_without_config() {
        let client = AdminClient::default();
        assert!(!client.register(&Config::default()).await.unwrap());

        let mut config = Config::default();
        let mut admin = admin_config("http://admin");
        admin.password = None;
        config.admin = Some(admin);
        assert!(!client.register(&config).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_posts_payload() {
        let received: Arc<Mutex<Option<(Value, Option<String>)>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&received);
        let app = Router::new().route(
            "/instances",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    *sink.lock().unwrap() = Some((body, auth));
                    Json(serde_json::json!({"id": "abc"}))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = Config::default();
        config.admin = Some(admin_config(&format!("http://{}", addr)));

        assert!(AdminClient::default().register(&config).await.unwrap());

        let (body, auth) = received.lock().unwrap().clone().unwrap();
        assert_eq!(body["name"], "Application Name");
        assert!(auth.unwrap().starts_with("Basic "));
    }
}
