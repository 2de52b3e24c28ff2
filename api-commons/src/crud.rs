//! CRUD route registration
//!
//! A [`CrudHandler`] implements the five common operations on one resource;
//! [`register_crud`] mounts them on a router:
//!
//! | method | path          | operation | success |
//! |--------|---------------|-----------|---------|
//! | GET    | `/users`      | get_all   | 200     |
//! | POST   | `/users`      | create    | 201     |
//! | GET    | `/users/{id}` | get_one   | 200     |
//! | PUT    | `/users/{id}` | update    | 200     |
//! | DELETE | `/users/{id}` | delete    | 204     |
//!
//! Failed outcomes are answered with the error envelope in the locale of
//! the request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::i18n::Localizer;
use crate::outcome::Outcome;
use crate::pageable::Pageable;
use crate::responses::{bad_request, failure_with, NoContent};

const MISSING_BASE: &str =
    "CrudHandler requires a resource base at the beginning of the provided path e.g. '/users/{user-id}'";
const MISSING_PARAM: &str =
    "CrudHandler requires a path-parameter at the end of the provided path e.g. '/users/{user-id}'";

/// The five operations on one resource
pub trait CrudHandler: Send + Sync + 'static {
    /// Representation returned to clients
    type Item: Serialize + Send + 'static;
    /// Body accepted by `create`
    type Create: DeserializeOwned + Send + 'static;
    /// Body accepted by `update`
    type Update: DeserializeOwned + Send + 'static;

    fn get_all(&self, pageable: Pageable)
        -> impl Future<Output = Outcome<Pageable<Self::Item>>> + Send;

    fn get_one(&self, id: String) -> impl Future<Output = Outcome<Self::Item>> + Send;

    fn create(&self, dto: Self::Create) -> impl Future<Output = Outcome<Self::Item>> + Send;

    fn update(
        &self,
        id: String,
        dto: Self::Update,
    ) -> impl Future<Output = Outcome<Self::Item>> + Send;

    fn delete(&self, id: String) -> impl Future<Output = Outcome<()>> + Send;
}

/// A validated resource path: `/users` plus the parameter name `user-id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub base: String,
    pub param: String,
}

impl ResourcePath {
    /// Parse `/users/{user-id}` or the legacy `/users/:user-id`
    ///
    /// A missing leading `/` is added. Legacy `:name` segments anywhere in
    /// the path are rewritten to `{name}`.
    pub fn parse(path: &str) -> Result<Self> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let segments: Vec<String> = path.split('/').skip(1).map(normalize_segment).collect();

        if segments.first().is_some_and(|s| is_param(s)) {
            return Err(Error::BadRequest(MISSING_BASE.to_string()));
        }

        let param = match segments.last() {
            Some(last) if segments.len() > 1 && is_param(last) => {
                last[1..last.len() - 1].to_string()
            }
            _ => return Err(Error::BadRequest(MISSING_PARAM.to_string())),
        };

        let base = format!("/{}", segments[..segments.len() - 1].join("/"));
        Ok(Self { base, param })
    }

    /// Route of a single item, `/users/{user-id}`
    pub fn item(&self) -> String {
        format!("{}/{{{}}}", self.base, self.param)
    }
}

fn is_param(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

fn normalize_segment(segment: &str) -> String {
    match segment.strip_prefix(':') {
        Some(name) if !name.is_empty() => format!("{{{}}}", name),
        _ => segment.to_string(),
    }
}

fn respond<T: Serialize>(
    outcome: Outcome<T>,
    status: StatusCode,
    localizer: &Localizer,
) -> Response {
    match outcome {
        Outcome::Success(value) => (status, Json(value)).into_response(),
        Outcome::Failure(failure) => failure_with(Some(&failure), localizer),
    }
}

type PathParams = std::result::Result<Path<HashMap<String, String>>, PathRejection>;

fn resource_id(
    params: PathParams,
    name: &str,
    localizer: &Localizer,
) -> std::result::Result<String, Response> {
    let Path(mut params) = params.map_err(|e| bad_request(localizer, Some(&e.body_text())))?;
    params
        .remove(name)
        .ok_or_else(|| bad_request(localizer, None))
}

/// Mount `handler` on `router` under `path`
///
/// Fails with [`Error::BadRequest`] when `path` starts with a parameter or
/// does not end with one.
pub fn register_crud<S, H>(router: Router<S>, path: &str, handler: H) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
    H: CrudHandler,
{
    let resource = ResourcePath::parse(path)?;
    let handler = Arc::new(handler);

    tracing::debug!(
        base = %resource.base,
        item = %resource.item(),
        "registering CRUD routes"
    );

    let collection = {
        let list = Arc::clone(&handler);
        let create = Arc::clone(&handler);
        get(move |localizer: Localizer, pageable: Pageable| {
            let handler = Arc::clone(&list);
            async move { respond(handler.get_all(pageable).await, StatusCode::OK, &localizer) }
        })
        .post(
            move |localizer: Localizer, body: std::result::Result<Json<H::Create>, JsonRejection>| {
                let handler = Arc::clone(&create);
                async move {
                    match body {
                        Ok(Json(dto)) => {
                            respond(handler.create(dto).await, StatusCode::CREATED, &localizer)
                        }
                        Err(e) => bad_request(&localizer, Some(&e.body_text())),
                    }
                }
            },
        )
    };

    let item = {
        let (one, update, delete) = (
            Arc::clone(&handler),
            Arc::clone(&handler),
            Arc::clone(&handler),
        );
        let (one_name, update_name, delete_name) = (
            resource.param.clone(),
            resource.param.clone(),
            resource.param.clone(),
        );

        get(move |localizer: Localizer, params: PathParams| {
            let handler = Arc::clone(&one);
            let name = one_name.clone();
            async move {
                match resource_id(params, &name, &localizer) {
                    Ok(id) => respond(handler.get_one(id).await, StatusCode::OK, &localizer),
                    Err(response) => response,
                }
            }
        })
        .put(
            move |localizer: Localizer,
                  params: PathParams,
                  body: std::result::Result<Json<H::Update>, JsonRejection>| {
                let handler = Arc::clone(&update);
                let name = update_name.clone();
                async move {
                    let id = match resource_id(params, &name, &localizer) {
                        Ok(id) => id,
                        Err(response) => return response,
                    };
                    match body {
                        Ok(Json(dto)) => {
                            respond(handler.update(id, dto).await, StatusCode::OK, &localizer)
                        }
                        Err(e) => bad_request(&localizer, Some(&e.body_text())),
                    }
                }
            },
        )
        .delete(move |localizer: Localizer, params: PathParams| {
            let handler = Arc::clone(&delete);
            let name = delete_name.clone();
            async move {
                let id = match resource_id(params, &name, &localizer) {
                    Ok(id) => id,
                    Err(response) => return response,
                };
                match handler.delete(id).await {
                    Outcome::Success(()) => NoContent.into_response(),
                    Outcome::Failure(failure) => failure_with(Some(&failure), &localizer),
                }
            }
        })
    };

    Ok(router
        .route(&resource.base, collection)
        .route(&resource.item(), item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pageable::{paginate, VecSource};
    use axum::{body::Body, http::Request};
    use serde::Deserialize;
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Debug, Clone, Serialize)]
    struct Book {
        id: String,
        title: String,
    }

    #[derive(Debug, Deserialize)]
    struct NewBook {
        title: String,
    }

    #[derive(Default)]
    struct Books {
        rows: Mutex<Vec<Book>>,
    }

    impl Books {
        fn find(&self, id: &str) -> Option<Book> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.id == id)
                .cloned()
        }
    }

    impl CrudHandler for Books {
        type Item = Book;
        type Create = NewBook;
        type Update = NewBook;

        async fn get_all(&self, pageable: Pageable) -> Outcome<Pageable<Book>> {
            let source = VecSource::new(self.rows.lock().unwrap().clone());
            paginate(&source, pageable).await.into()
        }

        async fn get_one(&self, id: String) -> Outcome<Book> {
            match self.find(&id) {
                Some(book) => Outcome::success(book),
                None => Outcome::failure(format!("book {} not found", id)),
            }
        }

        async fn create(&self, dto: NewBook) -> Outcome<Book> {
            let mut rows = self.rows.lock().unwrap();
            let book = Book {
                id: (rows.len() + 1).to_string(),
                title: dto.title,
            };
            rows.push(book.clone());
            Outcome::success(book)
        }

        async fn update(&self, id: String, dto: NewBook) -> Outcome<Book> {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|b| b.id == id) {
                Some(book) => {
                    book.title = dto.title;
                    Outcome::success(book.clone())
                }
                None => Outcome::failure_from(Error::Unauthorized("read only".into())),
            }
        }

        async fn delete(&self, id: String) -> Outcome<()> {
            self.rows.lock().unwrap().retain(|b| b.id != id);
            Outcome::success(())
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[test]
    fn test_parse_resource_paths() {
        let resource = ResourcePath::parse("users/:user-id").unwrap();
        assert_eq!(resource.base, "/users");
        assert_eq!(resource.param, "user-id");
        assert_eq!(resource.item(), "/users/{user-id}");

        let nested = ResourcePath::parse("/orgs/{org}/members/{member}").unwrap();
        assert_eq!(nested.base, "/orgs/{org}/members");
        assert_eq!(nested.param, "member");
    }

    #[test]
    fn test_parse_rejects_invalid_paths() {
        let err = ResourcePath::parse("/:id").unwrap_err();
        assert!(err.to_string().contains("resource base"));

        let err = ResourcePath::parse("/users").unwrap_err();
        assert!(err.to_string().contains("path-parameter"));

        assert!(ResourcePath::parse("/users/{id}/books").is_err());
        assert!(ResourcePath::parse("/users/").is_err());
    }

    #[tokio::test]
    async fn test_crud_lifecycle() {
        let app = register_crud(Router::new(), "/books/{book-id}", Books::default()).unwrap();

        let (status, created) = send(&app, "POST", "/books", Some(serde_json::json!({"title": "Dune"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Dune");

        let (status, page) = send(&app, "GET", "/books?pageSize=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalSize"], 1);
        assert_eq!(page["pageSize"], 5);
        assert_eq!(page["result"][0]["id"], "1");

        let (status, updated) =
            send(&app, "PUT", "/books/1", Some(serde_json::json!({"title": "Emma"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Emma");

        let (status, _) = send(&app, "DELETE", "/books/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", "/books/1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["BAD_REQUEST_400"].is_array());
    }

    #[tokio::test]
    async fn test_unauthorized_failure_maps_to_401() {
        let app = register_crud(Router::new(), "/books/:id", Books::default()).unwrap();
        let (status, body) =
            send(&app, "PUT", "/books/99", Some(serde_json::json!({"title": "x"}))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["errors"]["UNAUTHORIZED_401"].is_array());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = register_crud(Router::new(), "/books/{id}", Books::default()).unwrap();
        let (status, _) = send(&app, "POST", "/books", Some(serde_json::json!({"name": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_page_number_uses_envelope_and_locale() {
        let app = register_crud(Router::new(), "/books/{id}", Books::default()).unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/books?pageNumber=x")
                    .header("accept-language", "pt-BR")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body["errors"]["BAD_REQUEST_400"][0],
            "Sua requisição não atende as necessidades para ser concluída."
        );
        assert!(body["errors"].get("BadRequest").is_none());
    }
}
