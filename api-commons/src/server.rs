//! HTTP server with graceful shutdown

use axum::{middleware::from_fn_with_state, Extension, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    error::Result,
    health,
    middleware::{
        api_version_layer, localize_errors, request_id_layer, request_id_propagation_layer,
        sensitive_headers_layer, server_header_layer,
    },
    state::AppState,
};

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server with the given application routes
    ///
    /// The state is built from the server's configuration.
    pub async fn serve(self, app: Router<AppState>) -> Result<()> {
        let state = AppState::new(self.config.clone());
        self.serve_with_state(app, state).await
    }

    /// Run the server with the given application routes and state
    pub async fn serve_with_state(self, app: Router<AppState>, state: AppState) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!("Starting {} on {}", self.config.service.name, addr);
        self.log_startup();

        let app = Self::router(app, state);

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(
            "Server listening on {}{}",
            addr,
            self.config.service.base_path()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Full router without binding a socket
    ///
    /// Application and admin routes are nested under the context path and
    /// wrapped in the middleware stack. The state's translations reach
    /// handlers as an `Arc<Translations>` extension and re-render error
    /// envelopes through [`localize_errors`].
    pub fn router(app: Router<AppState>, state: AppState) -> Router {
        let config = state.config().clone();
        let translations = state.translations().clone();
        let routes = app.merge(health::routes()).with_state(state);

        let base_path = config.service.base_path();
        let routes = if base_path.is_empty() {
            routes
        } else {
            Router::new().nest(&base_path, routes)
        };

        let body_limit = config.middleware.body_limit_mb * 1024 * 1024;
        let cors_layer = build_cors_layer(&config.middleware.cors_mode);

        // Layers are applied bottom-up; the last one wraps everything
        let mut app = routes
            .layer(from_fn_with_state(translations.clone(), localize_errors))
            .layer(Extension(translations))
            .layer(Extension(config.pagination))
            .layer(api_version_layer(&config.service.version))
            .layer(server_header_layer(&config.middleware.server_header))
            .layer(cors_layer);

        if config.middleware.compression {
            app = app.layer(CompressionLayer::new());
        }

        let mut app = app
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                config.service.timeout(),
            ))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(sensitive_headers_layer())
            .layer(request_id_propagation_layer())
            .layer(request_id_layer());

        if config.middleware.catch_panic {
            app = app.layer(CatchPanicLayer::new());
        }

        app
    }

    /// Log stage, environment and middleware configuration
    fn log_startup(&self) {
        let service = &self.config.service;
        tracing::info!("Stage: {}", service.stage);
        if service.is_dev() || service.is_test() {
            tracing::info!("Environment: {:?}", self.config.service);
            tracing::info!("Docs: {:?}", self.config.docs);
        }

        match &self.config.database {
            // DatabaseConfig's Debug redacts the password
            Some(database) => tracing::info!("Database: {:?}", database),
            None => tracing::info!("Database: not configured"),
        }

        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: {}", self.config.middleware.catch_panic);
        tracing::info!("  - Request ID tracking: enabled");
        tracing::info!("  - Sensitive header masking: enabled");
        tracing::info!(
            "  - Request body limit: {} MB",
            self.config.middleware.body_limit_mb
        );
        tracing::info!("  - Compression: {}", self.config.middleware.compression);
        tracing::info!("  - CORS mode: {}", self.config.middleware.cors_mode);
        tracing::info!("  - Request timeout: {} seconds", service.timeout_secs);
        tracing::info!(
            "  - Default page size: {}",
            self.config.pagination.default_page_size
        );
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Build CORS layer based on configuration
fn build_cors_layer(mode: &str) -> CorsLayer {
    match mode {
        "permissive" => {
            tracing::debug!("Enabling permissive CORS");
            CorsLayer::permissive()
        }
        "restrictive" => {
            tracing::debug!("Enabling restrictive CORS (default deny)");
            CorsLayer::new()
        }
        "disabled" => {
            tracing::debug!("CORS disabled (using restrictive)");
            CorsLayer::new()
        }
        _ => {
            tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", mode);
            CorsLayer::permissive()
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::i18n::{keys, Locale, Localizer, Translations};
    use crate::pageable::Pageable;
    use crate::responses::failure_with;
    use axum::{body::Body, http::Request, http::StatusCode, response::Response, routing::get};
    use tower::ServiceExt;

    async fn page_size(pageable: Pageable) -> String {
        pageable.page_size().to_string()
    }

    async fn rejected(localizer: Localizer) -> Response {
        failure_with(None, &localizer)
    }

    async fn missing() -> Result<String> {
        Err(Error::NotFound(String::new()))
    }

    fn app() -> Router<AppState> {
        Router::new()
            .route("/items", get(page_size))
            .route("/rejected", get(rejected))
            .route("/missing", get(missing))
    }

    async fn get_path(router: Router, uri: &str) -> (StatusCode, http::HeaderMap, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[test]
    fn test_server_creation() {
        let config = Config::default();
        let server = Server::new(config.clone());
        assert_eq!(server.config().service.port, config.service.port);
    }

    #[tokio::test]
    async fn test_routes_nested_under_context_path() {
        let router = Server::router(app(), AppState::default());

        let (status, headers, body) = get_path(router.clone(), "/api/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "beta");
        assert_eq!(headers["api-version"], "beta");
        assert_eq!(headers["server"], "api-commons");
        assert!(headers.contains_key("x-request-id"));

        let (status, _, _) = get_path(router, "/ping").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_root_context_path() {
        let mut config = Config::default();
        config.service.context_path = "/".to_string();

        let router = Server::router(app(), AppState::new(config));
        let (status, _, _) = get_path(router, "/admin/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_configured_page_size_reaches_extractor() {
        let mut config = Config::default();
        config.pagination.default_page_size = 7;

        let router = Server::router(app(), AppState::new(config));
        let (_, _, body) = get_path(router, "/api/items").await;
        assert_eq!(body, "7");
    }

    #[tokio::test]
    async fn test_state_translations_reach_error_envelopes() {
        let translations = Translations::default()
            .with_entry(Locale::EnUs, keys::BAD_REQUEST, "Request rejected")
            .with_entry(Locale::EnUs, keys::NOT_FOUND_SERVER_ERROR, "Nothing here");
        let state = AppState::builder().translations(translations).build();
        let router = Server::router(app(), state);

        let (status, _, body) = get_path(router.clone(), "/api/rejected").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["errors"]["BAD_REQUEST_400"][0], "Request rejected");

        let (status, _, body) = get_path(router.clone(), "/api/items?pageNumber=x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["errors"]["BAD_REQUEST_400"][0], "Request rejected");

        let (status, _, body) = get_path(router, "/api/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["errors"]["NotFound"][0], "Nothing here");
    }

    #[tokio::test]
    async fn test_default_state_keeps_built_in_messages() {
        let router = Server::router(app(), AppState::default());
        let (_, _, body) = get_path(router, "/api/rejected").await;
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body["errors"]["BAD_REQUEST_400"][0],
            "Your request does not meet the needs to complete."
        );
    }
}
