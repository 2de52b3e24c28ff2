//! # api-commons
//!
//! Starter kit for REST services on axum.
//!
//! ## Features
//!
//! - **Outcome**: a success/failure wrapper with map, recover and fold combinators
//! - **Pagination**: a `Pageable` descriptor extracted from the query string
//! - **CRUD registration**: five routes from one handler trait
//! - **Error envelope**: translated `{"errors": {...}}` bodies in English or Portuguese
//! - **Configuration**: TOML files, prefixed and legacy environment variables
//! - **Admin endpoints**: Spring Boot Admin compatible health, info and log file
//! - **Graceful shutdown**: SIGTERM and SIGINT handling
//!
//! ## Example
//!
//! ```rust,no_run
//! use api_commons::prelude::*;
//!
//! async fn hello() -> &'static str {
//!     "hello"
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let app = Router::new().route("/hello", get(hello));
//!
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod admin_client;
pub mod config;
pub mod constants;
pub mod crud;
pub mod error;
pub mod health;
pub mod http_client;
pub mod i18n;
pub mod middleware;
pub mod observability;
pub mod outcome;
pub mod pageable;
pub mod request_ext;
pub mod responses;
pub mod server;
pub mod state;
pub mod time;

#[cfg(feature = "database")]
pub mod database;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::admin_client::AdminClient;
    pub use crate::config::{Config, PaginationConfig};
    pub use crate::crud::{register_crud, CrudHandler};
    pub use crate::error::{Error, ErrorResponse, Result};
    pub use crate::health::DatabaseProbe;
    pub use crate::http_client::{ApiClient, RequestOptions};
    pub use crate::i18n::{Locale, Localizer, Translations};
    pub use crate::observability::init_tracing;
    pub use crate::outcome::{catching, run_blocking, Failure, Outcome};
    pub use crate::pageable::{paginate, PageSource, PageWindow, Pageable, VecSource};
    pub use crate::responses::{
        bad_credentials, bad_request, failure_with, json_or_empty, ok, Created, NoContent,
    };
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder};

    #[cfg(feature = "database")]
    pub use crate::database::create_pool;

    pub use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{delete, get, post, put},
        Json, Router,
    };

    pub use serde::{Deserialize, Serialize};
    pub use tokio;
    pub use tracing::{debug, error, info, warn};
}
