//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Legacy environment variables, such as `PORT`, `ENV`/`STAGE`/`PROFILE` or `DB_URL`
//!    (see [`ALIASES`]); within one chain the first non-blank variable wins
//! 2. Prefixed environment variables: `API_SERVICE__PORT=8080`
//! 3. Stage file `config-<stage>.toml` when `STAGE` (or `PROFILE`) is one of
//!    `dev`, `development`, `staging` or `test`
//! 4. `config.toml` in the current working directory, then
//!    `~/.config/api-commons/{service_name}/config.toml`, then
//!    `/etc/api-commons/{service_name}/config.toml`
//! 5. Default values

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::Value,
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{sanitize_url, Error, Result};

/// Prefix of structured environment variables
pub const ENV_PREFIX: &str = "API_";

/// Stages that get their own configuration file
pub const STAGES_WITH_FILE: &[&str] = &["dev", "development", "staging", "test"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// API documentation metadata
    #[serde(default)]
    pub docs: DocsConfig,

    /// Database configuration (optional)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Pagination defaults
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Spring Boot Admin registration (optional)
    #[serde(default)]
    pub admin: Option<AdminClientConfig>,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Project name, reported by `/admin/info`
    #[serde(default = "default_name")]
    pub name: String,

    /// Project version, reported by `/ping` and the `Api-Version` header
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_description")]
    pub description: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix for every route, without slashes (`api` serves `/api/...`)
    #[serde(default = "default_context_path")]
    pub context_path: String,

    /// Deployment stage (development, test, staging, production)
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ServiceConfig {
    /// `development` or `dev`, case-insensitive
    pub fn is_dev(&self) -> bool {
        matches!(self.stage.to_lowercase().as_str(), "development" | "dev")
    }

    /// `testing` or `test`, case-insensitive
    pub fn is_test(&self) -> bool {
        matches!(self.stage.to_lowercase().as_str(), "testing" | "test")
    }

    /// Context path as a route prefix: `"/api"`, or `""` for the root
    pub fn base_path(&self) -> String {
        let trimmed = self.context_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Documentation metadata
///
/// Only reported in logs and the route overview; no OpenAPI document is
/// generated from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default)]
    pub contact_name: String,

    #[serde(default = "default_docs_context_path")]
    pub context_path: String,

    #[serde(default = "default_docs_json_path")]
    pub json_path: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            contact_name: String::new(),
            context_path: default_docs_context_path(),
            json_path: default_docs_json_path(),
        }
    }
}

/// Database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Minimum idle connections
    #[serde(default)]
    pub minimum_idle: u32,

    /// Maximum number of connections in the pool
    #[serde(default = "default_maximum_pool_size")]
    pub maximum_pool_size: u32,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    #[serde(default)]
    pub auto_commit: bool,

    /// Driver name reported by the health endpoint
    #[serde(default = "default_driver")]
    pub driver: String,

    #[serde(default = "default_transaction_isolation")]
    pub transaction_isolation: String,

    /// Query used to validate connections
    #[serde(default = "default_connection_test_query")]
    pub connection_test_query: String,
}

impl DatabaseConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &sanitize_url(&self.url))
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("minimum_idle", &self.minimum_idle)
            .field("maximum_pool_size", &self.maximum_pool_size)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .field("auto_commit", &self.auto_commit)
            .field("driver", &self.driver)
            .field("transaction_isolation", &self.transaction_isolation)
            .field("connection_test_query", &self.connection_test_query)
            .finish()
    }
}

/// Pagination defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when a request gives none, or a non-positive one
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: permissive, restrictive or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Value of the `Server` response header
    #[serde(default = "default_server_banner")]
    pub server_header: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
            server_header: default_server_banner(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to this file; served by `/admin/logfile`
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Emit JSON lines instead of plain text
    #[serde(default = "default_true")]
    pub json: bool,
}

/// Spring Boot Admin client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminClientConfig {
    /// Admin server base URL
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Registration endpoint, appended to `url`
    #[serde(default = "default_admin_api_path")]
    pub api_path: String,

    /// Instance name shown by the admin server (defaults to the service name)
    #[serde(default)]
    pub instance_name: Option<String>,

    /// Public base URL of this service, without the context path
    #[serde(default)]
    pub service_base_url: Option<String>,
}

impl fmt::Debug for AdminClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_path", &self.api_path)
            .field("instance_name", &self.instance_name)
            .field("service_base_url", &self.service_base_url)
            .finish()
    }
}

/// One configuration value and the legacy variables that can set it
#[derive(Debug, Clone, Copy)]
pub struct Alias {
    /// Dotted path inside [`Config`]
    pub path: &'static str,
    /// Variables checked in order; the first non-blank one wins
    pub keys: &'static [&'static str],
}

/// Legacy variable names accepted for each setting
pub const ALIASES: &[Alias] = &[
    Alias { path: "service.port", keys: &["PORT", "env_server_port"] },
    Alias { path: "service.context_path", keys: &["CONTEXT", "env_context"] },
    Alias { path: "service.stage", keys: &["ENV", "STAGE", "PROFILE", "env_stage"] },
    Alias { path: "service.name", keys: &["env_project_name"] },
    Alias { path: "service.version", keys: &["env_project_version"] },
    Alias { path: "service.description", keys: &["env_project_description"] },
    Alias { path: "docs.contact_name", keys: &["env_swagger_contact_name"] },
    Alias { path: "docs.context_path", keys: &["env_swagger_context_path"] },
    Alias { path: "docs.json_path", keys: &["env_swagger_json_path"] },
    Alias { path: "database.url", keys: &["DB_URL", "db_jdbc_url"] },
    Alias { path: "database.username", keys: &["SEDB_USER", "db_username"] },
    Alias { path: "database.password", keys: &["SEDB_PASS", "db_password"] },
    Alias { path: "database.driver", keys: &["DB_DRIVER", "db_driver_class_name"] },
    Alias { path: "database.minimum_idle", keys: &["db_minimum_idle"] },
    Alias { path: "database.maximum_pool_size", keys: &["DB_MAXIMUM_POOL_SIZE", "db_maximum_pool_size"] },
    Alias { path: "database.idle_timeout_secs", keys: &["db_idle_timeout"] },
    Alias { path: "database.max_lifetime_secs", keys: &["db_max_life_time"] },
    Alias { path: "database.auto_commit", keys: &["db_is_auto_commit"] },
    Alias { path: "database.transaction_isolation", keys: &["db_transaction_isolation"] },
    Alias { path: "admin.url", keys: &["SPRING_BOOT_ADMIN_URL"] },
    Alias { path: "admin.username", keys: &["SPRING_BOOT_ADMIN_USERNAME"] },
    Alias { path: "admin.password", keys: &["SPRING_BOOT_ADMIN_PASSWORD"] },
    Alias { path: "admin.api_path", keys: &["SPRING_BOOT_ADMIN_API_PATH"] },
    Alias { path: "admin.instance_name", keys: &["SPRING_BOOT_ADMIN_INSTANCE_NAME"] },
    Alias { path: "admin.service_base_url", keys: &["URL_SISTEMA"] },
    Alias { path: "logging.file", keys: &["LOG_FILE"] },
];

/// Resolve every alias chain against `lookup`
///
/// Returns `(path, value)` pairs for the chains where some variable holds
/// a non-blank value.
pub fn resolve_aliases<F>(lookup: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    ALIASES
        .iter()
        .filter_map(|alias| {
            alias
                .keys
                .iter()
                .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
                .map(|value| (alias.path, value))
        })
        .collect()
}

/// Stage named by `STAGE` or `PROFILE`, if it has its own config file
pub fn file_stage<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    ["STAGE", "PROFILE"]
        .iter()
        .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        .map(|stage| stage.trim().to_lowercase())
        .filter(|stage| STAGES_WITH_FILE.contains(&stage.as_str()))
}

/// Settings whose legacy values are parsed as numbers or booleans
const TYPED_PATHS: &[&str] = &[
    "service.port",
    "database.minimum_idle",
    "database.maximum_pool_size",
    "database.idle_timeout_secs",
    "database.max_lifetime_secs",
    "database.auto_commit",
];

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// Optional sections only accept legacy values once their URL is known
fn section_anchored(figment: &Figment, resolved: &[(&str, String)], path: &str) -> bool {
    let Some((section, _)) = path.split_once('.') else {
        return true;
    };
    if !matches!(section, "database" | "admin") {
        return true;
    }
    let anchor = format!("{}.url", section);
    resolved.iter().any(|(p, _)| *p == anchor) || figment.find_value(&anchor).is_ok()
}

fn merge_aliases(mut figment: Figment, resolved: &[(&'static str, String)]) -> Figment {
    for (path, raw) in resolved {
        if !section_anchored(&figment, resolved, path) {
            tracing::debug!("Ignoring {} without a configured section url", path);
            continue;
        }
        let raw = raw.trim();
        let value = if TYPED_PATHS.contains(path) {
            raw.parse::<Value>()
                .unwrap_or_else(|_| Value::from(raw.to_string()))
        } else {
            Value::from(raw.to_string())
        };
        figment = figment.merge(Serialized::default(path, value));
    }
    figment
}

// Default value functions
fn default_name() -> String {
    "Application Name".to_string()
}

fn default_version() -> String {
    "beta".to_string()
}

fn default_description() -> String {
    "Application Description".to_string()
}

fn default_port() -> u16 {
    7000
}

fn default_context_path() -> String {
    "api".to_string()
}

fn default_stage() -> String {
    "production".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_docs_context_path() -> String {
    "/swagger".to_string()
}

fn default_docs_json_path() -> String {
    "/swagger-json".to_string()
}

fn default_maximum_pool_size() -> u32 {
    10
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_max_lifetime() -> u64 {
    120
}

fn default_driver() -> String {
    "postgres".to_string()
}

fn default_transaction_isolation() -> String {
    "REPEATABLE READ".to_string()
}

fn default_connection_test_query() -> String {
    "SELECT 1".to_string()
}

fn default_page_size() -> u32 {
    crate::pageable::DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

// Middleware default functions
fn default_body_limit_mb() -> usize {
    10 // 10 MB
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_server_banner() -> String {
    crate::constants::SERVER_BANNER.to_string()
}

fn default_admin_api_path() -> String {
    "/instances".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name used for the XDG and `/etc` lookups is the binary
    /// name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "api-commons".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let stage = file_stage(env_lookup);
        let config_paths = Self::find_config_paths(service_name, stage.as_deref());

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        Self::load_with(&config_paths, env_lookup)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the directory search. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(&[path.as_ref().to_path_buf()], env_lookup)
    }

    /// Load from `config_paths` (highest priority first) and the legacy
    /// variables found through `lookup`
    pub fn load_with<F>(config_paths: &[PathBuf], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later files override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let resolved = resolve_aliases(lookup);
        figment = merge_aliases(figment, &resolved);

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Candidate config files, highest priority first
    ///
    /// Each directory contributes `config-<stage>.toml` (when a file stage is
    /// active) ahead of `config.toml`.
    pub fn find_config_paths(service_name: &str, stage: Option<&str>) -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from(".")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("api-commons");
        if let Some(dir) = xdg_dirs.get_config_home() {
            dirs.push(dir.join(service_name));
        }

        dirs.push(PathBuf::from("/etc/api-commons").join(service_name));

        let mut paths = Vec::new();
        for dir in dirs {
            if let Some(stage) = stage {
                paths.push(dir.join(format!("config-{}.toml", stage)));
            }
            paths.push(dir.join("config.toml"));
        }
        paths
    }

    /// Reject values that would break the server at runtime
    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(Error::from(figment::Error::from(
                "service.name cannot be empty".to_string(),
            )));
        }

        if self.pagination.default_page_size == 0 {
            return Err(Error::from(figment::Error::from(
                "pagination.default_page_size must be greater than 0".to_string(),
            )));
        }

        if let Some(db) = &self.database {
            if db.url.trim().is_empty() {
                return Err(Error::from(figment::Error::from(
                    "database.url cannot be empty".to_string(),
                )));
            }
        }

        Ok(())
    }

    /// Get database URL
    pub fn database_url(&self) -> Option<&str> {
        self.database.as_ref().map(|db| db.url.as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: default_name(),
                version: default_version(),
                description: default_description(),
                port: default_port(),
                context_path: default_context_path(),
                stage: default_stage(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
            },
            docs: DocsConfig::default(),
            database: None,
            pagination: PaginationConfig::default(),
            middleware: MiddlewareConfig::default(),
            logging: LoggingConfig::default(),
            admin: None,
        }
    }
}
