//! Shared names: headers, separators, envelope keys

/// Header carrying the tenant identifier
pub const TENANT_KEY_HEADER: &str = "x-server-key";

/// Response header carrying the service version
pub const API_VERSION_HEADER: &str = "api-version";

/// Default value of the `Server` response header
pub const SERVER_BANNER: &str = "api-commons";

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const BEARER_PREFIX: &str = "Bearer";
pub const JSON_MIME: &str = "application/json";

/// Joins grouped arguments, see [`group_args`](crate::request_ext::group_args)
pub const PARAM_SEPARATOR: &str = "§";

/// Error envelope key for generic client failures
pub const BAD_REQUEST_400: &str = "BAD_REQUEST_400";

/// Error envelope key for authentication failures
pub const UNAUTHORIZED_401: &str = "UNAUTHORIZED_401";
