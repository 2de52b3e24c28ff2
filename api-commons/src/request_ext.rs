//! Helpers for reading common request headers

use std::fmt::Display;

use http::{header::COOKIE, HeaderMap};

use crate::{
    constants::{AUTHORIZATION_HEADER, BEARER_PREFIX, PARAM_SEPARATOR, TENANT_KEY_HEADER},
    error::{Error, Result},
};

/// Value of the `X-Server-Key` tenant header
pub fn tenant_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TENANT_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Token from `Authorization: Bearer <token>`
///
/// # Errors
///
/// [`Error::Unauthorized`] when the header is missing, not a bearer token
/// or empty.
pub fn bearer_token(headers: &HeaderMap) -> Result<String> {
    let value = headers
        .get(AUTHORIZATION_HEADER)
        .ok_or_else(|| Error::Unauthorized("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| Error::Unauthorized("Invalid authorization header".to_string()))?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .and_then(|rest| rest.strip_prefix(' '))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::Unauthorized("Invalid authorization header format".to_string()))?;

    Ok(token.to_string())
}

/// Raw `Cookie` header, empty when absent
pub fn cookie_string(headers: &HeaderMap) -> String {
    headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `k=v;` for every entry, in iteration order
pub fn as_cookie_string<I, K, V>(entries: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    entries
        .into_iter()
        .map(|(key, value)| format!("{}={};", key, value))
        .collect()
}

/// Join the present arguments with `§`, skipping `None`s
pub fn group_args<I, T>(args: I) -> String
where
    I: IntoIterator<Item = Option<T>>,
    T: Display,
{
    args.into_iter()
        .flatten()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(PARAM_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_tenant_id() {
        assert_eq!(
            tenant_id(&headers(&[("x-server-key", "acme")])),
            Some("acme".to_string())
        );
        assert_eq!(tenant_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token() {
        let token = bearer_token(&headers(&[("authorization", "Bearer abc.def")])).unwrap();
        assert_eq!(token, "abc.def");

        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(Error::Unauthorized(_))
        ));
        assert!(bearer_token(&headers(&[("authorization", "Basic dXNlcg==")])).is_err());
        assert!(bearer_token(&headers(&[("authorization", "Bearer ")])).is_err());
    }

    #[test]
    fn test_cookie_helpers() {
        assert_eq!(cookie_string(&headers(&[("cookie", "a=1; b=2")])), "a=1; b=2");
        assert_eq!(cookie_string(&HeaderMap::new()), "");

        let cookies = BTreeMap::from([("session", "xyz"), ("user", "42")]);
        assert_eq!(as_cookie_string(cookies), "session=xyz;user=42;");
    }

    #[test]
    fn test_group_args() {
        assert_eq!(group_args([Some("a"), None, Some("c")]), "a§c");
        assert_eq!(group_args([Some(1), Some(2)]), "1§2");
        assert_eq!(group_args::<_, &str>([None, None]), "");
    }
}
