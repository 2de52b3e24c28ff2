//! Translated user-facing messages
//!
//! Messages are looked up by key in a per-[`Locale`] table. The crate ships
//! English and Brazilian Portuguese defaults for the keys used by the error
//! envelope. Applications can layer their own entries on top with
//! [`Translations::with_entries`] and hand them to
//! [`AppStateBuilder::translations`](crate::state::AppStateBuilder::translations).
//! Handlers read them back per request through the [`Localizer`] extractor.
//!
//! ```rust
//! use api_commons::i18n::{keys, Locale, Translations};
//!
//! let translations = Translations::default()
//!     .with_entry(Locale::EnUs, "greeting", "Hello");
//!
//! assert_eq!(translations.translate("greeting", Locale::EnUs), "Hello");
//! assert_eq!(
//!     translations.translate(keys::BAD_CREDENTIALS, Locale::PtBr),
//!     "Credênciais inválidas."
//! );
//! // Unknown keys come back unchanged
//! assert_eq!(translations.translate("missing", Locale::EnUs), "missing");
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use http::{header::ACCEPT_LANGUAGE, HeaderMap};
use once_cell::sync::Lazy;

/// Message keys understood by the default tables
pub mod keys {
    pub const UNKNOWN_SERVER_ERROR: &str = "error_unknow_server_error";
    pub const UNKNOWN_OBJECT_SERVER_ERROR: &str = "unknow_object_server_error";
    pub const NOT_FOUND_SERVER_ERROR: &str = "not_found_server_error";
    pub const BAD_RESPONSE_SERVER_ERROR: &str = "bad_response_server_error";
    pub const BAD_REQUEST: &str = "error_bad_request";
    pub const BAD_CREDENTIALS: &str = "bad_credentials";
    pub const INTERNAL_SERVER_ERROR: &str = "internal_server_error";
    pub const USER_NOT_AUTHENTICATED: &str = "user_not_authenticated";
    pub const VALIDATOR_ITEM_NOT_FOUND: &str = "error_validador_item_not_found";
    pub const VALIDATOR_ID_REQUIRED: &str = "error_validator_id";
    pub const VALIDATOR_INVALID_FIELDS: &str = "error_validator_invalid_field";
    pub const VALIDATOR_COULD_NOT_UPDATE: &str = "error_validador_could_not_update";
    pub const USER_NOT_REGISTERED_FOR_NOTIFICATION: &str =
        "error_user_not_registered_for_notification";
    pub const APPLICATION_VERSION: &str = "application_version";
}

/// Supported message locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    EnUs,
    PtBr,
}

impl Locale {
    /// Pick a locale from an `Accept-Language` value
    ///
    /// Only the first language range is considered: the value is cut at the
    /// first `;` and then at the first `,`. Anything other than `pt-BR`
    /// (case-insensitive) selects English.
    pub fn from_accept_language(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };

        let first = value
            .split(';')
            .next()
            .and_then(|range| range.split(',').next())
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match first.as_str() {
            "pt-br" => Self::PtBr,
            _ => Self::EnUs,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_accept_language(
            headers
                .get(ACCEPT_LANGUAGE)
                .and_then(|value| value.to_str().ok()),
        )
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::PtBr => "pt-BR",
        }
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

static EN_US: &[(&str, &str)] = &[
    (keys::UNKNOWN_SERVER_ERROR, "Something went wrong, try again later."),
    (
        keys::UNKNOWN_OBJECT_SERVER_ERROR,
        "Resource can't be found to fulfill the request.",
    ),
    (keys::NOT_FOUND_SERVER_ERROR, "Resource can't be found."),
    (
        keys::BAD_RESPONSE_SERVER_ERROR,
        "Your request could not be completed at this time.",
    ),
    (keys::BAD_REQUEST, "Your request does not meet the needs to complete."),
    (keys::BAD_CREDENTIALS, "Invalid credentials"),
    (
        keys::INTERNAL_SERVER_ERROR,
        "Oh no! Something bad happened. Please come back later when we fixed that problem. Thanks.",
    ),
    (keys::USER_NOT_AUTHENTICATED, "User not authenticated!"),
    (keys::VALIDATOR_ID_REQUIRED, "Id field can't be lower than zero."),
    (keys::VALIDATOR_ITEM_NOT_FOUND, "No itens found."),
    (keys::VALIDATOR_INVALID_FIELDS, "One or more fields are invalid."),
    (keys::VALIDATOR_COULD_NOT_UPDATE, "Item could not be updated."),
    (
        keys::USER_NOT_REGISTERED_FOR_NOTIFICATION,
        "User is not registered for notifications.",
    ),
    (keys::APPLICATION_VERSION, "Application version"),
];

static PT_BR: &[(&str, &str)] = &[
    (
        keys::UNKNOWN_SERVER_ERROR,
        "Ops, algo aconteceu errado...\nTente novamente mais tarde.",
    ),
    (
        keys::UNKNOWN_OBJECT_SERVER_ERROR,
        "Recurso desconhecido para completar requisição.",
    ),
    (keys::NOT_FOUND_SERVER_ERROR, "Recurso não foi encontrado."),
    (
        keys::BAD_RESPONSE_SERVER_ERROR,
        "Sua requisição não pode ser concluída desta vez.",
    ),
    (
        keys::BAD_REQUEST,
        "Sua requisição não atende as necessidades para ser concluída.",
    ),
    (keys::BAD_CREDENTIALS, "Credênciais inválidas."),
    (
        keys::INTERNAL_SERVER_ERROR,
        "Oh não! Algo de ruim aconteceu. Por favor, volte mais tarde quando resolvermos o problema. Obrigado.",
    ),
    (keys::USER_NOT_AUTHENTICATED, "Usuario não autenticado!"),
    (keys::VALIDATOR_ID_REQUIRED, "Parametro id não pode ser nulo."),
    (keys::VALIDATOR_ITEM_NOT_FOUND, "Nenhum item foi encontrado."),
    (keys::VALIDATOR_INVALID_FIELDS, "Um ou mais campos estão inválidos."),
    (keys::VALIDATOR_COULD_NOT_UPDATE, "Item não pode ser atualizado."),
    (
        keys::USER_NOT_REGISTERED_FOR_NOTIFICATION,
        "Usuario não registrado para receber notificações.",
    ),
    (keys::APPLICATION_VERSION, "Versão da aplicação"),
];

type Table = HashMap<String, String>;

fn table_from(entries: &[(&str, &str)]) -> Table {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

static DEFAULTS: Lazy<Arc<Translations>> = Lazy::new(|| {
    Arc::new(Translations {
        tables: HashMap::from([
            (Locale::EnUs, table_from(EN_US)),
            (Locale::PtBr, table_from(PT_BR)),
        ]),
    })
});

/// Message tables for every supported locale
#[derive(Debug, Clone)]
pub struct Translations {
    tables: HashMap<Locale, Table>,
}

impl Default for Translations {
    fn default() -> Self {
        Translations::clone(&DEFAULTS)
    }
}

impl Translations {
    /// Add or replace one entry
    #[must_use]
    pub fn with_entry(
        mut self,
        locale: Locale,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.tables
            .entry(locale)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Add or replace many entries for one locale
    ///
    /// Entries given here take precedence over the built-in defaults.
    #[must_use]
    pub fn with_entries<I, K, V>(mut self, locale: Locale, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let table = self.tables.entry(locale).or_default();
        for (key, value) in entries {
            table.insert(key.into(), value.into());
        }
        self
    }

    /// Translated text for `key`, or `key` itself when unknown
    pub fn translate(&self, key: &str, locale: Locale) -> String {
        self.lookup(key, locale)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    pub fn lookup(&self, key: &str, locale: Locale) -> Option<&str> {
        self.tables
            .get(&locale)
            .and_then(|table| table.get(key))
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tables.values().any(|table| table.contains_key(key))
    }
}

/// The built-in tables, shared
pub fn defaults() -> Arc<Translations> {
    Arc::clone(&DEFAULTS)
}

/// Translations and locale of one request
///
/// Extracted from the `Arc<Translations>` request extension that
/// [`Server::router`](crate::server::Server::router) installs from the
/// application state, and from `Accept-Language`. Without the extension the
/// built-in tables are used.
#[derive(Debug, Clone)]
pub struct Localizer {
    translations: Arc<Translations>,
    locale: Locale,
}

impl Localizer {
    pub fn new(translations: Arc<Translations>, locale: Locale) -> Self {
        Self {
            translations,
            locale,
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let translations = parts
            .extensions
            .get::<Arc<Translations>>()
            .cloned()
            .unwrap_or_else(defaults);
        Self::new(translations, Locale::from_headers(&parts.headers))
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn translations(&self) -> &Translations {
        &self.translations
    }

    /// Translated text for `key` in this request's locale
    pub fn translate(&self, key: &str) -> String {
        self.translations.translate(key, self.locale)
    }
}

/// Built-in tables in the given locale
impl From<Locale> for Localizer {
    fn from(locale: Locale) -> Self {
        Self::new(defaults(), locale)
    }
}

impl<S> FromRequestParts<S> for Localizer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_language_parsing() {
        assert_eq!(Locale::from_accept_language(Some("pt-BR")), Locale::PtBr);
        assert_eq!(
            Locale::from_accept_language(Some("pt-BR,pt;q=0.9,en;q=0.8")),
            Locale::PtBr
        );
        assert_eq!(Locale::from_accept_language(Some("PT-br;q=1")), Locale::PtBr);
        assert_eq!(Locale::from_accept_language(Some("pt")), Locale::EnUs);
        assert_eq!(
            Locale::from_accept_language(Some("en-US,pt-BR")),
            Locale::EnUs
        );
        assert_eq!(Locale::from_accept_language(None), Locale::EnUs);
    }

    #[test]
    fn test_english_table_is_english() {
        let translations = Translations::default();
        assert_eq!(
            translations.translate(keys::BAD_REQUEST, Locale::EnUs),
            "Your request does not meet the needs to complete."
        );
        assert_eq!(
            translations.translate(keys::BAD_REQUEST, Locale::PtBr),
            "Sua requisição não atende as necessidades para ser concluída."
        );
    }

    #[test]
    fn test_overrides_win() {
        let translations = Translations::default().with_entries(
            Locale::EnUs,
            [(keys::BAD_CREDENTIALS, "Wrong user or password")],
        );

        assert_eq!(
            translations.translate(keys::BAD_CREDENTIALS, Locale::EnUs),
            "Wrong user or password"
        );
        assert_eq!(
            translations.translate(keys::BAD_CREDENTIALS, Locale::PtBr),
            "Credênciais inválidas."
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let translations = defaults();
        assert_eq!(translations.translate("no_such_key", Locale::PtBr), "no_such_key");
        assert!(!translations.contains("no_such_key"));
        assert!(translations.contains(keys::APPLICATION_VERSION));
    }

    #[tokio::test]
    async fn test_locale_extractor() {
        let request = http::Request::builder()
            .header(ACCEPT_LANGUAGE, "pt-BR")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let locale = Locale::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(locale, Locale::PtBr);
    }

    #[tokio::test]
    async fn test_localizer_reads_request_tables() {
        let overrides = Arc::new(
            Translations::default().with_entry(Locale::PtBr, keys::BAD_REQUEST, "Pedido inválido"),
        );
        let mut request = http::Request::builder()
            .header(ACCEPT_LANGUAGE, "pt-BR")
            .body(())
            .unwrap();
        request.extensions_mut().insert(overrides);
        let (mut parts, _) = request.into_parts();

        let localizer = Localizer::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(localizer.locale(), Locale::PtBr);
        assert_eq!(localizer.translate(keys::BAD_REQUEST), "Pedido inválido");
    }

    #[test]
    fn test_localizer_without_extension_uses_defaults() {
        let (parts, _) = http::Request::builder().body(()).unwrap().into_parts();
        let localizer = Localizer::from_parts(&parts);

        assert_eq!(localizer.locale(), Locale::EnUs);
        assert_eq!(localizer.translate(keys::BAD_CREDENTIALS), "Invalid credentials");
    }
}
