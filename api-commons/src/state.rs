//! Application state management

use std::sync::Arc;

use crate::{
    config::Config,
    health::DatabaseProbe,
    i18n::{self, Translations},
};

#[cfg(feature = "database")]
use crate::error::Result;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    translations: Arc<Translations>,
    db_probe: Option<Arc<dyn DatabaseProbe>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AppState {
    /// Create a new AppState with the given configuration
    ///
    /// Uses the built-in translations and no database probe.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            translations: i18n::defaults(),
            db_probe: None,
        }
    }

    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tables used for every message this service sends
    pub fn translations(&self) -> &Arc<Translations> {
        &self.translations
    }

    /// Probe used by `/admin/health`, if any
    pub fn db_probe(&self) -> Option<&Arc<dyn DatabaseProbe>> {
        self.db_probe.as_ref()
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    translations: Option<Translations>,
    db_probe: Option<Arc<dyn DatabaseProbe>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use these tables instead of the built-in ones
    pub fn translations(mut self, translations: Translations) -> Self {
        self.translations = Some(translations);
        self
    }

    /// Report this probe from `/admin/health`
    pub fn db_probe(mut self, probe: impl DatabaseProbe + 'static) -> Self {
        self.db_probe = Some(Arc::new(probe));
        self
    }

    /// Connect the configured database and use the pool as health probe
    ///
    /// Does nothing when no database is configured.
    #[cfg(feature = "database")]
    pub async fn connect_database(mut self) -> Result<Self> {
        let database = self
            .config
            .as_ref()
            .and_then(|config| config.database.clone());

        if let Some(database) = database {
            let pool = crate::database::create_pool(&database).await?;
            self.db_probe = Some(Arc::new(pool));
        }

        Ok(self)
    }

    pub fn build(self) -> AppState {
        AppState {
            config: Arc::new(self.config.unwrap_or_default()),
            translations: self
                .translations
                .map_or_else(i18n::defaults, Arc::new),
            db_probe: self.db_probe,
        }
    }
}
