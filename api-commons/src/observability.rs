//! Tracing subscriber setup

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    EnvFilter,
};

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Initialize tracing for the service
///
/// The filter comes from `service.log_level`, falling back to `info` when it
/// does not parse. Output goes to stdout and, when `logging.file` is set, is
/// appended to that file as well so `/admin/logfile` can serve it.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.clone();
    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    let installed = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.logging.file.is_none()).try_init()
    };
    installed.map_err(|e| Error::Internal(format!("Failed to initialize tracing: {}", e)))?;

    tracing::info!(
        service = %config.service.name,
        stage = %config.service.stage,
        "Tracing initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_with_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.log");

        let mut config = Config::default();
        config.logging.file = Some(path.clone());

        // Another test may already own the global subscriber
        let _ = init_tracing(&config);
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let mut config = Config::default();
        config.logging.file = Some("/nonexistent-dir/service.log".into());
        assert!(matches!(init_tracing(&config), Err(Error::Io(_))));
    }
}
