//! Configuration for an import run
//!
//! The storage connection string resolves from an environment variable, then
//! an optional TOML file, then a URL assembled from the CLI host/database
//! overrides with documented defaults. A configured connection string always
//! wins over the CLI overrides.

use mapdepot_common::{ImportError, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default storage host when no connection string or override is given.
pub const DEFAULT_HOST: &str = "localhost";

/// Default storage port.
pub const DEFAULT_PORT: u16 = 27017;

/// Default destination database name.
pub const DEFAULT_DATABASE: &str = "mapdepot";

/// Configuration file read from the working directory.
pub const CONFIG_FILE: &str = "mapdepot.toml";

/// Environment variable overlaying the configuration file.
pub const ENV_CONNECTION: &str = "MAPDEPOT_DEFAULT_CONNECTION";

/// Shape of the optional configuration file
#[derive(Debug, Clone, Default, Deserialize)]
struct FileSettings {
    #[serde(default)]
    connections: Connections,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Connections {
    default_connection: Option<String>,
}

/// Resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Connection string naming the destination database
    pub connection_string: String,
}

impl Settings {
    /// Resolve settings from the environment, the configuration file, and the
    /// CLI overrides, in that precedence order
    pub fn resolve(host: Option<&str>, database: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::resolve_with_file(Path::new(CONFIG_FILE), host, database)
    }

    fn resolve_with_file(
        config_file: &Path,
        host: Option<&str>,
        database: Option<&str>,
    ) -> Result<Self> {
        if let Ok(url) = std::env::var(ENV_CONNECTION) {
            if url.trim().is_empty() {
                return Err(ImportError::config(format!(
                    "{ENV_CONNECTION} is set but empty"
                )));
            }
            return Ok(Self {
                connection_string: url,
            });
        }

        if let Some(url) = read_file_connection(config_file)? {
            return Ok(Self {
                connection_string: url,
            });
        }

        let host = host.unwrap_or(DEFAULT_HOST);
        let database = database.unwrap_or(DEFAULT_DATABASE);
        Ok(Self {
            connection_string: format!("mongodb://{host}:{DEFAULT_PORT}/{database}"),
        })
    }
}

/// Read the default connection from the configuration file, if present
fn read_file_connection(config_file: &Path) -> Result<Option<String>> {
    let contents = match std::fs::read_to_string(config_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let settings: FileSettings = toml::from_str(&contents).map_err(|e| {
        ImportError::config(format!("failed to parse {}: {e}", config_file.display()))
    })?;

    Ok(settings.connections.default_connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Resolution reads the process environment, so tests touching it must
    // not run concurrently.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults_when_nothing_configured() {
        let _guard = ENV_LOCK.lock().unwrap();
        let settings =
            Settings::resolve_with_file(Path::new("does-not-exist.toml"), None, None).unwrap();
        assert_eq!(
            settings.connection_string,
            "mongodb://localhost:27017/mapdepot"
        );
    }

    #[test]
    fn test_cli_overrides_fill_the_assembled_url() {
        let _guard = ENV_LOCK.lock().unwrap();
        let settings = Settings::resolve_with_file(
            Path::new("does-not-exist.toml"),
            Some("db.example.com"),
            Some("atlas"),
        )
        .unwrap();
        assert_eq!(
            settings.connection_string,
            "mongodb://db.example.com:27017/atlas"
        );
    }

    #[test]
    fn test_file_connection_beats_cli_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[connections]\ndefault_connection = \"mongodb://configured:27017/primary\""
        )
        .unwrap();

        let settings =
            Settings::resolve_with_file(file.path(), Some("ignored"), Some("ignored")).unwrap();
        assert_eq!(
            settings.connection_string,
            "mongodb://configured:27017/primary"
        );
    }

    #[test]
    fn test_file_without_connection_falls_through() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[connections]").unwrap();

        let settings = Settings::resolve_with_file(file.path(), None, None).unwrap();
        assert_eq!(
            settings.connection_string,
            "mongodb://localhost:27017/mapdepot"
        );
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [").unwrap();

        let err = Settings::resolve_with_file(file.path(), None, None).unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }

    #[test]
    fn test_env_connection_wins() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(ENV_CONNECTION, "mongodb://from-env:27017/envdb");

        let settings = Settings::resolve_with_file(Path::new("does-not-exist.toml"), None, None);

        std::env::remove_var(ENV_CONNECTION);

        assert_eq!(
            settings.unwrap().connection_string,
            "mongodb://from-env:27017/envdb"
        );
    }
}
