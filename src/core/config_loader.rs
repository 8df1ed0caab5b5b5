//! # Config Loader
//!
//! Loads `config.toml`, applies command-line overrides and expands every configured path
//! into a `ResolvedConfig` the rest of the console consumes.
use crate::{
    constants::LEARNER_DB_FILENAME,
    core::paths::{self, PathError},
    models::{AppConfig, ResolvedConfig},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("Config file '{0}' does not exist.")]
    NotFound(String),
    #[error("Failed to parse '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize default config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

type ConfigResult<T> = Result<T, ConfigError>;

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub workspace: Option<String>,
    pub shortcuts_dir: Option<String>,
    pub dry_run: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Loads the configuration file.
///
/// An explicit path must exist. When no path is given the default location is used,
/// and a missing default file is created from the built-in defaults (best effort).
pub fn load_config(explicit_path: Option<&Path>) -> ConfigResult<AppConfig> {
    if let Some(path) = explicit_path {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        return parse_config_file(path);
    }

    let default_path = match paths::get_default_config_path() {
        Ok(path) => path,
        Err(e) => {
            log::warn!("No config directory available ({}). Using built-in defaults.", e);
            return Ok(AppConfig::default());
        }
    };

    if default_path.is_file() {
        return parse_config_file(&default_path);
    }

    let defaults = AppConfig::default();
    if let Err(e) = write_default_config(&default_path, &defaults) {
        log::warn!(
            "Could not write default config to '{}': {}",
            default_path.display(),
            e
        );
    } else {
        log::debug!("Default config written to '{}'", default_path.display());
    }
    Ok(defaults)
}

fn parse_config_file(path: &Path) -> ConfigResult<AppConfig> {
    log::debug!("Loading config from '{}'", path.display());
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.display().to_string(),
        source,
    })
}

fn write_default_config(path: &Path, config: &AppConfig) -> ConfigResult<()> {
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string)?;
    Ok(())
}

/// Applies overrides and expands paths relative to `base` (normally the current directory).
pub fn resolve_config(
    config: &AppConfig,
    overrides: &ConfigOverrides,
    base: &Path,
) -> ConfigResult<ResolvedConfig> {
    let workspace_str = overrides
        .workspace
        .as_deref()
        .unwrap_or(&config.workspace);
    let shortcuts_str = overrides
        .shortcuts_dir
        .as_deref()
        .unwrap_or(&config.shortcuts_dir);

    let workspace = paths::expand_path(workspace_str, base)?;
    let shortcuts_dir = paths::expand_path(shortcuts_str, base)?;
    let learner_db: PathBuf = match &config.learner_db {
        Some(db) => paths::expand_path(db, base)?,
        None => workspace.join(LEARNER_DB_FILENAME),
    };

    Ok(ResolvedConfig {
        workspace,
        shortcuts_dir,
        learner_db,
        dry_run: overrides.dry_run.unwrap_or(config.default_dry_run),
        require_force_for_unsafe: config.require_force_for_unsafe,
        timeout_secs: overrides.timeout_secs.unwrap_or(config.default_timeout),
        output_preview_chars: config.output_preview_chars,
        suggestion_count: config.suggestion_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_explicit_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "workspace = \"/srv/ws\"\ndefault_dry_run = false\ndefault_timeout = 30\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.workspace, "/srv/ws");
        assert!(!config.default_dry_run);
        assert_eq!(config.default_timeout, 30);
        // Unspecified keys keep their defaults.
        assert!(config.require_force_for_unsafe);
        assert_eq!(config.shortcuts_dir, "./shortcuts");
    }

    #[test]
    fn test_load_explicit_missing_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = load_config(Some(&tmp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_malformed_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "workspace = [").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_resolve_applies_overrides_and_learner_default() {
        let config = AppConfig::default();
        let overrides = ConfigOverrides {
            workspace: Some("out".to_string()),
            dry_run: Some(false),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &overrides, Path::new("/base")).unwrap();

        assert_eq!(resolved.workspace, PathBuf::from("/base/out"));
        assert_eq!(resolved.learner_db, PathBuf::from("/base/out/learner_db.json"));
        assert!(!resolved.dry_run);
        assert_eq!(resolved.timeout_secs, config.default_timeout);
    }

    #[test]
    fn test_resolve_keeps_explicit_learner_db() {
        let config = AppConfig {
            learner_db: Some("/data/learner.json".to_string()),
            ..AppConfig::default()
        };
        let resolved =
            resolve_config(&config, &ConfigOverrides::default(), Path::new("/base")).unwrap();
        assert_eq!(resolved.learner_db, PathBuf::from("/data/learner.json"));
        assert!(resolved.dry_run);
    }
}
