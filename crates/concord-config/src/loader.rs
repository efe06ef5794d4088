//! Configuration loader.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_VAR: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = ENV_VAR
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}"))
            .as_ref()
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value =
                std::env::var(var_name).map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.concord`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.workflow.max_retry_per_step, 3);
    }

    #[test]
    fn test_expand_path() {
        let expanded = ConfigLoader::expand_path("~/.concord");
        assert!(!expanded.starts_with('~'));
    }

    #[test]
    fn test_env_var_substitution() {
        // PATH is set in every test environment
        let path = std::env::var("PATH").unwrap();
        let config = ConfigLoader::load_str(
            r#"
            [checkpoint]
            storage_path = "${PATH}"
            "#,
        )
        .unwrap();
        assert_eq!(config.checkpoint.storage_path, path);
    }

    #[test]
    fn test_missing_env_var() {
        let result = ConfigLoader::load_str(
            r#"
            [logging]
            log_dir = "${CONCORD_SURELY_UNSET_VARIABLE}"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(v)) if v == "CONCORD_SURELY_UNSET_VARIABLE"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ConfigLoader::load_str("[workflow\nmax_retry_per_step = 1"),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[checkpoint]\nbackend = \"memory\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.checkpoint.backend, "memory");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(ConfigLoader::load(&missing), Err(ConfigError::NotFound(_))));
        let config = ConfigLoader::load_or_default(&missing).unwrap();
        assert_eq!(config.orchestrator.swarm_max_rounds, 5);
    }
}
