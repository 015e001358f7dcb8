//! Configuration loader: JSON document plus `${VAR}` env expansion and
//! `~` path expansion.

use std::fs;
use std::path::Path;

use taskrelay_protocols::error::ConfigError;

use crate::schema::Config;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a JSON string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = serde_json::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.taskrelay`).
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
    fn load_empty_document_defaults_cleanly() {
        let config = ConfigLoader::load_str("{}").unwrap();
        assert!(!config.debug);
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn load_basic_document() {
        let content = r#"{"debug": true, "notifiers": {"default_notifier_id": "tg1"}}"#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(config.debug);
        assert_eq!(config.notifiers.default_notifier_id, "tg1");
    }

    #[test]
    fn load_from_file_round_trips() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"debug": false}}"#).unwrap();
        let config = ConfigLoader::load(file.path()).unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn load_nonexistent_file_is_an_error() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.json"));
        assert!(result.is_err());
    }

    #[test]
    fn load_invalid_json_is_an_error() {
        let result = ConfigLoader::load_str("{not valid json");
        assert!(result.is_err());
    }

    #[test]
    fn expand_env_vars_substitutes_set_variables() {
        unsafe {
            std::env::set_var("TASKRELAY_TEST_VAR", "tg-secret");
        }
        let content = r#"{"notifiers": {"default_notifier_id": "${TASKRELAY_TEST_VAR}"}}"#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.notifiers.default_notifier_id, "tg-secret");
        unsafe {
            std::env::remove_var("TASKRELAY_TEST_VAR");
        }
    }

    #[test]
    fn expand_env_vars_rejects_unset_variables() {
        let content = r#"{"notifiers": {"default_notifier_id": "${TASKRELAY_NOPE_12345}"}}"#;
        let result = ConfigLoader::load_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn expand_path_strips_leading_tilde() {
        let expanded = ConfigLoader::expand_path("~/.taskrelay");
        assert!(!expanded.starts_with('~'));
    }

    #[test]
    fn expand_path_leaves_absolute_paths_untouched() {
        let path = "/etc/taskrelay/config.json";
        assert_eq!(ConfigLoader::expand_path(path), path);
    }
}
