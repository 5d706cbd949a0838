//! Configuration loading from ~/.scope3/config.toml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use client::{ClientConfig, Environment};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const API_KEY_ENV: &str = "SCOPE3_API_KEY";
pub const BASE_URL_ENV: &str = "SCOPE3_BASE_URL";

const CONFIG_DIR: &str = ".scope3";
const CONFIG_FILE: &str = "config.toml";

/// Persisted CLI settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// Settings given on the command line; each wins over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub environment: Option<Environment>,
    pub timeout: Option<Duration>,
    pub debug: bool,
}

impl Config {
    /// `$HOME/.scope3/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(CONFIG_DIR).join(CONFIG_FILE))
            .ok_or(Error::NoConfigDir)
    }

    /// Load from `path`; a missing file yields an empty config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).map_err(|reason| Error::ConfigParse {
                path: path.to_path_buf(),
                reason,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(toml: &str) -> std::result::Result<Self, String> {
        toml::from_str(toml).map_err(|e| e.to_string())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply environment variables on top of the file values.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.base_url = Some(url);
        }
        self
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_key(key) {
            Some(Key::ApiKey) => self.api_key = Some(value.to_string()),
            Some(Key::BaseUrl) => self.base_url = Some(value.to_string()),
            Some(Key::Environment) => self.environment = Some(value.parse()?),
            None => return Err(Error::UnknownConfigKey(key.to_string())),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match normalize_key(key) {
            Some(Key::ApiKey) => self.api_key.clone(),
            Some(Key::BaseUrl) => self.base_url.clone(),
            Some(Key::Environment) => self.environment.map(|e| e.to_string()),
            None => return Err(Error::UnknownConfigKey(key.to_string())),
        })
    }

    /// Build client options: flags, then environment, then file.
    pub fn resolve(&self, overrides: &Overrides) -> Result<ClientConfig> {
        let api_key = overrides
            .api_key
            .clone()
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.is_empty())
            .ok_or(Error::MissingApiKey)?;

        let mut config = ClientConfig::new(api_key)
            .environment(
                overrides
                    .environment
                    .or(self.environment)
                    .unwrap_or_default(),
            )
            .debug(overrides.debug);
        if let Some(url) = overrides.base_url.clone().or_else(|| self.base_url.clone()) {
            config = config.base_url(url);
        }
        if let Some(timeout) = overrides.timeout {
            config = config.timeout(timeout);
        }
        Ok(config)
    }
}

enum Key {
    ApiKey,
    BaseUrl,
    Environment,
}

/// Accepts snake_case, camelCase and kebab-case spellings.
fn normalize_key(key: &str) -> Option<Key> {
    match key.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
        "apikey" => Some(Key::ApiKey),
        "baseurl" => Some(Key::BaseUrl),
        "environment" | "env" => Some(Key::Environment),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn parse_config() {
        let config = Config::parse(
            r#"
api_key = "file-key"
base_url = "https://example.test"
environment = "staging"
"#,
        )
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.base_url.as_deref(), Some("https://example.test"));
        assert_eq!(config.environment, Some(Environment::Staging));
    }

    #[test]
    fn parse_rejects_unknown_environment() {
        assert!(Config::parse(r#"environment = "qa""#).is_err());
    }

    #[test]
    fn env_overrides_file() {
        let config = Config {
            api_key: Some("file-key".into()),
            base_url: Some("https://file.test".into()),
            environment: None,
        }
        .with_env(env(&[(API_KEY_ENV, "env-key")]));

        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.base_url.as_deref(), Some("https://file.test"));
    }

    #[test]
    fn flags_override_everything() {
        let config = Config {
            api_key: Some("env-key".into()),
            base_url: Some("https://env.test".into()),
            environment: Some(Environment::Staging),
        };
        let resolved = config
            .resolve(&Overrides {
                api_key: Some("flag-key".into()),
                base_url: Some("https://flag.test".into()),
                debug: true,
                ..Overrides::default()
            })
            .unwrap();

        assert_eq!(resolved.api_key, "flag-key");
        assert_eq!(resolved.endpoint(), "https://flag.test/mcp");
        assert_eq!(resolved.environment, Environment::Staging);
        assert!(resolved.debug);
    }

    #[test]
    fn environment_selects_default_url() {
        let config = Config {
            api_key: Some("k".into()),
            environment: Some(Environment::Staging),
            ..Config::default()
        };
        let resolved = config.resolve(&Overrides::default()).unwrap();
        assert_eq!(resolved.endpoint(), "https://api.agentic.staging.scope3.com/mcp");
    }

    #[test]
    fn missing_api_key() {
        let err = Config::default().resolve(&Overrides::default()).unwrap_err();
        assert!(matches!(err, Error::MissingApiKey));
    }

    #[test]
    fn set_and_get_accept_key_spellings() {
        let mut config = Config::default();
        config.set("apiKey", "k1").unwrap();
        config.set("base-url", "https://x.test").unwrap();
        config.set("environment", "staging").unwrap();

        assert_eq!(config.get("api_key").unwrap().as_deref(), Some("k1"));
        assert_eq!(config.get("baseUrl").unwrap().as_deref(), Some("https://x.test"));
        assert_eq!(config.get("env").unwrap().as_deref(), Some("staging"));
        assert!(matches!(
            config.set("color", "blue"),
            Err(Error::UnknownConfigKey(_))
        ));
        assert!(config.set("environment", "moon").is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("scope3-cli-test-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);

        assert_eq!(Config::load(&path).unwrap(), Config::default());

        let config = Config {
            api_key: Some("saved".into()),
            base_url: None,
            environment: Some(Environment::Production),
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
