//! Configuration loading for scrivd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.scrivener/config.toml` (user)
//! 3. `/etc/scrivener/config.toml` (system)
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.scrivener/secrets.toml` (user, must be 0600)
//! 2. `/etc/scrivener/secrets.toml` (system, must be 0600)
//!
//! The key-store secret and the initial API key fall back to the
//! `SCRIVENER_SECRET` and `SCRIVENER_API_KEY` environment variables.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::auth::TokenTable;
use crate::types::{Requester, RequesterId, Settings};
use crate::{Result, ScrivenerError};

/// Environment variable holding the key-store secret.
pub const SECRET_ENV_VAR: &str = "SCRIVENER_SECRET";

/// Environment variable holding an API key to store at startup.
pub const API_KEY_ENV_VAR: &str = "SCRIVENER_API_KEY";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9742).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:9742".to_string()
}

/// Outbound provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI-compatible base URL (default: https://api.openai.com).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 120).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    120
}

/// On-disk locations.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for subjects, the usage log and the credential.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("scrivener"))
        .unwrap_or_else(|| PathBuf::from(".scrivener"))
}

impl StorageConfig {
    pub fn subjects_dir(&self) -> PathBuf {
        self.data_dir.join("subjects")
    }

    pub fn usage_log(&self) -> PathBuf {
        self.data_dir.join("usage.jsonl")
    }

    pub fn credential_file(&self) -> PathBuf {
        self.data_dir.join("credential")
    }
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    /// Key-store secret the credential cipher key is derived from.
    #[serde(default)]
    pub secret: Option<String>,
    /// Provider API key to encrypt and store at startup.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Bearer tokens accepted by the HTTP endpoint.
    #[serde(default)]
    pub tokens: Vec<TokenSecret>,
}

/// One bearer token and the requester it authenticates.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSecret {
    pub token: String,
    pub requester_id: RequesterId,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.scrivener/config.toml`
    /// 3. `/etc/scrivener/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            ScrivenerError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            ScrivenerError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.settings.validate()?;
        Ok(config)
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(ScrivenerError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".scrivener").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/scrivener/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(ScrivenerError::Configuration(
            "No config file found. Create ~/.scrivener/config.toml or /etc/scrivener/config.toml"
                .to_string(),
        ))
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (the secret may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".scrivener").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/scrivener/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScrivenerError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            ScrivenerError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            ScrivenerError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(ScrivenerError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Key-store secret, falling back to [`SECRET_ENV_VAR`].
    pub fn secret(&self) -> Result<String> {
        self.secret
            .clone()
            .or_else(|| std::env::var(SECRET_ENV_VAR).ok())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ScrivenerError::Configuration(format!(
                    "no key-store secret: set `secret` in secrets.toml or {SECRET_ENV_VAR}"
                ))
            })
    }

    /// API key to seed at startup, falling back to [`API_KEY_ENV_VAR`].
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Bearer token table for the HTTP layer.
    pub fn token_table(&self) -> TokenTable {
        self.tokens.iter().fold(TokenTable::new(), |table, t| {
            table.insert(t.token.clone(), Requester::new(t.requester_id, t.roles.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Model;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:9742");
        assert_eq!(config.provider.timeout_secs, 120);
        assert!(config.provider.base_url.is_none());
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [server]
            address = "0.0.0.0:9742"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:9742");
        assert_eq!(config.settings.max_tokens, 500);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:8080"

            [settings]
            model = "gpt-4o"
            max_tokens = 1200
            rate_limit = 5
            cache_ttl_secs = 0
            allowed_subject_types = ["post"]

            [provider]
            base_url = "http://localhost:4000"
            timeout_secs = 30

            [storage]
            data_dir = "/var/lib/scrivener"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.model, Model::Gpt4o);
        assert_eq!(config.settings.max_tokens, 1200);
        assert_eq!(config.settings.rate_limit, 5);
        assert_eq!(config.settings.cache_ttl_secs, 0);
        assert_eq!(config.settings.allowed_subject_types, vec!["post"]);
        // Unset fields keep their defaults
        assert_eq!(config.settings.temperature, 0.7);
        assert_eq!(config.provider.base_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(
            config.storage.usage_log(),
            PathBuf::from("/var/lib/scrivener/usage.jsonl")
        );
    }

    #[test]
    fn out_of_range_settings_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[settings]\nmax_tokens = 9000\n").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ScrivenerError::Configuration(_))
        ));
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            secret = "process-secret"
            api_key = "sk-test"

            [[tokens]]
            token = "tok-admin"
            requester_id = 1
            roles = ["administrator"]

            [[tokens]]
            token = "tok-editor"
            requester_id = 2
            roles = ["editor"]
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.secret().unwrap(), "process-secret");
        assert_eq!(secrets.api_key().as_deref(), Some("sk-test"));

        let table = secrets.token_table();
        let admin = table.lookup("tok-admin").unwrap();
        assert!(admin.is_admin());
        assert_eq!(table.lookup("tok-editor").unwrap().id, 2);
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }
}
