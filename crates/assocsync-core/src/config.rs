use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// ConsoleConfig
///
/// Every field has a default, so an empty document is a valid config.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub remote: RemoteConfig,
    pub buckets: BucketConfig,
    pub functions: FunctionConfig,
    pub session: SessionConfig,
    pub stores: StoreConfig,
}

impl ConsoleConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&source)
    }
}

///
/// RemoteConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub base_url: String,
    pub anon_key: String,
}

///
/// BucketConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BucketConfig {
    pub documents: String,
    pub avatars: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            documents: "documents".into(),
            avatars: "avatars".into(),
        }
    }
}

///
/// FunctionConfig
///
/// Names of the privileged remote procedures.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FunctionConfig {
    pub send_email: String,
    pub create_user: String,
    pub delete_user: String,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            send_email: "send-email".into(),
            create_user: "create-user".into(),
            delete_user: "delete-user".into(),
        }
    }
}

///
/// SessionConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Pause between the session-expired notice and the forced logout.
    pub logout_delay_ms: u64,
}

impl SessionConfig {
    #[must_use]
    pub const fn logout_delay(&self) -> Duration {
        Duration::from_millis(self.logout_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            logout_delay_ms: 1500,
        }
    }
}

///
/// StoreConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Row cap for list reads that do not set their own limit.
    pub default_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_limit: crate::DEFAULT_LIST_LIMIT,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ConsoleConfig::from_toml_str("").unwrap();

        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.buckets.documents, "documents");
        assert_eq!(config.session.logout_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn sections_override_individual_fields() {
        let config = ConsoleConfig::from_toml_str(
            r#"
            [remote]
            base_url = "https://assoc.example.org"

            [session]
            logout_delay_ms = 250

            [functions]
            send_email = "notify"
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.base_url, "https://assoc.example.org");
        assert_eq!(config.session.logout_delay_ms, 250);
        assert_eq!(config.functions.send_email, "notify");
        assert_eq!(config.functions.create_user, "create-user");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ConsoleConfig::from_toml_str("[session]\nlogout_delay = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ConsoleConfig::from_path("/nonexistent/assocsync.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/assocsync.toml"));
    }
}
