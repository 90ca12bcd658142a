use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

pub const DEFAULT_TOPIC: &str = "org.fedoraproject.prod.buildsys.tag";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:bodhi.db?mode=rwc";

/// What the consumer does with a message it could not handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop consuming and surface the error (default)
    #[default]
    Abort,
    /// Write the raw message to the dead-letter file and carry on
    DeadLetter,
}

impl FailurePolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::DeadLetter => "dead_letter",
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(Self::Abort),
            "dead_letter" | "dead-letter" => Ok(Self::DeadLetter),
            _ => Err(Error::InvalidConfig(format!("unknown failure policy '{s}'"))),
        }
    }
}

/// Consumer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Only messages on this topic reach the handler
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub dead_letter_path: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            topic: default_topic(),
            failure_policy: FailurePolicy::default(),
            dead_letter_path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `BODHI_*` variables supplied by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("BODHI_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(topic) = lookup("BODHI_SIGNED_TOPIC") {
            config.topic = topic;
        }
        if let Some(policy) = lookup("BODHI_FAILURE_POLICY") {
            config.failure_policy = policy.parse()?;
        }
        if let Some(path) = lookup("BODHI_DEAD_LETTER_PATH") {
            config.dead_letter_path = Some(PathBuf::from(path));
        }
        if let Some(max) = lookup("BODHI_DB_MAX_CONNECTIONS") {
            config.max_connections = max.parse().map_err(|_| {
                Error::InvalidConfig(format!("BODHI_DB_MAX_CONNECTIONS is not a number: {max}"))
            })?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.failure_policy == FailurePolicy::DeadLetter && self.dead_letter_path.is_none() {
            return Err(Error::InvalidConfig(
                "dead_letter policy needs a dead_letter_path".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.topic, DEFAULT_TOPIC);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("BODHI_DATABASE_URL", "sqlite::memory:"),
            ("BODHI_SIGNED_TOPIC", "org.fedoraproject.stg.buildsys.tag"),
            ("BODHI_FAILURE_POLICY", "dead-letter"),
            ("BODHI_DEAD_LETTER_PATH", "/var/lib/bodhi/dead.jsonl"),
            ("BODHI_DB_MAX_CONNECTIONS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.topic, "org.fedoraproject.stg.buildsys.tag");
        assert_eq!(config.failure_policy, FailurePolicy::DeadLetter);
        assert_eq!(config.max_connections, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = Config::from_lookup(lookup_from(&[("BODHI_FAILURE_POLICY", "retry")]));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_bad_connection_count() {
        let result = Config::from_lookup(lookup_from(&[("BODHI_DB_MAX_CONNECTIONS", "lots")]));
        assert!(result.is_err());

        let config = Config {
            max_connections: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn dead_letter_needs_path() {
        let config = Config {
            failure_policy: FailurePolicy::DeadLetter,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"failure_policy": "dead_letter"}"#).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::DeadLetter);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 5);
    }
}
