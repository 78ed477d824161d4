use anyhow::Context;
use folio_collab::AuthorityConfig;
use folio_history::HistoryConfig;
use folio_model::{Schema, SchemaSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

/// Folio configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Path to a JSON schema spec; the basic schema when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default)]
    pub history: HistoryOptions,

    #[serde(default)]
    pub authority: AuthorityOptions,

    #[serde(default)]
    pub simulation: SimulationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryOptions {
    /// Undo events kept (0 = unlimited)
    pub depth: usize,
    pub new_group_delay_ms: u64,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        let defaults = HistoryConfig::default();
        Self {
            depth: defaults.depth,
            new_group_delay_ms: defaults.new_group_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorityOptions {
    /// Confirmed steps kept for catching clients up (0 = unlimited)
    pub max_log: usize,
}

impl Default for AuthorityOptions {
    fn default() -> Self {
        Self {
            max_log: AuthorityConfig::default().max_log,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationOptions {
    pub clients: usize,
    pub rounds: usize,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self { clients: 3, rounds: 10 }
    }
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// The configured schema, resolved relative to `cwd`.
    pub fn load_schema(&self, cwd: &Path) -> anyhow::Result<Schema> {
        let Some(path) = &self.schema else {
            return Ok(folio_schema_basic::schema());
        };
        let path = PathBuf::from(cwd).join(path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read schema {}", path.display()))?;
        let spec: SchemaSpec = serde_json::from_str(&content)
            .with_context(|| format!("Invalid schema spec {}", path.display()))?;
        Ok(Schema::new(spec)?)
    }

    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            depth: self.history.depth,
            new_group_delay: Duration::from_millis(self.history.new_group_delay_ms),
        }
    }

    pub fn authority_config(&self) -> AuthorityConfig {
        AuthorityConfig {
            max_log: self.authority.max_log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "history": { "depth": 20, "newGroupDelayMs": 1000 },
            "authority": { "maxLog": 50 },
            "simulation": { "clients": 5 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.history.depth, 20);
        assert_eq!(config.history_config().new_group_delay, Duration::from_secs(1));
        assert_eq!(config.authority_config().max_log, 50);
        assert_eq!(config.simulation.clients, 5);
        assert_eq!(config.simulation.rounds, 10);
        assert_eq!(config.schema, None);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.history_config(), HistoryConfig::default());
        assert_eq!(config.authority_config(), AuthorityConfig::default());
        assert_eq!(config.simulation.clients, 3);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        let schema = config.load_schema(dir.path()).unwrap();
        assert!(schema.node_type("paragraph").is_some());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "authority": { "maxLog": 0 } }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.authority.max_log, 0);
        assert_eq!(config.history, HistoryOptions::default());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_custom_schema_is_loaded() {
        let dir = TempDir::new().unwrap();
        let spec = serde_json::json!({
            "nodes": [
                { "name": "doc", "content": "line+" },
                { "name": "line", "content": "text*" },
                { "name": "text" }
            ],
            "marks": []
        });
        std::fs::write(dir.path().join("schema.json"), spec.to_string()).unwrap();
        let config = Config {
            schema: Some("schema.json".to_string()),
            ..Config::default()
        };
        let schema = config.load_schema(dir.path()).unwrap();
        assert!(schema.node_type("line").is_some());
        assert!(schema.node_type("paragraph").is_none());
    }
}
