use crate::scheduler::ExtractionPolicy;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use url::Url;

/// Daemon configuration, loaded from a YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub node: NodeConfig,
    pub storage: Vec<StorageSinkConfig>,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Bearer token required on every control API call when set.
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 8010, auth_token: None }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Chain node API endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub url: Url,
    /// Opaque auth token passed through to the node API.
    #[serde(default)]
    pub token: Option<String>,
}

/// One named storage sink.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSinkConfig {
    pub name: String,
    /// sqlx connection string, e.g. `sqlite://indexer.db`.
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub on_error: ExtractionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OtelConfig {
    /// OTLP collector endpoint. Instrumentation is skipped when unset.
    pub endpoint: Option<Url>,
    pub service_name: String,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self { endpoint: None, service_name: "indexer".to_string() }
    }
}

impl IndexerConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: IndexerConfig =
            serde_yaml::from_str(content).context("failed to deserialize config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.is_empty() {
            bail!("at least one storage sink must be configured");
        }
        let mut seen = HashSet::new();
        for sink in &self.storage {
            if sink.name.is_empty() {
                bail!("storage sink names must not be empty");
            }
            if !seen.insert(sink.name.as_str()) {
                bail!("duplicate storage sink name {:?}", sink.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
node:
  url: http://127.0.0.1:1234/rpc/v0
storage:
  - name: primary
    url: sqlite://indexer.db
"#;

    #[test]
    fn minimal_config_fills_in_defaults() {
        let config = IndexerConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.server.port, 8010);
        assert_eq!(config.extraction.on_error, ExtractionPolicy::Skip);
        assert!(config.otel.endpoint.is_none());
        assert_eq!(config.storage[0].name, "primary");
    }

    #[test]
    fn rejects_empty_sink_list() {
        let raw = r#"
node:
  url: http://127.0.0.1:1234/rpc/v0
storage: []
"#;
        assert!(IndexerConfig::from_yaml_str(raw).is_err());
    }

    #[test]
    fn rejects_duplicate_sink_names() {
        let raw = r#"
node:
  url: http://127.0.0.1:1234/rpc/v0
storage:
  - name: primary
    url: sqlite://a.db
  - name: primary
    url: sqlite://b.db
"#;
        assert!(IndexerConfig::from_yaml_str(raw).is_err());
    }

    #[test]
    fn parses_the_full_surface() {
        let raw = r#"
server:
  host: 0.0.0.0
  port: 9000
  auth_token: sekrit
node:
  url: http://10.0.0.5:1234/rpc/v0
  token: node-token
storage:
  - name: primary
    url: sqlite://primary.db
  - name: scratch
    url: sqlite://scratch.db
extraction:
  on_error: fail
otel:
  endpoint: http://127.0.0.1:4317
  service_name: indexer-dev
"#;
        let config = IndexerConfig::from_yaml_str(raw).unwrap();
        assert_eq!(config.server.addr().to_string(), "0.0.0.0:9000");
        assert_eq!(config.extraction.on_error, ExtractionPolicy::Fail);
        assert_eq!(config.storage.len(), 2);
        assert_eq!(config.otel.service_name, "indexer-dev");
    }
}
