//! Configuration system.
//!
//! Client settings are a JSON object; every field has a default so a partial
//! file (or none at all) is valid.

use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// World client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Event server address, e.g. `127.0.0.1:40000`.
    pub server_addr: String,
    /// Spawn new players at the per-race table position instead of the
    /// server-supplied one.
    pub use_custom_spawns: bool,
    /// Height above ground entities are placed at.
    pub height_offset: f32,
    /// Flat-ground level. `None` means no ground query is available.
    pub ground_level: Option<f32>,
    /// Root directory for visual assets.
    pub assets_dir: String,
    /// Asset used when a monster's own asset fails to resolve.
    pub default_monster_asset: Option<String>,
    /// Directory of the cross-scene handoff store.
    pub handoff_dir: String,
    /// Discard handoff payloads older than this.
    pub handoff_max_age_secs: Option<u64>,
    /// Delay between readiness checks at startup.
    pub init_retry_delay_ms: u64,
    /// Readiness checks before startup gives up.
    pub init_max_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:40000".to_string(),
            use_custom_spawns: false,
            height_offset: 0.0,
            ground_level: None,
            assets_dir: "assets".to_string(),
            default_monster_asset: Some("Monsters/Default".to_string()),
            handoff_dir: "handoff".to_string(),
            handoff_max_age_secs: None,
            init_retry_delay_ms: 500,
            init_max_attempts: 20,
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn init_retry_delay(&self) -> Duration {
        Duration::from_millis(self.init_retry_delay_ms)
    }

    pub fn handoff_max_age(&self) -> Option<chrono::Duration> {
        self.handoff_max_age_secs
            .and_then(|s| i64::try_from(s).ok())
            .map(chrono::Duration::seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ClientConfig::from_json_str(
            r#"{"server_addr":"10.0.0.2:7000","use_custom_spawns":true,"height_offset":1.5}"#,
        )
        .unwrap();
        assert_eq!(cfg.server_addr, "10.0.0.2:7000");
        assert!(cfg.use_custom_spawns);
        assert_eq!(cfg.height_offset, 1.5);
        assert_eq!(cfg.init_max_attempts, 20);
        assert_eq!(cfg.init_retry_delay(), Duration::from_millis(500));
        assert_eq!(cfg.handoff_max_age(), None);
    }

    #[test]
    fn empty_object_is_default() {
        let cfg = ClientConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg.assets_dir, "assets");
        assert_eq!(cfg.ground_level, None);
    }
}
