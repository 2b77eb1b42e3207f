use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LinkError, Result};
use crate::input::KeyBindings;
use crate::protocol::PidGains;
use crate::utils::consts::*;

/// Runtime settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub bind: String,
    pub peer: String,
    pub tick_ms: u64,
    pub speed_limit: u16,
    pub gains: PidGains,
    pub keys: KeyBindings,
    pub log_level: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.into(),
            peer: DEFAULT_PEER_ADDR.into(),
            tick_ms: DEFAULT_TICK_MS,
            speed_limit: 0,
            gains: PidGains::default(),
            keys: KeyBindings::default(),
            log_level: LOG_LEVEL.into(),
        }
    }
}

impl LinkConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LinkError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| LinkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(LinkError::Config("tick_ms must be positive".into()));
        }
        if self.speed_limit > SPEED_LIMIT_MAX {
            return Err(LinkError::Config(format!(
                "speed_limit {} exceeds {}",
                self.speed_limit, SPEED_LIMIT_MAX
            )));
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
