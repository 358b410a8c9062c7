//! Configuration loading and parsing.
//!
//! Parses `veer.toml` (or an override path provided by the binary) for the
//! three engine knobs: tick interval, manual-movement detection, and the
//! manual-override window. Unknown fields are ignored (TOML deserialization
//! tolerance) and a malformed file falls back to defaults, so a bad config
//! can never keep the engine from starting.

use std::{fs, path::PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

/// Default frame interval: 16 ms ≈ 60 Hz.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;
/// Default manual-override window after a detected user move.
pub const DEFAULT_MANUAL_OVERRIDE_MS: f64 = 300.0;

/// The resolved knobs the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigConfig {
    pub tick_interval_ms: u64,
    pub detect_manual_movement: bool,
    pub manual_override_ms: f64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            detect_manual_movement: true,
            manual_override_ms: DEFAULT_MANUAL_OVERRIDE_MS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct EngineSection {
    #[serde(default = "EngineSection::default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: Self::default_tick_interval(),
        }
    }
}

impl EngineSection {
    const fn default_tick_interval() -> u64 {
        DEFAULT_TICK_INTERVAL_MS
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ManualSection {
    #[serde(default = "ManualSection::default_detect")]
    pub detect: bool,
    #[serde(default = "ManualSection::default_timeout")]
    pub timeout_ms: f64,
}

impl Default for ManualSection {
    fn default() -> Self {
        Self {
            detect: Self::default_detect(),
            timeout_ms: Self::default_timeout(),
        }
    }
}

impl ManualSection {
    const fn default_detect() -> bool {
        true
    }
    const fn default_timeout() -> f64 {
        DEFAULT_MANUAL_OVERRIDE_MS
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub manual: ManualSection,
}

impl ConfigFile {
    pub fn resolve(&self) -> RigConfig {
        RigConfig {
            // A zero interval would spin the driver; clamp to 1 ms.
            tick_interval_ms: self.engine.tick_interval_ms.max(1),
            detect_manual_movement: self.manual.detect,
            manual_override_ms: self.manual.timeout_ms.max(0.0),
        }
    }
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("veer.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("veer").join("veer.toml");
    }
    PathBuf::from("veer.toml")
}

/// Load the config from `path`, or from discovery when absent. Missing and
/// malformed files both resolve to defaults.
pub fn load_from(path: Option<PathBuf>) -> Result<RigConfig> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                let config = file.resolve();
                info!(
                    target: "rig.config",
                    path = %path.display(),
                    tick_interval_ms = config.tick_interval_ms,
                    detect_manual = config.detect_manual_movement,
                    "config_loaded"
                );
                Ok(config)
            }
            Err(e) => {
                warn!(target: "rig.config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
                Ok(RigConfig::default())
            }
        },
        Err(_) => Ok(RigConfig::default()),
    }
}
