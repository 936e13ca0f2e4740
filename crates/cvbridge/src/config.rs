//! Process-wide bridge configuration
//!
//! The bridge keeps no per-call state; the only global it owns is this
//! set of safety limits, initialized lazily from the environment and
//! replaceable by the host through `cvb_configure`.

use std::sync::LazyLock;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{CvError, Result};

const DEFAULT_MAX_DECODE_BYTES: usize = 256 * 1024 * 1024;
const DEFAULT_MAX_IMAGE_PIXELS: u64 = 1 << 28;
const DEFAULT_LOG_FILTER: &str = "cvbridge=info";

static CONFIG: LazyLock<RwLock<BridgeConfig>> =
    LazyLock::new(|| RwLock::new(BridgeConfig::from_env()));

/// Limits and logging defaults shared by every entry point
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Largest encoded input accepted by `decode_memory`
    pub max_decode_bytes: usize,
    /// Largest width × height any decode, construction or resize may produce
    pub max_image_pixels: u64,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
            max_image_pixels: DEFAULT_MAX_IMAGE_PIXELS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `CVBRIDGE_MAX_DECODE_BYTES`,
    /// `CVBRIDGE_MAX_IMAGE_PIXELS` and `CVBRIDGE_LOG`.
    ///
    /// Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_number("CVBRIDGE_MAX_DECODE_BYTES") {
            config.max_decode_bytes = v as usize;
        }
        if let Some(v) = env_number("CVBRIDGE_MAX_IMAGE_PIXELS") {
            config.max_image_pixels = v;
        }
        if let Ok(filter) = std::env::var("CVBRIDGE_LOG") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }
        config
    }

    /// Parse a JSON object; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CvError::invalid(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_decode_bytes == 0 {
            return Err(CvError::invalid("max_decode_bytes must be positive"));
        }
        if self.max_image_pixels == 0 {
            return Err(CvError::invalid("max_image_pixels must be positive"));
        }
        Ok(())
    }

    /// Reject images whose pixel count exceeds `max_image_pixels`.
    pub fn check_pixels(&self, width: u32, height: u32) -> Result<()> {
        let pixels = width as u64 * height as u64;
        if pixels > self.max_image_pixels {
            return Err(CvError::LimitExceeded(format!(
                "{}x{} exceeds {} pixels",
                width, height, self.max_image_pixels
            )));
        }
        Ok(())
    }
}

fn env_number(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// Snapshot of the current configuration.
pub fn current() -> BridgeConfig {
    CONFIG.read().clone()
}

/// Replace the process-wide configuration.
pub fn replace(config: BridgeConfig) {
    *CONFIG.write() = config;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.max_decode_bytes, 256 * 1024 * 1024);
        assert_eq!(config.log_filter, "cvbridge=info");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json(r#"{"max_image_pixels": 1000}"#).unwrap();
        assert_eq!(config.max_image_pixels, 1000);
        assert_eq!(config.max_decode_bytes, DEFAULT_MAX_DECODE_BYTES);
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(BridgeConfig::from_json(r#"{"max_decode_bytes": 0}"#).is_err());
        assert!(BridgeConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_check_pixels() {
        let config = BridgeConfig {
            max_image_pixels: 100,
            ..Default::default()
        };
        assert!(config.check_pixels(10, 10).is_ok());
        assert!(matches!(
            config.check_pixels(11, 10),
            Err(CvError::LimitExceeded(_))
        ));
    }
}
