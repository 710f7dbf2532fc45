use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{
    degrade::DegradationParams,
    error::{ConfigError, Result},
    sink::PreviewWindow,
    video::{ChannelOrder, Dimensions},
};

/// Main configuration for lofi-cam
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Impairment settings
    pub degradation: DegradationParams,

    /// Virtual camera output
    pub camera: CameraConfig,

    /// Local preview window
    pub preview: PreviewConfig,

    /// Session-wide settings
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.degradation.validate()?;
        self.camera.validate()?;
        self.preview.validate()?;
        Ok(())
    }
}

/// Virtual camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// v4l2loopback device to publish to
    pub device: String,

    /// Channel order the consuming device expects
    pub channel_order: ChannelOrder,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video10".to_string(),
            channel_order: ChannelOrder::Rgb,
        }
    }
}

impl CameraConfig {
    fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "camera.device".to_string(),
                value: self.device.clone()
            }.into());
        }
        Ok(())
    }
}

/// Preview window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Show the preview window at all
    pub enabled: bool,

    pub title: String,

    /// On-screen width in pixels
    pub width: u32,

    /// On-screen height in pixels
    pub height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Processed Frame".to_string(),
            width: 192,
            height: 108,
        }
    }
}

impl PreviewConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "preview.size".to_string(),
                value: format!("{}x{}", self.width, self.height)
            }.into());
        }
        Ok(())
    }

    pub fn window(&self) -> PreviewWindow {
        PreviewWindow {
            title: self.title.clone(),
            size: Dimensions::new(self.width, self.height),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed seed for noise, drop and jitter draws
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("lofi.toml");

        let mut original_config = Config::default();
        original_config.degradation.drop_rate = 0.25;
        original_config.camera.channel_order = ChannelOrder::Bgr;
        original_config.session.seed = Some(1234);

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(
            &file_path,
            "[degradation]\nscale_factor = 0.25\n\n[camera]\nchannel_order = \"bgr\"\n",
        )
        .unwrap();

        let config = Config::from_file(&file_path).unwrap();

        assert_eq!(config.degradation.scale_factor, 0.25);
        assert_eq!(config.degradation.noise_level, 0.2);
        assert_eq!(config.camera.channel_order, ChannelOrder::Bgr);
        assert_eq!(config.camera.device, "/dev/video10");
        assert_eq!(config.preview.title, "Processed Frame");
        assert_eq!(config.session.seed, None);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/no/such/lofi.toml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::LofiCamError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_degradation_rejected() {
        let mut config = Config::default();
        config.degradation.drop_rate = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_device_rejected() {
        let mut config = Config::default();
        config.camera.device = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_preview_size_rejected() {
        let mut config = Config::default();
        config.preview.width = 0;
        assert!(config.validate().is_err());
    }
}
