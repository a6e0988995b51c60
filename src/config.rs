use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hardware::{Facing, Size};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub display: DisplayConfig,
    pub capture: CaptureConfig,
    pub paths: PathConfig,
    pub cameras: Vec<CameraConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub jpeg_quality: u8,
    /// How long to wait for the camera to deliver a picture
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub pictures_dir: PathBuf,
    pub config_file: PathBuf,
}

/// A camera exposed by the simulated hardware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub facing: Facing,
    pub orientation: u32,
    pub max_zoom: u32,
    pub preview_sizes: Vec<Size>,
    pub picture_sizes: Vec<Size>,
}

impl CameraConfig {
    pub fn main_back() -> Self {
        Self {
            facing: Facing::Back,
            orientation: 90,
            max_zoom: 30,
            preview_sizes: vec![
                Size::new(1920, 1080),
                Size::new(1280, 720),
                Size::new(800, 480),
                Size::new(640, 480),
                Size::new(352, 288),
            ],
            picture_sizes: vec![
                Size::new(640, 480),
                Size::new(3264, 2448),
                Size::new(1920, 1080),
                Size::new(2048, 1536),
                Size::new(1280, 720),
            ],
        }
    }

    pub fn selfie_front() -> Self {
        Self {
            facing: Facing::Front,
            orientation: 270,
            max_zoom: 0,
            preview_sizes: vec![Size::new(1280, 720), Size::new(640, 480)],
            picture_sizes: vec![
                Size::new(1280, 960),
                Size::new(640, 480),
                Size::new(1600, 1200),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig {
                width: 960,
                height: 540,
                fullscreen: false,
            },
            capture: CaptureConfig {
                jpeg_quality: 100,
                timeout_ms: 10_000,
            },
            paths: PathConfig {
                pictures_dir: PathBuf::from("Pictures"),
                config_file: PathBuf::from("camera_config.toml"),
            },
            cameras: vec![CameraConfig::main_back(), CameraConfig::selfie_front()],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("camera_config.toml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            log::info!("Config file not found, creating default configuration");
            let default_config = Self::default();
            default_config.save()?;
            Ok(default_config)
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| "Failed to parse configuration file")?;
        config.validate()?;

        log::info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_file(&self.paths.config_file)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(anyhow::anyhow!("Invalid display dimensions"));
        }

        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG quality must be within 1..=100"));
        }

        if self.capture.timeout_ms == 0 {
            return Err(anyhow::anyhow!("Capture timeout must be positive"));
        }

        if self.cameras.is_empty() {
            return Err(anyhow::anyhow!("At least one camera must be configured"));
        }

        for (index, camera) in self.cameras.iter().enumerate() {
            if camera.orientation >= 360 {
                return Err(anyhow::anyhow!("Camera {}: invalid orientation {}", index, camera.orientation));
            }
            if camera.preview_sizes.is_empty() || camera.picture_sizes.is_empty() {
                return Err(anyhow::anyhow!("Camera {}: no supported sizes", index));
            }
            let mut sizes = camera.preview_sizes.iter().chain(&camera.picture_sizes);
            if let Some(size) = sizes.find(|s| s.width == 0 || s.height == 0) {
                return Err(anyhow::anyhow!("Camera {}: invalid size {}", index, size));
            }
        }

        Ok(())
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture.timeout_ms)
    }

    pub fn display_size(&self) -> Size {
        Size::new(self.display.width, self.display.height)
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Starts from an already loaded configuration, e.g. to apply overrides
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn display_size(mut self, width: u32, height: u32) -> Self {
        self.config.display.width = width;
        self.config.display.height = height;
        self
    }

    pub fn fullscreen(mut self, enabled: bool) -> Self {
        self.config.display.fullscreen = enabled;
        self
    }

    pub fn pictures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.pictures_dir = dir.into();
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.capture.jpeg_quality = quality;
        self
    }

    pub fn capture_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.capture.timeout_ms = timeout_ms;
        self
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn cameras(mut self, cameras: Vec<CameraConfig>) -> Self {
        self.config.cameras = cameras;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Presets
impl Config {
    pub fn phone_portrait() -> Self {
        Config {
            display: DisplayConfig {
                width: 1080,
                height: 1920,
                fullscreen: true,
            },
            ..Default::default()
        }
    }

    pub fn development_desktop() -> Self {
        Config {
            display: DisplayConfig {
                width: 1280,
                height: 720,
                fullscreen: false,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.jpeg_quality, 100);
        assert_eq!(config.cameras.len(), 2);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .display_size(1024, 768)
            .fullscreen(true)
            .pictures_dir("/tmp/shots")
            .capture_timeout_ms(250)
            .build()
            .unwrap();

        assert_eq!(config.display.width, 1024);
        assert_eq!(config.display.height, 768);
        assert!(config.display.fullscreen);
        assert_eq!(config.paths.pictures_dir, PathBuf::from("/tmp/shots"));
        assert_eq!(config.capture_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.capture.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.capture.jpeg_quality = 100;
        config.cameras[0].orientation = 360;
        assert!(config.validate().is_err());

        config.cameras[0].orientation = 90;
        config.cameras[1].picture_sizes.clear();
        assert!(config.validate().is_err());

        config.cameras.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_rejects_zero_size() {
        let mut camera = CameraConfig::main_back();
        camera.preview_sizes.push(Size::new(0, 480));
        assert!(ConfigBuilder::new().cameras(vec![camera]).build().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let original_config = Config::phone_portrait();
        original_config.save_to_file(&config_path).unwrap();

        let loaded_config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(original_config.display.width, loaded_config.display.width);
        assert_eq!(original_config.display.height, loaded_config.display.height);
        assert_eq!(loaded_config.cameras[1].facing, Facing::Front);
        assert_eq!(
            original_config.cameras[0].picture_sizes,
            loaded_config.cameras[0].picture_sizes
        );
    }

    #[test]
    fn test_preset_configs() {
        assert!(Config::phone_portrait().validate().is_ok());
        assert!(Config::development_desktop().validate().is_ok());
    }
}
