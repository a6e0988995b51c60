use anyhow::{anyhow, Context, Result};
use log::info;
use std::path::PathBuf;

use crate::config::Config;
use crate::controller::{DisplayMetrics, Host, ScreenController};
use crate::geometry::Rotation;
use crate::hardware::CameraHardware;

/// Host without a window: notifications go to the log
pub struct HeadlessHost {
    metrics: DisplayMetrics,
    pub notifications: Vec<String>,
    pub finished: bool,
}

impl HeadlessHost {
    pub fn new(config: &Config) -> Self {
        Self {
            metrics: DisplayMetrics {
                width: config.display.width,
                height: config.display.height,
                rotation: Rotation::Rotation0,
            },
            notifications: Vec::new(),
            finished: false,
        }
    }
}

impl Host for HeadlessHost {
    fn display(&self) -> DisplayMetrics {
        self.metrics
    }

    fn notify(&mut self, message: &str) {
        info!("Notification: {}", message);
        self.notifications.push(message.to_string());
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

/// Runs one visible session on `camera`: show the screen, take a single
/// picture, hide the screen.
pub async fn run_headless(
    hardware: Box<dyn CameraHardware>,
    config: &Config,
    camera: usize,
) -> Result<PathBuf> {
    let mut controller = ScreenController::new(hardware, HeadlessHost::new(config), config);

    controller.on_create();
    let cameras = controller.camera_selector().labels().len();
    if camera >= cameras {
        return Err(anyhow!("No camera with index {} ({} available)", camera, cameras));
    }
    controller.on_camera_selected(0);
    controller.on_resume();
    if camera != 0 {
        controller.on_camera_selected(camera);
    }

    if controller.host().finished {
        return Err(anyhow!("Camera {} could not be opened", camera));
    }

    let surface = controller
        .surface()
        .ok_or_else(|| anyhow!("No preview surface attached"))?;
    controller.on_surface_created(surface.id);
    controller.on_surface_changed(surface.id, surface.size);
    if controller.host().finished {
        return Err(anyhow!("Preview surface could not be attached"));
    }

    let result = controller.capture().await;
    controller.on_surface_destroyed(surface.id);
    controller.on_pause();

    result.context("Capture failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, ConfigBuilder};
    use crate::hardware::Size;
    use crate::simulated::SimulatedHardware;
    use tempfile::TempDir;

    fn config(dir: &std::path::Path) -> Config {
        let mut back = CameraConfig::main_back();
        back.picture_sizes = vec![Size::new(48, 32)];
        let mut front = CameraConfig::selfie_front();
        front.picture_sizes = vec![Size::new(20, 10)];
        ConfigBuilder::new()
            .pictures_dir(dir)
            .cameras(vec![back, front])
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_headless_session_saves_one_picture() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        let hardware = SimulatedHardware::from_config(&config);

        let path = run_headless(Box::new(hardware.clone()), &config, 1).await.unwrap();

        assert!(path.exists());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
        assert_eq!(hardware.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_headless_session_rejects_unknown_camera() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        let hardware = SimulatedHardware::from_config(&config);

        assert!(run_headless(Box::new(hardware.clone()), &config, 9).await.is_err());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
        // No camera was opened
        assert_eq!(hardware.release_count(), 0);
    }

    #[tokio::test]
    async fn test_headless_session_reports_busy_camera() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        let hardware = SimulatedHardware::from_config(&config);
        hardware.set_busy(0, true);

        assert!(run_headless(Box::new(hardware.clone()), &config, 0).await.is_err());
        assert_eq!(hardware.open_handles(), 0);
    }
}
