use anyhow::Result;
use clap::{Parser, ValueEnum};
use eframe::egui;
use log::info;
use std::path::PathBuf;

mod binding;
mod capture;
mod config;
mod controller;
mod error;
mod geometry;
mod hardware;
mod headless;
mod simulated;
mod texture;
mod ui;

use crate::config::{Config, ConfigBuilder};
use crate::controller::ScreenController;
use crate::simulated::SimulatedHardware;
use crate::ui::{CameraApp, WindowHost};

#[derive(Parser, Debug)]
#[command(name = "pocket-camera")]
#[command(about = "Single-screen camera with camera and resolution switching")]
#[command(version)]
struct Cli {
    /// Take one picture without opening a window and print its path
    #[arg(long)]
    headless: bool,

    /// Camera index to use in headless mode
    #[arg(requires = "headless")]
    camera: Option<usize>,

    /// Start from a built-in configuration instead of camera_config.toml
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Cover the whole screen
    #[arg(long)]
    fullscreen: bool,

    /// Directory pictures are saved to
    #[arg(long)]
    pictures_dir: Option<PathBuf>,

    /// JPEG quality of saved pictures
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// How long to wait for a picture, in milliseconds
    #[arg(long)]
    capture_timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    Phone,
    Desktop,
}

impl Cli {
    fn base_config(&self) -> Result<Config> {
        match self.preset {
            Some(Preset::Phone) => Ok(Config::phone_portrait()),
            Some(Preset::Desktop) => Ok(Config::development_desktop()),
            None => Config::load(),
        }
    }

    /// Applies command line overrides on top of `config`
    fn apply(&self, config: Config) -> Result<Config> {
        let mut builder = ConfigBuilder::from_config(config);
        if self.fullscreen {
            builder = builder.fullscreen(true);
        }
        if let Some(dir) = &self.pictures_dir {
            builder = builder.pictures_dir(dir.clone());
        }
        if let Some(quality) = self.quality {
            builder = builder.jpeg_quality(quality);
        }
        if let Some(timeout_ms) = self.capture_timeout_ms {
            builder = builder.capture_timeout_ms(timeout_ms);
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    info!("📷 Starting Pocket Camera");

    // Load configuration
    let config = cli.apply(cli.base_config()?)?;
    info!(
        "Configuration loaded: {}x{} display, {} camera(s)",
        config.display.width,
        config.display.height,
        config.cameras.len()
    );

    let hardware = SimulatedHardware::from_config(&config);

    if cli.headless {
        let camera = cli.camera.unwrap_or(0);
        let path = headless::run_headless(Box::new(hardware), &config, camera).await?;
        println!("{}", path.display());
        return Ok(());
    }

    let display = config.display_size();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([display.width as f32, display.height as f32])
            .with_min_inner_size([320.0, 240.0])
            .with_fullscreen(config.display.fullscreen),
        ..Default::default()
    };

    info!("Launching GUI application...");

    let host = WindowHost::new(display.width, display.height);
    let controller = ScreenController::new(Box::new(hardware), host, &config);

    eframe::run_native(
        "Pocket Camera",
        options,
        Box::new(move |cc| {
            setup_touch_style(&cc.egui_ctx);
            Box::new(CameraApp::new(controller))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))?;

    info!("Application shut down gracefully");
    Ok(())
}

fn setup_touch_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    // Larger controls for touch interaction
    style.spacing.button_padding = egui::vec2(16.0, 12.0);
    style.spacing.item_spacing = egui::vec2(12.0, 8.0);
    style.spacing.combo_width = 160.0;

    style.text_styles.insert(
        egui::TextStyle::Button,
        egui::FontId::new(18.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Body,
        egui::FontId::new(16.0, egui::FontFamily::Proportional),
    );

    ctx.set_style(style);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_headless_with_camera() {
        let cli = Cli::try_parse_from(["pocket-camera", "--headless", "1"]).unwrap();
        assert!(cli.headless);
        assert_eq!(cli.camera, Some(1));

        let cli = Cli::try_parse_from(["pocket-camera", "--preset", "phone", "--headless"]).unwrap();
        assert!(cli.headless);
        assert_eq!(cli.camera, None);
        assert_eq!(cli.preset, Some(Preset::Phone));
    }

    #[test]
    fn test_cli_rejects_bad_arguments() {
        // A camera index only makes sense for a headless shot
        assert!(Cli::try_parse_from(["pocket-camera", "1"]).is_err());
        assert!(Cli::try_parse_from(["pocket-camera", "--quality", "0"]).is_err());
        assert!(Cli::try_parse_from(["pocket-camera", "--bogus"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "pocket-camera",
            "--preset",
            "desktop",
            "--fullscreen",
            "--pictures-dir",
            "/tmp/shots",
            "--quality",
            "80",
            "--capture-timeout-ms",
            "500",
        ])
        .unwrap();

        let config = cli.apply(cli.base_config().unwrap()).unwrap();
        assert_eq!(config.display_size(), crate::hardware::Size::new(1280, 720));
        assert!(config.display.fullscreen);
        assert_eq!(config.paths.pictures_dir, PathBuf::from("/tmp/shots"));
        assert_eq!(config.capture.jpeg_quality, 80);
        assert_eq!(config.capture.timeout_ms, 500);
    }
}
