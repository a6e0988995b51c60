use crate::error::CameraError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::oneshot;

/// Pixel dimensions of a preview or picture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Selector label, `<width>x<height>`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Back,
    Front,
}

impl Facing {
    pub fn name(&self) -> &'static str {
        match self {
            Facing::Back => "back",
            Facing::Front => "front",
        }
    }
}

/// Static metadata of a camera, fixed for the lifetime of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraInfo {
    pub facing: Facing,
    /// Clockwise angle the sensor image must be rotated to be upright
    /// in the device's natural orientation.
    pub orientation: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraParameters {
    pub zoom: u32,
    pub max_zoom: u32,
    pub preview_size: Size,
    pub picture_size: Size,
    pub supported_preview_sizes: Vec<Size>,
    pub supported_picture_sizes: Vec<Size>,
}

/// Drawable target the compositor hands to the camera for preview frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSurface {
    pub id: u64,
    pub size: Size,
}

pub type ShutterCallback = Box<dyn FnOnce() + Send + 'static>;

/// Handle to one open camera device.
///
/// Operations after `release` are a caller bug; `CameraBinding` guarantees
/// release happens exactly once.
pub trait CameraDevice: Send {
    fn parameters(&self) -> CameraParameters;
    fn set_parameters(&mut self, parameters: CameraParameters) -> Result<(), CameraError>;
    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), CameraError>;
    fn set_preview_display(&mut self, surface: &PreviewSurface) -> Result<(), CameraError>;
    fn start_preview(&mut self) -> Result<(), CameraError>;
    fn stop_preview(&mut self) -> Result<(), CameraError>;

    /// Starts a still capture. `shutter` fires at the moment of exposure,
    /// the encoded picture arrives on the returned channel from the
    /// device's own thread. The preview stops until restarted.
    fn take_picture(
        &mut self,
        shutter: ShutterCallback,
    ) -> Result<oneshot::Receiver<Vec<u8>>, CameraError>;

    /// Latest frame rendered to the preview surface, if the device exposes it
    fn preview_frame(&mut self) -> Option<RgbImage> {
        None
    }

    fn release(&mut self);
}

/// Entry point to the platform's cameras
pub trait CameraHardware: Send {
    fn number_of_cameras(&self) -> usize;
    fn camera_info(&self, index: usize) -> Result<CameraInfo, CameraError>;
    fn open(&mut self, index: usize) -> Result<Box<dyn CameraDevice>, CameraError>;
}
