use crate::error::CameraError;
use crate::hardware::{CameraDevice, CameraHardware, CameraInfo};
use log::{debug, info};

/// One open camera device paired with the metadata captured when it was opened.
///
/// The device is released when the binding is dropped, so every successful
/// open is matched by exactly one release.
pub struct CameraBinding {
    index: usize,
    device: Box<dyn CameraDevice>,
    info: CameraInfo,
}

impl CameraBinding {
    pub fn new(index: usize, device: Box<dyn CameraDevice>, info: CameraInfo) -> Self {
        Self { index, device, info }
    }

    /// Opens camera `index` with zoom reset to its minimum
    pub fn open(hardware: &mut dyn CameraHardware, index: usize) -> Result<Self, CameraError> {
        let info = hardware.camera_info(index)?;
        let device = hardware.open(index)?;
        // Constructed before touching parameters so a failure below still releases
        let mut binding = Self::new(index, device, info);

        let mut parameters = binding.device.parameters();
        parameters.zoom = 0;
        binding.device.set_parameters(parameters)?;

        info!(
            "Opened camera {} ({}, sensor orientation {})",
            index,
            info.facing.name(),
            info.orientation
        );
        Ok(binding)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn info(&self) -> &CameraInfo {
        &self.info
    }

    pub fn device(&self) -> &dyn CameraDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn CameraDevice {
        self.device.as_mut()
    }

    pub fn set_display_orientation(&mut self, degrees: u32) -> Result<(), CameraError> {
        self.device.set_display_orientation(degrees)
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for CameraBinding {
    fn drop(&mut self) {
        self.device.release();
        debug!("Released camera {}", self.index);
    }
}
