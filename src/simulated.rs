use crate::capture::{encode_jpeg, rotate_picture};
use crate::config::{CameraConfig, Config};
use crate::error::CameraError;
use crate::hardware::{
    CameraDevice, CameraHardware, CameraInfo, CameraParameters, PreviewSurface, ShutterCallback, Size,
};
use image::{ImageBuffer, Rgb, RgbImage};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

const PICTURE_QUALITY: u8 = 90;

/// What the most recently used device was told to do
#[derive(Debug, Clone, Default)]
#[cfg_attr(not(test), allow(dead_code))]
pub struct DeviceSnapshot {
    pub display_orientation: Option<u32>,
    pub picture_size: Option<Size>,
    pub surface: Option<PreviewSurface>,
    pub previewing: bool,
}

#[derive(Default)]
struct SharedState {
    open_handles: AtomicUsize,
    release_count: AtomicUsize,
    initial_zoom: AtomicU32,
    open_indices: Mutex<HashSet<usize>>,
    busy: Mutex<HashSet<usize>>,
    fail_surface: AtomicBool,
    withhold_pictures: AtomicBool,
    withheld: Mutex<Vec<oneshot::Sender<Vec<u8>>>>,
    snapshot: Mutex<DeviceSnapshot>,
}

impl SharedState {
    fn update_snapshot(&self, update: impl FnOnce(&mut DeviceSnapshot)) {
        if let Ok(mut snapshot) = self.snapshot.lock() {
            update(&mut snapshot);
        }
    }
}

/// Cameras backed by generated test patterns instead of a sensor.
///
/// Clones share state, so a clone kept outside the controller observes
/// everything the controller does to the devices.
#[derive(Clone)]
pub struct SimulatedHardware {
    cameras: Vec<CameraConfig>,
    state: Arc<SharedState>,
}

impl SimulatedHardware {
    pub fn new(cameras: Vec<CameraConfig>) -> Self {
        Self {
            cameras,
            state: Arc::new(SharedState::default()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cameras.clone())
    }

    fn camera(&self, index: usize) -> Result<&CameraConfig, CameraError> {
        self.cameras.get(index).ok_or(CameraError::NoSuchCamera(index))
    }
}

// Hooks for observing and steering the simulated devices
#[cfg_attr(not(test), allow(dead_code))]
impl SimulatedHardware {
    pub fn open_handles(&self) -> usize {
        self.state.open_handles.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.state.release_count.load(Ordering::SeqCst)
    }

    /// Zoom level a freshly opened device reports
    pub fn set_initial_zoom(&self, zoom: u32) {
        self.state.initial_zoom.store(zoom, Ordering::SeqCst);
    }

    /// A busy camera fails to open, as if another process held it
    pub fn set_busy(&self, index: usize, busy: bool) {
        if let Ok(mut set) = self.state.busy.lock() {
            if busy {
                set.insert(index);
            } else {
                set.remove(&index);
            }
        }
    }

    pub fn fail_surface_binding(&self, fail: bool) {
        self.state.fail_surface.store(fail, Ordering::SeqCst);
    }

    /// Holds back captured pictures until `release_withheld` or `drop_withheld`
    pub fn withhold_pictures(&self, withhold: bool) {
        self.state.withhold_pictures.store(withhold, Ordering::SeqCst);
    }

    pub fn release_withheld(&self, data: Vec<u8>) {
        if let Ok(mut withheld) = self.state.withheld.lock() {
            for sender in withheld.drain(..) {
                let _ = sender.send(data.clone());
            }
        }
    }

    pub fn drop_withheld(&self) {
        if let Ok(mut withheld) = self.state.withheld.lock() {
            withheld.clear();
        }
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.state
            .snapshot
            .lock()
            .map(|snapshot| snapshot.clone())
            .unwrap_or_default()
    }
}

impl CameraHardware for SimulatedHardware {
    fn number_of_cameras(&self) -> usize {
        self.cameras.len()
    }

    fn camera_info(&self, index: usize) -> Result<CameraInfo, CameraError> {
        let camera = self.camera(index)?;
        Ok(CameraInfo {
            facing: camera.facing,
            orientation: camera.orientation,
        })
    }

    fn open(&mut self, index: usize) -> Result<Box<dyn CameraDevice>, CameraError> {
        let camera = self.camera(index)?.clone();

        let busy = self
            .state
            .busy
            .lock()
            .map(|set| set.contains(&index))
            .unwrap_or(false);
        if busy {
            return Err(CameraError::open(index, "camera is in use by another client"));
        }

        {
            let mut open = self
                .state
                .open_indices
                .lock()
                .map_err(|_| CameraError::open(index, "camera service unavailable"))?;
            if !open.insert(index) {
                return Err(CameraError::open(index, "camera is already open"));
            }
        }

        self.state.open_handles.fetch_add(1, Ordering::SeqCst);
        self.state
            .update_snapshot(|snapshot| *snapshot = DeviceSnapshot::default());

        let parameters = CameraParameters {
            zoom: self.state.initial_zoom.load(Ordering::SeqCst).min(camera.max_zoom),
            max_zoom: camera.max_zoom,
            preview_size: camera.preview_sizes[0],
            picture_size: camera.picture_sizes[0],
            supported_preview_sizes: camera.preview_sizes.clone(),
            supported_picture_sizes: camera.picture_sizes.clone(),
        };

        debug!("Simulated camera {} opened", index);
        Ok(Box::new(SimulatedDevice {
            index,
            parameters,
            state: Arc::clone(&self.state),
            surface: None,
            previewing: false,
            display_orientation: 0,
            tick: 0,
            released: false,
        }))
    }
}

pub struct SimulatedDevice {
    index: usize,
    parameters: CameraParameters,
    state: Arc<SharedState>,
    surface: Option<PreviewSurface>,
    previewing: bool,
    display_orientation: u32,
    tick: u32,
    released: bool,
}

impl SimulatedDevice {
    fn ensure_open(&self) -> Result<(), CameraError> {
        if self.released {
            Err(CameraError::NotOpen)
        } else {
            Ok(())
        }
    }

    fn set_previewing(&mut self, previewing: bool) {
        self.previewing = previewing;
        self.state.update_snapshot(|snapshot| snapshot.previewing = previewing);
    }
}

impl CameraDevice for SimulatedDevice {
    fn parameters(&self) -> CameraParameters {
        self.parameters.clone()
    }

    fn set_parameters(&mut self, parameters: CameraParameters) -> Result<(), CameraError> {
        self.ensure_open()?;

        if parameters.zoom > self.parameters.max_zoom {
            return Err(CameraError::Parameters(format!("zoom {} out of range", parameters.zoom)));
        }
        if !self.parameters.supported_picture_sizes.contains(&parameters.picture_size) {
            return Err(CameraError::Parameters(format!(
                "unsupported picture size {}",
                parameters.picture_size
            )));
        }
        if !self.parameters.supported_preview_sizes.contains(&parameters.preview_size) {
            return Err(CameraError::Parameters(format!(
                "unsupported preview size {}",
                parameters.preview_size
            )));
        }

        self.parameters.zoom = parameters.zoom;
        self.parameters.picture_size = parameters.picture_size;
        self.parameters.preview_size = parameters.preview_size;
        let picture_size = parameters.picture_size;
        self.state.update_snapshot(|snapshot| snapshot.picture_size = Some(picture_size));
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), CameraError> {
        self.ensure_open()?;
        self.display_orientation = degrees % 360;
        self.state
            .update_snapshot(|snapshot| snapshot.display_orientation = Some(degrees % 360));
        Ok(())
    }

    fn set_preview_display(&mut self, surface: &PreviewSurface) -> Result<(), CameraError> {
        self.ensure_open()?;
        if self.state.fail_surface.load(Ordering::SeqCst) {
            return Err(CameraError::Surface(format!("surface {} is not valid", surface.id)));
        }
        self.surface = Some(*surface);
        let surface = *surface;
        self.state.update_snapshot(|snapshot| snapshot.surface = Some(surface));
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.ensure_open()?;
        self.set_previewing(true);
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        self.ensure_open()?;
        self.set_previewing(false);
        Ok(())
    }

    fn take_picture(
        &mut self,
        shutter: ShutterCallback,
    ) -> Result<oneshot::Receiver<Vec<u8>>, CameraError> {
        self.ensure_open()?;
        if !self.previewing {
            return Err(CameraError::Preview("preview is not running".to_string()));
        }

        shutter();
        // Hardware stops the preview for a still capture
        self.set_previewing(false);

        let (tx, rx) = oneshot::channel();
        if self.state.withhold_pictures.load(Ordering::SeqCst) {
            if let Ok(mut withheld) = self.state.withheld.lock() {
                withheld.push(tx);
            }
            return Ok(rx);
        }

        let size = self.parameters.picture_size;
        let index = self.index;
        std::thread::spawn(move || {
            let picture = test_pattern(size, 0);
            let mut data = Vec::new();
            match encode_jpeg(&picture, &mut data, PICTURE_QUALITY) {
                Ok(()) => {
                    let _ = tx.send(data);
                }
                Err(e) => warn!("Simulated camera {} failed to encode picture: {}", index, e),
            }
        });

        Ok(rx)
    }

    fn preview_frame(&mut self) -> Option<RgbImage> {
        if self.released || !self.previewing || self.surface.is_none() {
            return None;
        }
        self.tick = self.tick.wrapping_add(1);
        let frame = test_pattern(self.parameters.preview_size, self.tick);
        Some(rotate_picture(frame, self.display_orientation))
    }

    fn release(&mut self) {
        if self.released {
            warn!("Simulated camera {} released twice", self.index);
            return;
        }
        self.released = true;
        self.previewing = false;
        self.state.open_handles.fetch_sub(1, Ordering::SeqCst);
        self.state.release_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut open) = self.state.open_indices.lock() {
            open.remove(&self.index);
        }
        self.state.update_snapshot(|snapshot| snapshot.previewing = false);
    }
}

/// Gradient with a marker in the sensor's top-left corner, shifted by `tick`
fn test_pattern(size: Size, tick: u32) -> RgbImage {
    let width = size.width.max(1);
    let height = size.height.max(1);
    let marker = (width.min(height) / 8).max(1);
    let offset = tick.wrapping_mul(4) % width;

    ImageBuffer::from_fn(width, height, |x, y| {
        if x < marker && y < marker {
            return Rgb([255, 0, 0]);
        }
        let shifted = (x + offset) % width;
        let r = (shifted * 255 / width) as u8;
        let g = (y * 255 / height) as u8;
        let b = ((x + y) * 255 / (width + height)) as u8;
        Rgb([r, g, b])
    })
}
