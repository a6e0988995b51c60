use crate::binding::CameraBinding;
use crate::capture::{decode_picture, rotate_picture, PictureStore};
use crate::config::Config;
use crate::error::CameraError;
use crate::geometry::{
    best_preview_size, capture_rotation, display_angle, scaled_preview_size, sort_picture_sizes,
    PreviewLayout, Rotation,
};
use crate::hardware::{CameraHardware, PreviewSurface, Size};
use image::RgbImage;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::oneshot::{self, error::TryRecvError};

pub const CAMERA_ACCESS_ERROR: &str = "Cannot access the camera";
pub const SAVE_ERROR: &str = "Error saving file";
pub const CAPTURE_FAILED: &str = "Capture failed";
pub const CAPTURE_TIMED_OUT: &str = "Capture timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
}

impl DisplayMetrics {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// The runtime hosting the screen: window metrics, user notifications and
/// the ability to close the screen.
pub trait Host {
    fn display(&self) -> DisplayMetrics;
    fn notify(&mut self, message: &str);
    fn finish(&mut self);
    fn set_borderless(&mut self, _borderless: bool) {}
}

/// Contents of a drop-down selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    labels: Vec<String>,
    selected: usize,
    enabled: bool,
}

impl Selector {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_label(&self) -> Option<&str> {
        self.labels.get(self.selected).map(String::as_str)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

struct PendingCapture {
    rx: oneshot::Receiver<Vec<u8>>,
    deadline: Instant,
}

/// Drives the camera screen. Every public `on_*` method is an event handler
/// invoked by the host; they run one at a time.
pub struct ScreenController<H: Host> {
    hardware: Box<dyn CameraHardware>,
    host: H,
    store: PictureStore,
    capture_timeout: Duration,

    binding: Option<CameraBinding>,
    surface: Option<PreviewSurface>,
    layout: Option<PreviewLayout>,
    next_surface_id: u64,

    camera_selector: Selector,
    resolution_selector: Selector,
    picture_sizes: Vec<Size>,
    // Selectors report their initial value once on registration
    skip_next_camera_selection: bool,

    pending_capture: Option<PendingCapture>,
}

impl<H: Host> ScreenController<H> {
    pub fn new(hardware: Box<dyn CameraHardware>, host: H, config: &Config) -> Self {
        Self {
            hardware,
            host,
            store: PictureStore::new(&config.paths.pictures_dir, config.capture.jpeg_quality),
            capture_timeout: config.capture_timeout(),
            binding: None,
            surface: None,
            layout: None,
            next_surface_id: 0,
            camera_selector: Selector::default(),
            resolution_selector: Selector::default(),
            picture_sizes: Vec::new(),
            skip_next_camera_selection: false,
            pending_capture: None,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn on_create(&mut self) {
        info!("Camera screen created, pictures go to {}", self.store.dir().display());
        self.host.set_borderless(true);

        let count = self.hardware.number_of_cameras();
        let labels = (0..count)
            .map(|index| match self.hardware.camera_info(index) {
                Ok(info) => format!("{} ({})", index, info.facing.name()),
                Err(_) => index.to_string(),
            })
            .collect();

        self.camera_selector = Selector {
            labels,
            selected: 0,
            enabled: count > 1,
        };
        self.skip_next_camera_selection = true;
    }

    pub fn on_resume(&mut self) {
        info!("Camera screen visible");
        self.camera_selector.selected = 0;
        self.init_camera(0);
    }

    pub fn on_pause(&mut self) {
        info!("Camera screen hidden");
        self.release_camera();
    }

    pub fn on_configuration_changed(&mut self) {
        if self.binding.is_none() {
            return;
        }

        self.apply_display_orientation();
        if let Some((_, layout)) = self.preview_layout() {
            if let Some(surface) = self.surface.as_mut() {
                surface.size = layout.size;
            }
            self.layout = Some(layout);
            debug!("Preview relaid out to {}", layout.size);
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn on_camera_selected(&mut self, position: usize) {
        if std::mem::take(&mut self.skip_next_camera_selection) {
            debug!("Ignoring initial camera selection {}", position);
            return;
        }
        if position >= self.camera_selector.labels.len() {
            warn!("Camera selection {} out of range", position);
            return;
        }

        self.camera_selector.selected = position;
        self.init_camera(position);
    }

    pub fn on_resolution_selected(&mut self, position: usize) {
        let Some(size) = self.picture_sizes.get(position).copied() else {
            warn!("Resolution selection {} out of range", position);
            return;
        };
        let Some(binding) = self.binding.as_mut() else {
            return;
        };

        let mut parameters = binding.device().parameters();
        parameters.picture_size = size;
        match binding.device_mut().set_parameters(parameters) {
            Ok(()) => {
                self.resolution_selector.selected = position;
                debug!("Picture size set to {}", size);
            }
            Err(e) => warn!("Failed to apply picture size {}: {}", size, e),
        }
    }

    // ------------------------------------------------------------------
    // Camera binding
    // ------------------------------------------------------------------

    /// Replaces the current binding with camera `index`. On failure the user
    /// is told and the screen finishes.
    pub fn init_camera(&mut self, index: usize) {
        self.release_camera();

        match CameraBinding::open(self.hardware.as_mut(), index) {
            Ok(binding) => {
                self.binding = Some(binding);
                self.attach_preview_surface();
                self.populate_resolution_selector();
                self.apply_display_orientation();
            }
            Err(e) => {
                error!("Failed to open camera {}: {}", index, e);
                self.host.notify(CAMERA_ACCESS_ERROR);
                self.host.finish();
            }
        }
    }

    fn release_camera(&mut self) {
        if self.pending_capture.take().is_some() {
            warn!("Abandoning pending capture");
        }
        self.surface = None;
        self.layout = None;
        if let Some(binding) = self.binding.take() {
            binding.release();
        }
    }

    fn preview_layout(&self) -> Option<(Size, PreviewLayout)> {
        let binding = self.binding.as_ref()?;
        let display = self.host.display();
        let sizes = binding.device().parameters().supported_preview_sizes;

        let best = best_preview_size(&sizes, display.aspect_ratio()).unwrap_or_else(|| {
            warn!("Camera reports no preview sizes, using display size");
            display.size()
        });
        Some((best, scaled_preview_size(best, display.size())))
    }

    fn attach_preview_surface(&mut self) {
        let Some((best, layout)) = self.preview_layout() else {
            return;
        };

        if let Some(binding) = self.binding.as_mut() {
            let mut parameters = binding.device().parameters();
            if parameters.supported_preview_sizes.contains(&best) && parameters.preview_size != best {
                parameters.preview_size = best;
                if let Err(e) = binding.device_mut().set_parameters(parameters) {
                    warn!("Failed to apply preview size {}: {}", best, e);
                }
            }
        }

        self.next_surface_id += 1;
        self.surface = Some(PreviewSurface {
            id: self.next_surface_id,
            size: layout.size,
        });
        self.layout = Some(layout);
        debug!(
            "Attached preview surface {} ({} for preview {})",
            self.next_surface_id, layout.size, best
        );
    }

    fn populate_resolution_selector(&mut self) {
        let Some(binding) = self.binding.as_ref() else {
            return;
        };

        let mut sizes = binding.device().parameters().supported_picture_sizes;
        sort_picture_sizes(&mut sizes);

        self.resolution_selector = Selector {
            labels: sizes.iter().map(Size::label).collect(),
            selected: 0,
            enabled: !sizes.is_empty(),
        };
        self.picture_sizes = sizes;

        if !self.picture_sizes.is_empty() {
            self.on_resolution_selected(0);
        }
    }

    fn apply_display_orientation(&mut self) {
        let rotation = self.host.display().rotation;
        let Some(binding) = self.binding.as_mut() else {
            return;
        };

        let angle = display_angle(binding.info(), rotation);
        match binding.set_display_orientation(angle) {
            Ok(()) => debug!("Display orientation set to {}", angle),
            Err(e) => warn!("Failed to set display orientation {}: {}", angle, e),
        }
    }

    fn resume_preview(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            if let Err(e) = binding.device_mut().start_preview() {
                warn!("Failed to restart preview: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Surface
    // ------------------------------------------------------------------

    fn is_current_surface(&self, surface_id: u64) -> bool {
        self.surface.map_or(false, |surface| surface.id == surface_id)
    }

    pub fn on_surface_created(&mut self, surface_id: u64) {
        if !self.is_current_surface(surface_id) {
            debug!("Ignoring creation of stale surface {}", surface_id);
            return;
        }
        if let Some(binding) = self.binding.as_mut() {
            if let Err(e) = binding.device_mut().start_preview() {
                warn!("Failed to start preview: {}", e);
            }
        }
    }

    pub fn on_surface_changed(&mut self, surface_id: u64, size: Size) {
        if !self.is_current_surface(surface_id) {
            debug!("Ignoring change of stale surface {}", surface_id);
            return;
        }
        let (Some(surface), Some(binding)) = (self.surface, self.binding.as_mut()) else {
            return;
        };

        debug!("Surface {} changed to {}", surface_id, size);
        let device = binding.device_mut();
        if let Err(e) = device.stop_preview() {
            warn!("Failed to stop preview: {}", e);
        }

        match device.set_preview_display(&surface) {
            Ok(()) => {
                if let Err(e) = device.start_preview() {
                    warn!("Failed to start preview: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to attach surface {}: {}", surface_id, e);
                self.host.notify(CAMERA_ACCESS_ERROR);
                self.host.finish();
            }
        }
    }

    pub fn on_surface_destroyed(&mut self, surface_id: u64) {
        debug!("Surface {} destroyed", surface_id);
    }

    // ------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------

    pub fn on_shutter_pressed(&mut self) {
        match self.request_capture() {
            Ok(()) | Err(CameraError::CaptureInProgress) => {}
            Err(e) => debug!("Shutter press ignored: {}", e),
        }
    }

    /// Asks the camera for a still picture. The result is collected by
    /// `poll_capture` or awaited by `capture`.
    pub fn request_capture(&mut self) -> Result<(), CameraError> {
        if self.pending_capture.is_some() {
            return Err(CameraError::CaptureInProgress);
        }
        let binding = self.binding.as_mut().ok_or(CameraError::NotOpen)?;

        let rx = match binding
            .device_mut()
            .take_picture(Box::new(|| debug!("Shutter")))
        {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Failed to take picture: {}", e);
                self.host.notify(CAPTURE_FAILED);
                return Err(e);
            }
        };

        self.pending_capture = Some(PendingCapture {
            rx,
            deadline: Instant::now() + self.capture_timeout,
        });
        info!("Capture requested");
        Ok(())
    }

    /// Non-blocking check for a requested picture. Returns `None` while the
    /// capture is still in flight or when none was requested.
    pub fn poll_capture(&mut self) -> Option<Result<PathBuf, CameraError>> {
        let pending = self.pending_capture.as_mut()?;

        match pending.rx.try_recv() {
            Ok(data) => {
                self.pending_capture = None;
                Some(self.on_picture_taken(data))
            }
            Err(TryRecvError::Empty) => {
                if Instant::now() < pending.deadline {
                    return None;
                }
                self.pending_capture = None;
                Some(Err(self.abandon_capture(CameraError::CaptureTimeout(self.capture_timeout))))
            }
            Err(TryRecvError::Closed) => {
                self.pending_capture = None;
                Some(Err(self.abandon_capture(CameraError::Capture(
                    "picture was never delivered".to_string(),
                ))))
            }
        }
    }

    /// Takes a picture and waits for it to be saved
    pub async fn capture(&mut self) -> Result<PathBuf, CameraError> {
        self.request_capture()?;
        let pending = self.pending_capture.take().ok_or(CameraError::NotOpen)?;
        let remaining = pending.deadline.saturating_duration_since(Instant::now());

        match tokio::time::timeout(remaining, pending.rx).await {
            Ok(Ok(data)) => self.on_picture_taken(data),
            Ok(Err(_)) => Err(self.abandon_capture(CameraError::Capture(
                "picture was never delivered".to_string(),
            ))),
            Err(_) => Err(self.abandon_capture(CameraError::CaptureTimeout(self.capture_timeout))),
        }
    }

    fn abandon_capture(&mut self, e: CameraError) -> CameraError {
        warn!("Capture abandoned: {}", e);
        let message = match e {
            CameraError::CaptureTimeout(_) => CAPTURE_TIMED_OUT,
            _ => CAPTURE_FAILED,
        };
        self.host.notify(message);
        self.resume_preview();
        e
    }

    /// Handles a delivered picture: rotate upright, save, report, resume preview
    pub fn on_picture_taken(&mut self, data: Vec<u8>) -> Result<PathBuf, CameraError> {
        let Some(binding) = self.binding.as_ref() else {
            warn!("Picture delivered with no open camera, discarding");
            return Err(CameraError::NotOpen);
        };
        let rotation = capture_rotation(binding.info(), self.host.display().rotation);

        let result = decode_picture(&data)
            .map(|picture| rotate_picture(picture, rotation))
            .and_then(|picture| self.store.save(&picture));

        match &result {
            Ok(path) => {
                info!("Picture saved to {}", path.display());
                self.host.notify(&format!("Picture saved: {}", path.display()));
            }
            Err(e) => {
                error!("Failed to save picture: {}", e);
                self.host.notify(SAVE_ERROR);
            }
        }

        self.resume_preview();
        result
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn binding(&self) -> Option<&CameraBinding> {
        self.binding.as_ref()
    }

    pub fn surface(&self) -> Option<PreviewSurface> {
        self.surface
    }

    pub fn layout(&self) -> Option<PreviewLayout> {
        self.layout
    }

    pub fn camera_selector(&self) -> &Selector {
        &self.camera_selector
    }

    pub fn resolution_selector(&self) -> &Selector {
        &self.resolution_selector
    }

    pub fn is_capture_pending(&self) -> bool {
        self.pending_capture.is_some()
    }

    pub fn preview_frame(&mut self) -> Option<RgbImage> {
        self.binding.as_mut()?.device_mut().preview_frame()
    }
}
