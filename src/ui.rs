use std::time::{Duration, Instant};
use eframe::egui;

use crate::controller::{DisplayMetrics, Host, ScreenController};
use crate::geometry::Rotation;

// ============================================================================
// CONSTANTS FOR UI STYLING
// ============================================================================
const TOAST_DURATION: Duration = Duration::from_millis(3500);
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const UI_PADDING: f32 = 12.0;

// ============================================================================
// WINDOW HOST
// ============================================================================

pub struct Toast {
    pub message: String,
    pub shown_at: Instant,
}

/// Host state backed by the eframe window
pub struct WindowHost {
    pub metrics: DisplayMetrics,
    pub toasts: Vec<Toast>,
    pub finish_requested: bool,
    pub borderless: Option<bool>,
}

impl WindowHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            metrics: DisplayMetrics {
                width,
                height,
                rotation: Rotation::Rotation0,
            },
            toasts: Vec::new(),
            finish_requested: false,
            borderless: None,
        }
    }
}

impl Host for WindowHost {
    fn display(&self) -> DisplayMetrics {
        self.metrics
    }

    fn notify(&mut self, message: &str) {
        log::info!("Notification: {}", message);
        self.toasts.push(Toast {
            message: message.to_string(),
            shown_at: Instant::now(),
        });
    }

    fn finish(&mut self) {
        self.finish_requested = true;
    }

    fn set_borderless(&mut self, borderless: bool) {
        self.borderless = Some(borderless);
    }
}

// ============================================================================
// MAIN APP STRUCT
// ============================================================================

pub struct CameraApp {
    pub controller: ScreenController<WindowHost>,
    pub preview_texture: Option<egui::TextureHandle>,
    pub visible: bool,
    pub announced_surface: Option<u64>,
    pub rotation: Rotation,
}

impl CameraApp {
    pub fn new(mut controller: ScreenController<WindowHost>) -> Self {
        controller.on_create();
        // The camera selector echoes its initial value when registered
        let initial = controller.camera_selector().selected();
        controller.on_camera_selected(initial);

        Self {
            controller,
            preview_texture: None,
            visible: false,
            announced_surface: None,
            rotation: Rotation::Rotation0,
        }
    }

    /// Maps the window being shown or minimized onto resume/pause
    fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.controller.on_resume();
        } else {
            self.controller.on_pause();
            self.preview_texture = None;
        }
    }

    /// Translates window size and simulated rotation into configuration changes
    fn track_display(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::R)) {
            self.rotation = self.rotation.next();
        }

        let pixels_per_point = ctx.pixels_per_point();
        let screen = ctx.screen_rect();
        let metrics = DisplayMetrics {
            width: (screen.width() * pixels_per_point).round().max(1.0) as u32,
            height: (screen.height() * pixels_per_point).round().max(1.0) as u32,
            rotation: self.rotation,
        };

        let host = self.controller.host_mut();
        if host.metrics != metrics {
            log::debug!(
                "Display changed to {}x{} at {} degrees",
                metrics.width,
                metrics.height,
                metrics.rotation.degrees()
            );
            host.metrics = metrics;
            if self.visible {
                self.controller.on_configuration_changed();
            }
        }
    }

    /// Reports surface lifecycle for whichever surface the controller attached
    fn track_surface(&mut self) {
        let current = self.controller.surface();
        if current.map(|s| s.id) == self.announced_surface {
            return;
        }

        if let Some(old) = self.announced_surface.take() {
            self.controller.on_surface_destroyed(old);
        }
        if let Some(surface) = current {
            self.controller.on_surface_created(surface.id);
            self.controller.on_surface_changed(surface.id, surface.size);
            self.announced_surface = Some(surface.id);
        }
    }

    fn show_controls(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(UI_PADDING / 2.0);
            ui.horizontal(|ui| {
                let cameras = self.controller.camera_selector().clone();
                let mut camera = cameras.selected();
                ui.add_enabled_ui(cameras.is_enabled(), |ui| {
                    egui::ComboBox::from_id_source("camera_switcher")
                        .selected_text(cameras.selected_label().unwrap_or("-"))
                        .show_ui(ui, |ui| {
                            for (index, label) in cameras.labels().iter().enumerate() {
                                ui.selectable_value(&mut camera, index, label.as_str());
                            }
                        });
                });
                if camera != cameras.selected() {
                    self.controller.on_camera_selected(camera);
                }

                let resolutions = self.controller.resolution_selector().clone();
                let mut resolution = resolutions.selected();
                ui.add_enabled_ui(resolutions.is_enabled(), |ui| {
                    egui::ComboBox::from_id_source("resolution_switcher")
                        .selected_text(resolutions.selected_label().unwrap_or("-"))
                        .show_ui(ui, |ui| {
                            for (index, label) in resolutions.labels().iter().enumerate() {
                                ui.selectable_value(&mut resolution, index, label.as_str());
                            }
                        });
                });
                if resolution != resolutions.selected() {
                    self.controller.on_resolution_selected(resolution);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let ready = self.controller.binding().is_some()
                        && !self.controller.is_capture_pending();
                    if ui
                        .add_enabled(ready, egui::Button::new("📷 Take picture"))
                        .clicked()
                    {
                        self.controller.on_shutter_pressed();
                    }
                });
            });
            ui.add_space(UI_PADDING / 2.0);
        });
    }

    fn show_preview(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.controller.preview_frame() {
            self.update_preview_texture(ctx, &frame);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let (Some(texture), Some(layout)) = (&self.preview_texture, self.controller.layout()) else {
                    ui.centered_and_justified(|ui| ui.label("No camera"));
                    return;
                };

                // Layout is in physical pixels and overhangs the display
                let pixels_per_point = ctx.pixels_per_point();
                let size = egui::vec2(
                    layout.size.width as f32 / pixels_per_point,
                    layout.size.height as f32 / pixels_per_point,
                );
                let rect = egui::Rect::from_center_size(ctx.screen_rect().center(), size);
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                ui.painter().image(texture.id(), rect, uv, egui::Color32::WHITE);
            });
    }

    fn show_toasts(&mut self, ctx: &egui::Context) {
        let host = self.controller.host_mut();
        host.toasts.retain(|toast| toast.shown_at.elapsed() < TOAST_DURATION);
        if host.toasts.is_empty() {
            return;
        }

        egui::Area::new("toasts")
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -UI_PADDING * 2.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                for toast in &host.toasts {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(&toast.message);
                    });
                }
            });
    }
}

// ============================================================================
// MAIN UPDATE LOOP
// ============================================================================

impl eframe::App for CameraApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        if let Some(borderless) = self.controller.host_mut().borderless.take() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Decorations(!borderless));
        }

        self.track_display(ctx);

        let minimized = ctx.input(|i| i.viewport().minimized.unwrap_or(false));
        self.set_visible(!minimized);

        self.track_surface();

        if let Some(result) = self.controller.poll_capture() {
            if let Err(e) = result {
                log::warn!("Capture finished with error: {}", e);
            }
        }

        self.show_controls(ctx);
        self.show_preview(ctx);
        self.show_toasts(ctx);

        if self.controller.host().finish_requested {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        ctx.request_repaint_after(FRAME_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.set_visible(false);
    }
}
