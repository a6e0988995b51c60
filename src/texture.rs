use egui::{Context, TextureOptions};
use image::RgbImage;
use crate::ui::CameraApp;

impl CameraApp {
    pub fn update_preview_texture(&mut self, ctx: &Context, frame: &RgbImage) {
        // Skip empty frames to prevent a flash
        if frame.width() == 0 || frame.height() == 0 {
            return;
        }

        let size = [frame.width() as usize, frame.height() as usize];
        let pixels = frame.as_flat_samples();

        let color_image = egui::ColorImage::from_rgb(size, pixels.as_slice());

        // Reuse the texture between frames; recreate when the preview size
        // changes (camera switch or display rotation)
        if let Some(texture) = self.preview_texture.as_mut().filter(|t| t.size() == size) {
            texture.set(color_image, TextureOptions::LINEAR);
            return;
        }

        let texture = ctx.load_texture("camera_preview", color_image, TextureOptions::LINEAR);
        self.preview_texture = Some(texture);
    }
}
