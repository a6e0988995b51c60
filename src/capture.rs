use crate::error::CameraError;
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn decode_picture(data: &[u8]) -> Result<RgbImage, CameraError> {
    let picture = image::load_from_memory(data).map_err(CameraError::Decode)?;
    Ok(picture.to_rgb8())
}

/// Rotates clockwise by `degrees`. Right angles are exact, anything else is
/// resampled about the center into a canvas of the same size.
pub fn rotate_picture(picture: RgbImage, degrees: u32) -> RgbImage {
    match degrees % 360 {
        0 => picture,
        90 => image::imageops::rotate90(&picture),
        180 => image::imageops::rotate180(&picture),
        270 => image::imageops::rotate270(&picture),
        other => rotate_about_center(
            &picture,
            (other as f32).to_radians(),
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
        ),
    }
}

pub fn picture_file_name(timestamp_millis: i64) -> String {
    format!("image{}.jpg", timestamp_millis)
}

pub fn encode_jpeg<W: Write>(picture: &RgbImage, writer: &mut W, quality: u8) -> Result<(), CameraError> {
    let mut encoder = JpegEncoder::new_with_quality(writer, quality);
    encoder
        .encode(picture.as_raw(), picture.width(), picture.height(), ColorType::Rgb8)
        .map_err(CameraError::Encode)
}

/// Writes captured pictures as timestamped JPEG files into one directory
#[derive(Debug, Clone)]
pub struct PictureStore {
    dir: PathBuf,
    quality: u8,
}

impl PictureStore {
    pub fn new(dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            dir: dir.into(),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `picture` as `image<unix-millis>.jpg`, creating the directory if needed.
    ///
    /// The file is written under a hidden temporary name and renamed into
    /// place, so a failed save leaves no partial `image*.jpg` behind.
    pub fn save(&self, picture: &RgbImage) -> Result<PathBuf, CameraError> {
        fs::create_dir_all(&self.dir).map_err(|e| CameraError::save(&self.dir, e))?;

        let file_name = picture_file_name(Utc::now().timestamp_millis());
        let path = self.dir.join(&file_name);
        let partial = self.dir.join(format!(".{}.part", file_name));

        if let Err(e) = self.write_file(picture, &partial) {
            if partial.exists() {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    warn!("Failed to remove partial file {}: {}", partial.display(), cleanup);
                }
            }
            return Err(e);
        }

        commit_partial(&partial, &path)?;

        debug!("Picture saved to {}", path.display());
        Ok(path)
    }

    fn write_file(&self, picture: &RgbImage, path: &Path) -> Result<(), CameraError> {
        let file = File::create(path).map_err(|e| CameraError::save(path, e))?;
        let mut writer = BufWriter::new(file);
        encode_jpeg(picture, &mut writer, self.quality)?;
        writer.flush().map_err(|e| CameraError::save(path, e))
    }
}

/// Moves a fully written `partial` file to `path`, removing it if the move fails
fn commit_partial(partial: &Path, path: &Path) -> Result<(), CameraError> {
    fs::rename(partial, path).map_err(|e| {
        if let Err(cleanup) = fs::remove_file(partial) {
            warn!("Failed to remove partial file {}: {}", partial.display(), cleanup);
        }
        CameraError::save(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        })
    }

    #[test]
    fn test_rotate_right_angles_swap_dimensions() {
        let picture = gradient(40, 20);
        assert_eq!(rotate_picture(picture.clone(), 0).dimensions(), (40, 20));
        assert_eq!(rotate_picture(picture.clone(), 90).dimensions(), (20, 40));
        assert_eq!(rotate_picture(picture.clone(), 180).dimensions(), (40, 20));
        assert_eq!(rotate_picture(picture, 270).dimensions(), (20, 40));
    }

    #[test]
    fn test_rotate_90_is_clockwise() {
        let mut picture = RgbImage::new(3, 2);
        picture.put_pixel(0, 0, Rgb([255, 0, 0]));
        let rotated = rotate_picture(picture, 90);
        // Top-left moves to top-right
        assert_eq!(*rotated.get_pixel(1, 0), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_rotate_arbitrary_angle_keeps_canvas() {
        let rotated = rotate_picture(gradient(30, 30), 45);
        assert_eq!(rotated.dimensions(), (30, 30));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_picture(b"not a jpeg"),
            Err(CameraError::Decode(_))
        ));
    }

    #[test]
    fn test_encode_then_decode_keeps_dimensions() {
        let mut data = Vec::new();
        encode_jpeg(&gradient(64, 48), &mut data, 90).unwrap();
        assert_eq!(decode_picture(&data).unwrap().dimensions(), (64, 48));
    }

    #[test]
    fn test_save_creates_timestamped_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let store = PictureStore::new(temp_dir.path().join("Pictures"), 100);

        let path = store.save(&gradient(32, 24)).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        let digits = name
            .strip_prefix("image")
            .and_then(|rest| rest.strip_suffix(".jpg"))
            .unwrap();
        assert!(!digits.is_empty());
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        // Only the final file remains
        let entries: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_into_unwritable_target_fails_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("Pictures");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = PictureStore::new(&blocker, 100);
        assert!(matches!(
            store.save(&gradient(8, 8)),
            Err(CameraError::Save { .. })
        ));

        // The next attempt into a usable directory is not blocked
        let store = PictureStore::new(temp_dir.path().join("Other"), 100);
        assert!(store.save(&gradient(8, 8)).is_ok());
    }

    #[test]
    fn test_failed_commit_removes_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let partial = temp_dir.path().join(".image1.jpg.part");
        std::fs::write(&partial, b"jpeg bytes").unwrap();

        // A non-empty directory cannot be replaced by a file
        let target = temp_dir.path().join("image1.jpg");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        assert!(matches!(
            commit_partial(&partial, &target),
            Err(CameraError::Save { .. })
        ));
        assert!(!partial.exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_quality_is_clamped() {
        let store = PictureStore::new("unused", 0);
        assert_eq!(store.quality, 1);
    }
}
