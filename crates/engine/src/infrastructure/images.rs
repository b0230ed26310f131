//! JPEG previews of generated images.
//!
//! ComfyUI writes full-size PNGs into its output (or temp) folder. The
//! panel serves a re-encoded JPEG copy instead, cached next to ComfyUI's
//! temp files as `<stem>_minify<ext>`.

use std::path::{Component, Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};

pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Folder configuration not found for type: {0}")]
    NotConfigured(String),

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Preview task failed: {0}")]
    Task(String),
}

/// Image folders shared with the ComfyUI installation.
#[derive(Debug, Clone, Default)]
pub struct ImagePreviews {
    output_folder: Option<PathBuf>,
    temp_folder: Option<PathBuf>,
}

impl ImagePreviews {
    pub fn new(output_folder: Option<PathBuf>, temp_folder: Option<PathBuf>) -> Self {
        Self {
            output_folder,
            temp_folder,
        }
    }

    /// Path of the file to serve for `filename`.
    ///
    /// Prefers the cached JPEG, creating it on first request; falls back to
    /// the original file when it cannot be re-encoded.
    pub async fn preview(&self, filename: &str, kind: &str) -> Result<PathBuf, PreviewError> {
        let base = if kind == "temp" {
            self.temp_folder.as_ref()
        } else {
            self.output_folder.as_ref()
        }
        .ok_or_else(|| PreviewError::NotConfigured(kind.to_string()))?;

        if !is_plain_relative(filename) {
            return Err(PreviewError::NotFound(filename.to_string()));
        }

        let original = base.join(filename);
        if !tokio::fs::try_exists(&original).await.unwrap_or(false) {
            return Err(PreviewError::NotFound(filename.to_string()));
        }

        let Some(temp_folder) = self.temp_folder.as_ref() else {
            return Ok(original);
        };
        let minified = temp_folder.join(minified_filename(filename));
        if tokio::fs::try_exists(&minified).await.unwrap_or(false) {
            return Ok(minified);
        }

        let (source, target) = (original.clone(), minified.clone());
        let encoded = tokio::task::spawn_blocking(move || compress_to_jpeg(&source, &target))
            .await
            .map_err(|e| PreviewError::Task(e.to_string()))?;

        match encoded {
            Ok(()) => Ok(minified),
            Err(e) => {
                tracing::warn!(file = %original.display(), error = %e, "JPEG preview failed, serving original");
                Ok(original)
            }
        }
    }
}

/// `ComfyUI_00001_.png` → `ComfyUI_00001__minify.png`
pub fn minified_filename(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_minify.{ext}"),
        None => format!("{stem}_minify"),
    }
}

fn is_plain_relative(filename: &str) -> bool {
    !filename.is_empty()
        && Path::new(filename)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Re-encode `input` as JPEG at `output`. Transparency is flattened onto
/// white.
fn compress_to_jpeg(input: &Path, output: &Path) -> image::ImageResult<()> {
    let image = image::open(input)?;
    let rgb = flatten_on_white(image);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(output)?);
    let result = JpegEncoder::new_with_quality(&mut file, JPEG_QUALITY).encode_image(&rgb);
    if result.is_err() {
        drop(file);
        let _ = std::fs::remove_file(output);
    }
    result
}

fn flatten_on_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }
    let rgba = image.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn write_png(path: &Path) {
        let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 0]));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[test]
    fn minified_name_keeps_extension() {
        assert_eq!(minified_filename("ComfyUI_00001_.png"), "ComfyUI_00001__minify.png");
        assert_eq!(minified_filename("noext"), "noext_minify");
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_on_white(img).get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[tokio::test]
    async fn creates_and_reuses_jpeg_preview() {
        let output = tempfile::tempdir().expect("tempdir");
        let temp = tempfile::tempdir().expect("tempdir");
        write_png(&output.path().join("a.png"));

        let previews = ImagePreviews::new(
            Some(output.path().to_path_buf()),
            Some(temp.path().to_path_buf()),
        );
        let served = previews.preview("a.png", "output").await.unwrap();
        assert_eq!(served, temp.path().join("a_minify.png"));

        let bytes = std::fs::read(&served).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);

        // second request hits the cache
        let again = previews.preview("a.png", "output").await.unwrap();
        assert_eq!(again, served);
    }

    #[tokio::test]
    async fn undecodable_file_falls_back_to_original() {
        let output = tempfile::tempdir().expect("tempdir");
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(output.path().join("b.png"), b"not an image").unwrap();

        let previews = ImagePreviews::new(
            Some(output.path().to_path_buf()),
            Some(temp.path().to_path_buf()),
        );
        let served = previews.preview("b.png", "output").await.unwrap();
        assert_eq!(served, output.path().join("b.png"));
        assert!(!temp.path().join("b_minify.png").exists());
    }

    #[tokio::test]
    async fn reports_missing_files_and_folders() {
        let output = tempfile::tempdir().expect("tempdir");
        let previews = ImagePreviews::new(Some(output.path().to_path_buf()), None);

        assert!(matches!(
            previews.preview("nope.png", "output").await,
            Err(PreviewError::NotFound(_))
        ));
        assert!(matches!(
            previews.preview("../escape.png", "output").await,
            Err(PreviewError::NotFound(_))
        ));
        assert!(matches!(
            previews.preview("x.png", "temp").await,
            Err(PreviewError::NotConfigured(_))
        ));
    }
}
