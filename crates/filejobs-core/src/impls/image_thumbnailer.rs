use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::JobError;
use crate::ports::ThumbnailGenerator;

/// Resizes with the `image` crate.
///
/// The output keeps the source aspect ratio and is encoded in the source
/// format (PNG when the format cannot be guessed). Decoding and encoding are
/// CPU-bound and run on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailer {
    filter: FilterType,
}

impl ImageThumbnailer {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThumbnailGenerator for ImageThumbnailer {
    async fn generate(&self, path: &Path, width: u32) -> Result<Vec<u8>, JobError> {
        if width == 0 {
            return Err(JobError::Generation("width must be positive".to_string()));
        }
        let path = path.to_path_buf();
        let filter = self.filter;

        tokio::task::spawn_blocking(move || render(&path, width, filter))
            .await
            .map_err(|e| JobError::Generation(format!("render task: {e}")))?
    }
}

fn render(path: &Path, width: u32, filter: FilterType) -> Result<Vec<u8>, JobError> {
    let generation = |e: image::ImageError| JobError::Generation(e.to_string());

    let reader = ImageReader::open(path)
        .map_err(|e| JobError::Generation(format!("open {}: {e}", path.display())))?
        .with_guessed_format()
        .map_err(|e| JobError::Generation(format!("read {}: {e}", path.display())))?;
    let format = reader.format().unwrap_or(ImageFormat::Png);
    let source = reader.decode().map_err(generation)?;

    let height = scaled_height(source.width(), source.height(), width);
    let mut resized = source.resize_exact(width, height, filter);
    if format == ImageFormat::Jpeg {
        // JPEG has no alpha channel
        resized = DynamicImage::ImageRgb8(resized.to_rgb8());
    }

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format).map_err(generation)?;
    Ok(out.into_inner())
}

fn scaled_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    let scaled = u64::from(src_height) * u64::from(width) / u64::from(src_width.max(1));
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}
