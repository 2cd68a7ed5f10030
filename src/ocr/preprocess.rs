use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::ocr::error::OcrError;

/// Refuse to decode anything above this many pixels (decompression bombs)
pub const MAX_PIXELS: u64 = 50_000_000;

/// 16-bit RGBA, the widest pixel the enabled decoders produce
const MAX_BYTES_PER_PIXEL: u64 = 8;

/// Images narrower than this are upscaled before recognition
const MIN_OCR_WIDTH: u32 = 1000;
/// Upscaling never pushes either side past this
const MAX_UPSCALED_SIDE: u32 = 4000;

/// A preprocessed image written to the temp directory.
///
/// The file is removed when the value is dropped.
#[derive(Debug)]
pub struct PreparedImage {
    path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PreparedImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove temporary OCR image {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Decode, convert to grayscale, upscale small images and write a PNG into
/// `temp_dir`. Blocking; run it on the blocking pool.
pub fn prepare_image(data: &[u8], temp_dir: &Path) -> Result<PreparedImage, OcrError> {
    // Only the header is read here; nothing is allocated for pixels yet
    let (width, height) = reader_for(data)?
        .into_dimensions()
        .map_err(|e| OcrError::InvalidImageFormat {
            details: format!("could not read image header: {}", e),
        })?;
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidImageFormat {
            details: "image has no pixels".to_string(),
        });
    }
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(OcrError::ImageTooLarge {
            width,
            height,
            max_pixels: MAX_PIXELS,
        });
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(width);
    limits.max_image_height = Some(height);
    limits.max_alloc = Some(MAX_PIXELS * MAX_BYTES_PER_PIXEL);

    let mut reader = reader_for(data)?;
    reader.limits(limits);
    let decoded = reader.decode().map_err(|e| OcrError::InvalidImageFormat {
        details: format!("could not decode image: {}", e),
    })?;
    let (width, height) = decoded.dimensions();

    let mut gray = decoded.to_luma8();
    let scale = upscale_factor(width, height);
    if scale > 1 {
        gray = image::imageops::resize(&gray, width * scale, height * scale, FilterType::Lanczos3);
    }

    let path = temp_dir.join(format!("studymate_ocr_{}.png", Uuid::new_v4()));
    let prepared = PreparedImage {
        path,
        width: gray.width(),
        height: gray.height(),
    };

    gray.save_with_format(prepared.path(), ImageFormat::Png)
        .map_err(|e| OcrError::RecognitionFailed {
            details: format!("failed to write preprocessed image: {}", e),
        })?;

    Ok(prepared)
}

fn reader_for(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, OcrError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| OcrError::InvalidImageFormat {
            details: format!("could not read image: {}", e),
        })
}

fn upscale_factor(width: u32, height: u32) -> u32 {
    if width >= MIN_OCR_WIDTH {
        return 1;
    }
    let largest = width.max(height);
    if largest * 2 <= MAX_UPSCALED_SIDE {
        2
    } else {
        1
    }
}
