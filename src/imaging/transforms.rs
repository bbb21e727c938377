use image::imageops::FilterType;
use image::DynamicImage;

use super::ImagingError;
use crate::operations::{CropRect, ScaleFactor};

pub fn gaussian_blur(image: &DynamicImage, radius: u8) -> DynamicImage {
    image.blur(f32::from(radius))
}

/// Largest resize output, in pixels.
pub const MAX_RESIZE_PIXELS: u64 = 100_000_000;

/// Target dimensions for `scale`, truncating fractional pixels. `None` when
/// either side collapses to zero or the area exceeds [`MAX_RESIZE_PIXELS`].
pub fn scaled_dimensions(width: u32, height: u32, scale: ScaleFactor) -> Option<(u32, u32)> {
    let percent = u64::from(scale.percent());
    let w = u64::from(width) * percent / 100;
    let h = u64::from(height) * percent / 100;
    if w == 0 || h == 0 || w * h > MAX_RESIZE_PIXELS {
        return None;
    }
    Some((u32::try_from(w).ok()?, u32::try_from(h).ok()?))
}

pub fn resize_by_scale(image: DynamicImage, scale: ScaleFactor) -> Result<DynamicImage, ImagingError> {
    if scale == ScaleFactor::Original {
        return Ok(image);
    }
    let (width, height) = (image.width(), image.height());
    let (new_w, new_h) =
        scaled_dimensions(width, height, scale).ok_or(ImagingError::InvalidResize {
            width,
            height,
            percent: scale.percent(),
        })?;
    Ok(image.resize_exact(new_w, new_h, FilterType::Lanczos3))
}

/// Extracts `rect`, or `None` when the rectangle leaves the image.
pub fn crop_within_bounds(image: &DynamicImage, rect: CropRect) -> Option<DynamicImage> {
    if !rect.fits_within(image.width(), image.height()) {
        return None;
    }
    Some(image.crop_imm(rect.left, rect.top, rect.width, rect.height))
}

pub fn to_grayscale(image: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(image.to_luma8())
}
