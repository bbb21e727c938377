pub mod encode;
pub mod rotation;
pub mod transforms;

use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("image decode failed: {0}")]
    Decode(#[source] image::ImageError),
    #[error("image encode failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error("cannot resize {width}x{height} image to {percent}%")]
    InvalidResize {
        width: u32,
        height: u32,
        percent: u32,
    },
}

/// Decodes an upload and converts any color mode other than 8-bit RGB/RGBA
/// to 8-bit RGB.
pub fn decode_normalized(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    let decoded = image::load_from_memory(bytes).map_err(ImagingError::Decode)?;
    Ok(normalize_color_mode(decoded))
}

pub fn normalize_color_mode(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}
