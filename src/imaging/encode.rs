use std::borrow::Cow;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use super::ImagingError;
use crate::operations::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Gif,
}

impl OutputFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension
            .trim_start_matches('.')
            .to_ascii_lowercase()
            .as_str()
        {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
            Self::Gif => ".gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
        }
    }
}

/// Draw output is always PNG; everything else follows the upload's
/// extension, falling back to PNG.
pub fn select_output_format(operation: Operation, original_extension: &str) -> OutputFormat {
    if operation == Operation::Draw {
        return OutputFormat::Png;
    }
    OutputFormat::from_extension(original_extension).unwrap_or(OutputFormat::Png)
}

/// `processed_{operation}_{base}{ext}`. The original extension is kept when
/// it names the output format, otherwise the format's own extension is used.
pub fn processed_artifact_name(
    operation: Operation,
    original_stem: &str,
    original_extension: &str,
    format: OutputFormat,
) -> String {
    let extension = if OutputFormat::from_extension(original_extension) == Some(format) {
        original_extension
    } else {
        format.extension()
    };
    format!("processed_{}_{original_stem}{extension}", operation.as_str())
}

pub fn encode_image(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ImagingError> {
    let prepared: Cow<'_, DynamicImage> = match format {
        OutputFormat::Png => Cow::Borrowed(image),
        OutputFormat::Jpeg if image.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
        }
        OutputFormat::Jpeg => Cow::Borrowed(image),
        OutputFormat::Gif => match image {
            DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
            other => Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8())),
        },
    };
    let mut buffer = Cursor::new(Vec::new());
    prepared
        .write_to(&mut buffer, format.image_format())
        .map_err(ImagingError::Encode)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;

    fn translucent() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([200, 100, 50, 120])))
    }

    #[test]
    fn format_follows_extension_with_png_fallback() {
        let cases = [
            (Operation::Blur, ".png", OutputFormat::Png),
            (Operation::Blur, ".JPG", OutputFormat::Jpeg),
            (Operation::Crop, ".jpeg", OutputFormat::Jpeg),
            (Operation::Rotate, ".gif", OutputFormat::Gif),
            (Operation::Resize, ".webp", OutputFormat::Png),
            (Operation::Grayscale, "", OutputFormat::Png),
            (Operation::Draw, ".jpg", OutputFormat::Png),
            (Operation::Draw, ".gif", OutputFormat::Png),
        ];
        for (operation, extension, expected) in cases {
            assert_eq!(
                select_output_format(operation, extension),
                expected,
                "{operation} {extension}"
            );
        }
    }

    #[test]
    fn artifact_name_keeps_matching_extension() {
        assert_eq!(
            processed_artifact_name(Operation::Blur, "photo", ".JPG", OutputFormat::Jpeg),
            "processed_blur_photo.JPG"
        );
        assert_eq!(
            processed_artifact_name(Operation::Draw, "photo", ".jpg", OutputFormat::Png),
            "processed_draw_photo.png"
        );
        assert_eq!(
            processed_artifact_name(Operation::Resize, "scan", ".webp", OutputFormat::Png),
            "processed_resize_scan.png"
        );
    }

    #[test]
    fn every_format_encodes_images_with_alpha() {
        for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Gif] {
            let bytes = encode_image(&translucent(), format).expect("encode should succeed");
            let sniffed = image::guess_format(bytes.as_slice()).expect("output is an image");
            assert_eq!(sniffed, format.image_format());
            let decoded = image::load_from_memory(bytes.as_slice()).expect("round trip decode");
            assert_eq!(decoded.dimensions(), (6, 4));
        }
    }

    #[test]
    fn jpeg_output_drops_alpha() {
        let bytes = encode_image(&translucent(), OutputFormat::Jpeg).expect("jpeg encode");
        let decoded = image::load_from_memory(bytes.as_slice()).expect("decode");
        assert!(!decoded.color().has_alpha());
    }
}
