//! Syntactic validation of a processing request.
//!
//! Every rule runs independently and all failures are collected. Checks that
//! need decoded pixel data (crop containment) belong to the executor.

use image::ImageFormat;

use super::errors::{ErrorKind, FieldErrors};
use super::{BlurIntensity, CropRect, Operation, OperationRequest, RotationAngle, ScaleFactor};
use crate::upload::UploadedImage;

pub const IMAGE_FIELD: &str = "image";
pub const MISSING_IMAGE_MESSAGE: &str = "No image was uploaded.";

const ACCEPTED_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Form fields exactly as submitted. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOperationFields {
    pub operation: Option<String>,
    pub rotation_angle: Option<String>,
    pub blur_intensity: Option<String>,
    pub scale_factor: Option<String>,
    pub crop_top: Option<String>,
    pub crop_left: Option<String>,
    pub crop_width: Option<String>,
    pub crop_height: Option<String>,
}

impl RawOperationFields {
    /// Stores a named form value. Returns `false` for names the form does not
    /// know, which callers ignore.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "operation" => &mut self.operation,
            "rotation_angle" => &mut self.rotation_angle,
            "blur_intensity" => &mut self.blur_intensity,
            "scale_factor" => &mut self.scale_factor,
            "crop_top" => &mut self.crop_top,
            "crop_left" => &mut self.crop_left,
            "crop_width" => &mut self.crop_width,
            "crop_height" => &mut self.crop_height,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

enum IntegerInput {
    Absent,
    Invalid,
    Value(i64),
}

pub fn validate_operation_request(
    fields: &RawOperationFields,
    image: Option<&UploadedImage>,
) -> Result<OperationRequest, FieldErrors> {
    let mut errors = FieldErrors::default();
    validate_image(image, &mut errors);

    let operation = match present(fields.operation.as_deref()) {
        None => {
            errors.add_global(ErrorKind::Validation, "An operation must be selected.");
            None
        }
        Some(token) => {
            let parsed = Operation::parse(token);
            if parsed.is_none() {
                errors.add_global(
                    ErrorKind::Validation,
                    format!("Select a valid choice. {token} is not one of the available choices."),
                );
            }
            parsed
        }
    };

    let request = operation.and_then(|op| build_request(op, fields, &mut errors));
    match request {
        Some(request) if errors.is_empty() => Ok(request),
        _ => Err(errors),
    }
}

fn validate_image(image: Option<&UploadedImage>, errors: &mut FieldErrors) {
    let Some(image) = image else {
        errors.add_validation(IMAGE_FIELD, MISSING_IMAGE_MESSAGE);
        return;
    };
    if image.is_empty() {
        errors.add_validation(IMAGE_FIELD, "The submitted file is empty.");
        return;
    }
    let recognized = image::guess_format(image.bytes())
        .map(|format| ACCEPTED_FORMATS.contains(&format))
        .unwrap_or(false);
    if !recognized {
        errors.add_validation(
            IMAGE_FIELD,
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        );
    }
}

fn build_request(
    operation: Operation,
    fields: &RawOperationFields,
    errors: &mut FieldErrors,
) -> Option<OperationRequest> {
    match operation {
        Operation::Blur => blur_request(fields, errors),
        Operation::Rotate => rotate_request(fields, errors),
        Operation::Resize => resize_request(fields, errors),
        Operation::Crop => crop_request(fields, errors),
        Operation::Grayscale => Some(OperationRequest::Grayscale),
        Operation::ToPdf => Some(OperationRequest::ToPdf),
        Operation::SuperResolution => Some(OperationRequest::SuperResolution),
        Operation::Draw => Some(OperationRequest::Draw),
        Operation::ImageCaptioning => Some(OperationRequest::ImageCaptioning),
        Operation::BackgroundRemoval => Some(OperationRequest::BackgroundRemoval),
        Operation::ObjectDetection => Some(OperationRequest::ObjectDetection),
    }
}

fn blur_request(fields: &RawOperationFields, errors: &mut FieldErrors) -> Option<OperationRequest> {
    let field = "blur_intensity";
    let intensity = match parse_integer(field, fields.blur_intensity.as_deref(), errors) {
        IntegerInput::Absent => BlurIntensity::DEFAULT,
        IntegerInput::Invalid => return None,
        IntegerInput::Value(value) => {
            if value < BlurIntensity::MIN {
                errors.add_validation(field, greater_or_equal(BlurIntensity::MIN));
                return None;
            }
            let Some(intensity) = BlurIntensity::new(value) else {
                errors.add_validation(field, less_or_equal(BlurIntensity::MAX));
                return None;
            };
            intensity
        }
    };
    Some(OperationRequest::Blur { intensity })
}

fn rotate_request(
    fields: &RawOperationFields,
    errors: &mut FieldErrors,
) -> Option<OperationRequest> {
    let field = "rotation_angle";
    match parse_integer(field, fields.rotation_angle.as_deref(), errors) {
        IntegerInput::Absent => {
            errors.add_validation(field, "Rotation angle is required for rotation operation.");
            None
        }
        IntegerInput::Invalid => None,
        IntegerInput::Value(value) => {
            let angle = RotationAngle::new(value);
            if angle.is_none() {
                errors.add_validation(field, "Rotation angle must be between 0 and 360 degrees.");
            }
            angle.map(|angle| OperationRequest::Rotate { angle })
        }
    }
}

fn resize_request(
    fields: &RawOperationFields,
    errors: &mut FieldErrors,
) -> Option<OperationRequest> {
    let Some(raw) = present(fields.scale_factor.as_deref()) else {
        return Some(OperationRequest::Resize {
            scale: ScaleFactor::Original,
        });
    };
    let scale = raw.parse::<u32>().ok().and_then(ScaleFactor::from_percent);
    if scale.is_none() {
        errors.add_validation(
            "scale_factor",
            format!("Select a valid choice. {raw} is not one of the available choices."),
        );
    }
    scale.map(|scale| OperationRequest::Resize { scale })
}

fn crop_request(fields: &RawOperationFields, errors: &mut FieldErrors) -> Option<OperationRequest> {
    let top = crop_coordinate("crop_top", fields.crop_top.as_deref(), false, errors);
    let left = crop_coordinate("crop_left", fields.crop_left.as_deref(), false, errors);
    let width = crop_coordinate("crop_width", fields.crop_width.as_deref(), true, errors);
    let height = crop_coordinate("crop_height", fields.crop_height.as_deref(), true, errors);
    Some(OperationRequest::Crop(CropRect {
        top: top?,
        left: left?,
        width: width?,
        height: height?,
    }))
}

fn crop_coordinate(
    field: &str,
    raw: Option<&str>,
    is_extent: bool,
    errors: &mut FieldErrors,
) -> Option<u32> {
    let value = match parse_integer(field, raw, errors) {
        IntegerInput::Absent => {
            errors.add_validation(field, "This field is required for cropping.");
            return None;
        }
        IntegerInput::Invalid => return None,
        IntegerInput::Value(value) => value,
    };
    if value < 0 {
        errors.add_validation(field, greater_or_equal(0));
        return None;
    }
    if is_extent && value == 0 {
        let label = field.trim_start_matches("crop_");
        errors.add_validation(field, format!("Crop {label} must be greater than 0."));
        return None;
    }
    match u32::try_from(value) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add_validation(field, less_or_equal(i64::from(u32::MAX)));
            None
        }
    }
}

fn parse_integer(field: &str, raw: Option<&str>, errors: &mut FieldErrors) -> IntegerInput {
    let Some(raw) = present(raw) else {
        return IntegerInput::Absent;
    };
    match raw.parse::<i64>() {
        Ok(value) => IntegerInput::Value(value),
        Err(_) => {
            errors.add_validation(field, "Enter a whole number.");
            IntegerInput::Invalid
        }
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

fn greater_or_equal(limit: i64) -> String {
    format!("Ensure this value is greater than or equal to {limit}.")
}

fn less_or_equal(limit: i64) -> String {
    format!("Ensure this value is less than or equal to {limit}.")
}
