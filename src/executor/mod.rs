use image::DynamicImage;
use thiserror::Error;
use tracing::{info, warn};

use crate::imaging::encode::{
    encode_image, processed_artifact_name, select_output_format, OutputFormat,
};
use crate::imaging::rotation::rotate_expanded;
use crate::imaging::transforms::{crop_within_bounds, gaussian_blur, resize_by_scale, to_grayscale};
use crate::imaging::{decode_normalized, ImagingError};
use crate::operations::errors::ErrorKind;
use crate::operations::{Operation, OperationRequest};
use crate::providers::gemini::{CAPTION_PROMPT, OBJECT_DETECTION_PROMPT};
use crate::providers::{ProviderCredentials, ProviderError, SharedProviderOps};
use crate::upload::UploadedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteService {
    Gemini,
    RemoveBg,
}

impl RemoteService {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::RemoveBg => "remove.bg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Caption,
    Objects,
}

impl TextKind {
    fn prompt(self) -> &'static str {
        match self {
            Self::Caption => CAPTION_PROMPT,
            Self::Objects => OBJECT_DETECTION_PROMPT,
        }
    }

    fn empty_message(self) -> &'static str {
        match self {
            Self::Caption => "AI captioning failed: No description generated.",
            Self::Objects => "AI object detection failed: No objects identified.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub suggested_name: String,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResult {
    pub kind: TextKind,
    pub text: String,
}

#[derive(Debug)]
pub enum ExecutionOutcome {
    ArtifactProduced(Artifact),
    TextProduced(TextResult),
    Failed(Vec<OperationError>),
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Crop coordinates are out of image bounds.")]
    CropOutOfBounds,
    #[error("{} API key is not configured.", .0.display_name())]
    MissingCredential(RemoteService),
    #[error("{}", transport_message(.service, .detail))]
    Transport {
        service: RemoteService,
        detail: String,
    },
    #[error("{} Gemini API response might be empty or malformed.", .0.empty_message())]
    NothingUsable(TextKind),
    #[error("{}", upstream_message(.service, .detail))]
    UpstreamContract {
        service: RemoteService,
        detail: String,
    },
    #[error("Background removal failed: {0}.")]
    BackgroundRemovalRejected(String),
    #[error("General image processing failed: {0}.")]
    Processing(String),
}

impl OperationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CropOutOfBounds => ErrorKind::GeometricConstraint,
            Self::MissingCredential(_) => ErrorKind::Configuration,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::NothingUsable(_)
            | Self::UpstreamContract { .. }
            | Self::BackgroundRemovalRejected(_) => ErrorKind::UpstreamContract,
            Self::Processing(_) => ErrorKind::Processing,
        }
    }

    fn from_provider(service: RemoteService, text_kind: Option<TextKind>, error: ProviderError) -> Self {
        match error {
            ProviderError::Transport(detail) | ProviderError::InvalidRequest(detail) => {
                Self::Transport { service, detail }
            }
            status @ ProviderError::HttpStatus { .. } => Self::Transport {
                service,
                detail: status.to_string(),
            },
            ProviderError::EmptyResult => match text_kind {
                Some(kind) => Self::NothingUsable(kind),
                None => Self::UpstreamContract {
                    service,
                    detail: ProviderError::EmptyResult.to_string(),
                },
            },
            ProviderError::MalformedResponse(detail) => Self::UpstreamContract { service, detail },
            ProviderError::Rejected(title) => match service {
                RemoteService::RemoveBg => Self::BackgroundRemovalRejected(title),
                RemoteService::Gemini => Self::UpstreamContract {
                    service,
                    detail: title,
                },
            },
        }
    }
}

impl From<ImagingError> for OperationError {
    fn from(error: ImagingError) -> Self {
        Self::Processing(error.to_string())
    }
}

fn transport_message(service: &RemoteService, detail: &str) -> String {
    match service {
        RemoteService::Gemini => {
            format!("AI API request failed: {detail}. Check network or API key.")
        }
        RemoteService::RemoveBg => {
            format!("Background removal API request failed: {detail}. Check network or API key.")
        }
    }
}

fn upstream_message(service: &RemoteService, detail: &str) -> String {
    let source = match service {
        RemoteService::Gemini => "AI",
        RemoteService::RemoveBg => "remove.bg",
    };
    format!("Error processing {source} response: {detail}. Check API response structure.")
}

/// Runs one validated operation. Credentials and the provider implementation
/// are constructor state.
#[derive(Clone)]
pub struct OperationExecutor {
    providers: SharedProviderOps,
    credentials: ProviderCredentials,
}

impl OperationExecutor {
    pub fn new(providers: SharedProviderOps, credentials: ProviderCredentials) -> Self {
        Self {
            providers,
            credentials,
        }
    }

    pub fn execute(&self, request: &OperationRequest, image: &UploadedImage) -> ExecutionOutcome {
        let operation = request.operation();
        let result = match *request {
            OperationRequest::Blur { intensity } => transform_locally(image, operation, |decoded| {
                Ok(gaussian_blur(&decoded, intensity.kernel_radius()))
            }),
            OperationRequest::Rotate { angle } => transform_locally(image, operation, |decoded| {
                Ok(rotate_expanded(decoded, angle.degrees()))
            }),
            OperationRequest::Resize { scale } => transform_locally(image, operation, |decoded| {
                Ok(resize_by_scale(decoded, scale)?)
            }),
            OperationRequest::Crop(rect) => transform_locally(image, operation, |decoded| {
                crop_within_bounds(&decoded, rect).ok_or(OperationError::CropOutOfBounds)
            }),
            OperationRequest::Grayscale => {
                transform_locally(image, operation, |decoded| Ok(to_grayscale(&decoded)))
            }
            OperationRequest::Draw | OperationRequest::ToPdf | OperationRequest::SuperResolution => {
                transform_locally(image, operation, Ok)
            }
            OperationRequest::ImageCaptioning => self
                .describe(image, TextKind::Caption)
                .map(ExecutionOutcome::TextProduced),
            OperationRequest::ObjectDetection => self
                .describe(image, TextKind::Objects)
                .map(ExecutionOutcome::TextProduced),
            OperationRequest::BackgroundRemoval => self
                .remove_background(image)
                .map(ExecutionOutcome::ArtifactProduced),
        };

        match result {
            Ok(outcome) => {
                info!(operation = %operation, "operation completed");
                outcome
            }
            Err(error) => {
                warn!(operation = %operation, kind = ?error.kind(), error = %error, "operation failed");
                ExecutionOutcome::Failed(vec![error])
            }
        }
    }

    fn describe(&self, image: &UploadedImage, kind: TextKind) -> Result<TextResult, OperationError> {
        let api_key = self
            .credentials
            .gemini()
            .ok_or(OperationError::MissingCredential(RemoteService::Gemini))?;
        let text = self
            .providers
            .generate_content_text(api_key, kind.prompt(), image)
            .map_err(|e| OperationError::from_provider(RemoteService::Gemini, Some(kind), e))?;
        Ok(TextResult { kind, text })
    }

    fn remove_background(&self, image: &UploadedImage) -> Result<Artifact, OperationError> {
        let api_key = self
            .credentials
            .remove_bg()
            .ok_or(OperationError::MissingCredential(RemoteService::RemoveBg))?;
        let bytes = self
            .providers
            .remove_background(api_key, image)
            .map_err(|e| OperationError::from_provider(RemoteService::RemoveBg, None, e))?;
        Ok(Artifact {
            bytes,
            suggested_name: format!("processed_bg_removed_{}.png", image.stem()),
            content_type: OutputFormat::Png.mime_type(),
        })
    }
}

fn transform_locally<F>(
    image: &UploadedImage,
    operation: Operation,
    transform: F,
) -> Result<ExecutionOutcome, OperationError>
where
    F: FnOnce(DynamicImage) -> Result<DynamicImage, OperationError>,
{
    let decoded = decode_normalized(image.bytes())?;
    let transformed = transform(decoded)?;
    let format = select_output_format(operation, image.extension());
    let bytes = encode_image(&transformed, format)?;
    Ok(ExecutionOutcome::ArtifactProduced(Artifact {
        bytes,
        suggested_name: processed_artifact_name(operation, image.stem(), image.extension(), format),
        content_type: format.mime_type(),
    }))
}
