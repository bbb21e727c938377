use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::executor::{ExecutionOutcome, OperationExecutor, TextKind};
use crate::operations::errors::{ErrorKind, FieldErrors};
use crate::operations::validation::{
    validate_operation_request, RawOperationFields, IMAGE_FIELD, MISSING_IMAGE_MESSAGE,
};
use crate::storage::{BlobStoreError, SharedBlobStore, StoredBlob};
use crate::upload::UploadedImage;

pub const SUCCESS_MESSAGE: &str = "Image processed successfully!";
pub const FAILURE_MESSAGE: &str = "Form validation failed or processing error occurred.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessImageResponse {
    pub success: bool,
    pub processed_image_url: Option<String>,
    pub image_original_url: Option<String>,
    pub image_caption: Option<String>,
    pub detected_objects: Option<String>,
    pub errors: FieldErrors,
    pub message: String,
}

impl ProcessImageResponse {
    pub fn rejected(errors: FieldErrors) -> Self {
        Self {
            success: false,
            processed_image_url: None,
            image_original_url: None,
            image_caption: None,
            detected_objects: None,
            errors,
            message: String::from(FAILURE_MESSAGE),
        }
    }

    fn missing_image() -> Self {
        let mut errors = FieldErrors::default();
        errors.add_validation(IMAGE_FIELD, MISSING_IMAGE_MESSAGE);
        Self::rejected(errors)
    }

    fn finish(mut self) -> Self {
        self.success = self.errors.is_empty();
        self.message = String::from(if self.success {
            SUCCESS_MESSAGE
        } else {
            FAILURE_MESSAGE
        });
        self
    }
}

/// Validate, store the original, execute, store the artifact.
#[derive(Clone)]
pub struct ImageProcessingService {
    store: SharedBlobStore,
    executor: OperationExecutor,
}

impl ImageProcessingService {
    pub fn new(store: SharedBlobStore, executor: OperationExecutor) -> Self {
        Self { store, executor }
    }

    pub fn process(
        &self,
        upload: Option<UploadedImage>,
        fields: &RawOperationFields,
    ) -> ProcessImageResponse {
        let request = match validate_operation_request(fields, upload.as_ref()) {
            Ok(request) => request,
            Err(errors) => {
                info!(errors = errors.entry_count(), "request failed validation");
                return ProcessImageResponse::rejected(errors);
            }
        };
        let Some(image) = upload else {
            return ProcessImageResponse::missing_image();
        };

        let mut response = ProcessImageResponse::rejected(FieldErrors::default());
        let original_name = original_upload_name(&image, |name| {
            self.store.exists(name).unwrap_or(true)
        });
        let original = match self.store.save(original_name.as_str(), image.bytes()) {
            Ok(blob) => blob,
            Err(e) => {
                record_storage_error(&mut response.errors, &e);
                return response.finish();
            }
        };
        response.image_original_url = Some(original.url.clone());

        match self.executor.execute(&request, &image) {
            ExecutionOutcome::ArtifactProduced(artifact) => {
                match self.store.save(artifact.suggested_name.as_str(), artifact.bytes.as_slice()) {
                    Ok(StoredBlob { url, .. }) => response.processed_image_url = Some(url),
                    Err(e) => record_storage_error(&mut response.errors, &e),
                }
            }
            ExecutionOutcome::TextProduced(result) => {
                response.processed_image_url = Some(original.url);
                match result.kind {
                    TextKind::Caption => response.image_caption = Some(result.text),
                    TextKind::Objects => response.detected_objects = Some(result.text),
                }
            }
            ExecutionOutcome::Failed(failures) => {
                for failure in failures {
                    response
                        .errors
                        .add_global(failure.kind(), failure.to_string());
                }
            }
        }
        response.finish()
    }
}

/// The sanitized upload name, unless it contains `blob` or is already taken,
/// in which case `original_upload_{stem}_{16 hex}{ext}`.
pub fn original_upload_name<F>(image: &UploadedImage, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let stem = image.stem();
    if !stem.to_ascii_lowercase().contains("blob") && !exists(image.filename()) {
        return image.filename().to_string();
    }
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "original_upload_{stem}_{}{}",
        &token[..16],
        image.extension()
    )
}

fn record_storage_error(errors: &mut FieldErrors, e: &BlobStoreError) {
    error!(error = %e, "blob store write failed");
    errors.add_global(ErrorKind::Storage, format!("Could not store image: {e}."));
}
