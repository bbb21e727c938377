use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use serde_json::Value;
use tracing::debug;

use crate::api::handler_utils::{malformed_request, process_image_reply, task_failure, ApiObject};
use crate::api::server::AppState;
use crate::operations::validation::{RawOperationFields, IMAGE_FIELD};
use crate::upload::UploadedImage;

pub async fn process_image_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiObject<Value> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return malformed_request(format!("Malformed multipart request: {rejection}"))
        }
    };

    let mut fields = RawOperationFields::default();
    let mut upload = None::<UploadedImage>;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return malformed_request(format!("Malformed multipart request: {e}")),
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = match field.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return malformed_request(format!("Malformed multipart request: {e}")),
            };
            let no_file_chosen = bytes.is_empty() && file_name.as_deref().unwrap_or("").is_empty();
            if upload.is_none() && !no_file_chosen {
                upload = Some(UploadedImage::from_upload(
                    file_name.as_deref(),
                    content_type.as_deref(),
                    bytes.to_vec(),
                ));
            }
            continue;
        }

        let value = match field.text().await {
            Ok(value) => value,
            Err(e) => return malformed_request(format!("Malformed multipart request: {e}")),
        };
        if !fields.set(name.as_str(), value) {
            debug!(field = %name, "ignoring unknown form field");
        }
    }

    let service = state.processing.clone();
    let result = tokio::task::spawn_blocking(move || service.process(upload, &fields)).await;
    match result {
        Ok(response) => process_image_reply(response),
        Err(join_error) => task_failure(join_error.to_string()),
    }
}
