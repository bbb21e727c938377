use serde_json::Value;

use super::ProviderError;

pub const DEFAULT_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";
pub const API_KEY_HEADER: &str = "X-Api-Key";

const UNKNOWN_ERROR: &str = "Unknown error";

/// Interprets a 2xx remove.bg response. Image bodies are the result; anything
/// else is read as `{"errors": [{"title": ...}]}`.
pub fn interpret_removebg_response(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<Vec<u8>, ProviderError> {
    let is_image = content_type
        .map(|v| v.to_ascii_lowercase().contains("image"))
        .unwrap_or(false);
    if is_image {
        return Ok(body.to_vec());
    }
    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        ProviderError::MalformedResponse(format!("non-image body is not JSON: {e}"))
    })?;
    let title = payload
        .pointer("/errors/0/title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_ERROR);
    Err(ProviderError::Rejected(title.to_string()))
}
