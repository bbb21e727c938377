use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::ProviderError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const API_KEY_HEADER: &str = "x-goog-api-key";

pub const CAPTION_PROMPT: &str = "Describe this image in detail.";
pub const OBJECT_DETECTION_PROMPT: &str = "List all distinct objects you can identify in this image, separated by commas. For example: 'tree, car, house, person'. If no objects are found, respond with 'No objects detected.'";

const CANDIDATE_TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

pub fn build_generate_content_payload<'a>(
    prompt: &'a str,
    mime_type: &'a str,
    image_bytes: &[u8],
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: [Content {
            role: "user",
            parts: [
                Part::Text { text: prompt },
                Part::Inline {
                    inline_data: InlineData {
                        mime_type,
                        data: BASE64_STANDARD.encode(image_bytes),
                    },
                },
            ],
        }],
    }
}

pub fn generate_content_url(api_base: &str, model: &str) -> Result<Url, url::ParseError> {
    Url::parse(
        format!(
            "{}/models/{}:generateContent",
            api_base.trim_end_matches('/'),
            model.trim()
        )
        .as_str(),
    )
}

/// Pulls `candidates[0].content.parts[0].text` out of a response body.
///
/// A missing or empty `candidates` list is [`ProviderError::EmptyResult`];
/// candidates without the expected nesting are malformed.
pub fn extract_candidate_text(payload: &Value) -> Result<String, ProviderError> {
    let has_candidates = payload
        .get("candidates")
        .and_then(Value::as_array)
        .is_some_and(|candidates| !candidates.is_empty());
    if !has_candidates {
        return Err(ProviderError::EmptyResult);
    }
    payload
        .pointer(CANDIDATE_TEXT_POINTER)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::MalformedResponse(String::from(
                "candidates[0].content.parts[0].text is missing",
            ))
        })
}
