use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::gemini::{build_generate_content_payload, extract_candidate_text, generate_content_url};
use super::removebg::interpret_removebg_response;
use super::{gemini, removebg, ProviderError, ProviderOps};
use crate::upload::UploadedImage;

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub gemini_generate_content: Url,
    pub remove_bg: Url,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            gemini_generate_content: generate_content_url(
                gemini::DEFAULT_API_BASE,
                gemini::DEFAULT_MODEL,
            )
            .expect("default gemini endpoint is a valid url"),
            remove_bg: Url::parse(removebg::DEFAULT_ENDPOINT)
                .expect("default remove.bg endpoint is a valid url"),
        }
    }
}

/// Blocking reqwest implementation. A fresh client is built per call, so no
/// connection state outlives a request.
#[derive(Debug, Clone)]
pub struct HttpProviderOps {
    endpoints: ProviderEndpoints,
    timeout: Duration,
}

impl HttpProviderOps {
    pub fn new(endpoints: ProviderEndpoints, timeout: Duration) -> Self {
        Self { endpoints, timeout }
    }

    fn client(&self) -> Result<Client, ProviderError> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("http client init failed: {e}")))
    }
}

impl ProviderOps for HttpProviderOps {
    fn generate_content_text(
        &self,
        api_key: &str,
        prompt: &str,
        image: &UploadedImage,
    ) -> Result<String, ProviderError> {
        let payload = build_generate_content_payload(prompt, image.content_type(), image.bytes());
        debug!(
            endpoint = %self.endpoints.gemini_generate_content,
            bytes = image.bytes().len(),
            "calling generate-content api"
        );
        let resp = self
            .client()?
            .post(self.endpoints.gemini_generate_content.clone())
            .header(gemini::API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .map_err(transport_error)?;
        let resp = ensure_success(resp)?;
        let body: Value = resp.json().map_err(|e| {
            ProviderError::MalformedResponse(format!("JSON decode failed: {}", e.without_url()))
        })?;
        extract_candidate_text(&body)
    }

    fn remove_background(
        &self,
        api_key: &str,
        image: &UploadedImage,
    ) -> Result<Vec<u8>, ProviderError> {
        let part = multipart::Part::bytes(image.bytes().to_vec())
            .file_name(image.filename().to_string())
            .mime_str(image.content_type())
            .map_err(|e| {
                ProviderError::InvalidRequest(format!(
                    "invalid mime '{}': {}",
                    image.content_type(),
                    e.without_url()
                ))
            })?;
        let form = multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto");
        debug!(
            endpoint = %self.endpoints.remove_bg,
            bytes = image.bytes().len(),
            "calling background removal api"
        );
        let resp = self
            .client()?
            .post(self.endpoints.remove_bg.clone())
            .header(removebg::API_KEY_HEADER, api_key)
            .multipart(form)
            .send()
            .map_err(transport_error)?;
        let resp = ensure_success(resp)?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().map_err(transport_error)?;
        interpret_removebg_response(content_type.as_deref(), body.as_ref())
    }
}

fn ensure_success(resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let mut body = resp.text().unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ProviderError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

fn transport_error(error: reqwest::Error) -> ProviderError {
    ProviderError::Transport(error.without_url().to_string())
}
