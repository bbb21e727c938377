pub mod gemini;
pub mod http;
pub mod removebg;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::upload::UploadedImage;

pub const GEMINI_PLACEHOLDER_KEY: &str = "YOUR_GEMINI_API_KEY_HERE";
pub const REMOVE_BG_PLACEHOLDER_KEY: &str = "YOUR_REMOVE_BG_API_KEY_HERE";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("response contained no candidates")]
    EmptyResult,
    #[error("{0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Rejected(String),
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),
}

/// Remote calls made on behalf of the AI operations. Each method issues at
/// most one HTTP request and never retries.
pub trait ProviderOps: Send + Sync + 'static {
    /// Sends `prompt` plus the inlined image to the generative-content API
    /// and returns the first candidate's text.
    fn generate_content_text(
        &self,
        api_key: &str,
        prompt: &str,
        image: &UploadedImage,
    ) -> Result<String, ProviderError>;

    /// Returns the background-stripped image bytes.
    fn remove_background(
        &self,
        api_key: &str,
        image: &UploadedImage,
    ) -> Result<Vec<u8>, ProviderError>;
}

pub type SharedProviderOps = Arc<dyn ProviderOps>;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub gemini_api_key: String,
    pub remove_bg_api_key: String,
}

impl ProviderCredentials {
    pub fn gemini(&self) -> Option<&str> {
        usable_credential(self.gemini_api_key.as_str(), GEMINI_PLACEHOLDER_KEY)
    }

    pub fn remove_bg(&self) -> Option<&str> {
        usable_credential(self.remove_bg_api_key.as_str(), REMOVE_BG_PLACEHOLDER_KEY)
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("gemini_api_key", &CredentialStatus::of(self.gemini()))
            .field("remove_bg_api_key", &CredentialStatus::of(self.remove_bg()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Configured,
    Missing,
}

impl CredentialStatus {
    pub fn of(credential: Option<&str>) -> Self {
        if credential.is_some() {
            Self::Configured
        } else {
            Self::Missing
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Missing => "missing",
        }
    }
}

/// The trimmed credential, unless it is empty or the placeholder.
pub fn usable_credential<'a>(raw: &'a str, placeholder: &str) -> Option<&'a str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty() && trimmed != placeholder).then_some(trimmed)
}
