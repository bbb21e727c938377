use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::providers::gemini::{self, generate_content_url};
use crate::providers::http::ProviderEndpoints;
use crate::providers::{removebg, CredentialStatus, ProviderCredentials};

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_MEDIA_ROOT: &str = "var/media";
pub const DEFAULT_MEDIA_URL: &str = "/media/";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Dotenv {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is malformed: {source}")]
    DotenvSyntax {
        path: String,
        #[source]
        source: DotenvLineError,
    },
    #[error("{key} is not a valid socket address: {value}")]
    InvalidBind { key: &'static str, value: String },
    #[error("{key} must be a positive integer: {value}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} is not a valid url: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// A `.env` line that could not be read. Values never appear in the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DotenvLineError {
    #[error("line {line}: expected KEY=VALUE")]
    MissingSeparator { line: usize },
    #[error("line {line}: invalid key {key:?}")]
    InvalidKey { line: usize, key: String },
    #[error("line {line}: unterminated quote in the value of {key}")]
    UnterminatedQuote { line: usize, key: String },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    pub media_root: PathBuf,
    /// Public prefix for stored blobs; always ends with `/`.
    pub media_url: String,
    pub max_upload_bytes: usize,
    pub credentials: ProviderCredentials,
    pub endpoints: ProviderEndpoints,
    pub provider_timeout: Duration,
}

impl ServiceConfig {
    pub fn for_media_root(media_root: impl Into<PathBuf>) -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            media_root: media_root.into(),
            media_url: String::from(DEFAULT_MEDIA_URL),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            credentials: ProviderCredentials::default(),
            endpoints: ProviderEndpoints::default(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }

    /// JSON view for operators. Credentials appear only as configured/missing.
    pub fn redacted_summary(&self) -> Value {
        json!({
            "bind": self.bind.to_string(),
            "media_root": self.media_root.display().to_string(),
            "media_url": self.media_url,
            "max_upload_bytes": self.max_upload_bytes,
            "provider_timeout_secs": self.provider_timeout.as_secs(),
            "gemini_generate_content": self.endpoints.gemini_generate_content.as_str(),
            "remove_bg_endpoint": self.endpoints.remove_bg.as_str(),
            "gemini_api_key": CredentialStatus::of(self.credentials.gemini()).as_str(),
            "remove_bg_api_key": CredentialStatus::of(self.credentials.remove_bg()).as_str(),
        })
    }
}

/// Reads the process environment, falling back to `{app_root}/.env`.
pub fn resolve_service_config(app_root: &Path) -> Result<ServiceConfig, ConfigError> {
    let dotenv = load_dotenv_map(app_root)?;
    select_service_config(
        |key| {
            std::env::var(key)
                .ok()
                .or_else(|| dotenv.get(key).cloned())
        },
        app_root,
    )
}

pub fn select_service_config<F>(lookup: F, app_root: &Path) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let bind_raw = value("IMAGING_BIND").unwrap_or_else(|| String::from(DEFAULT_BIND));
    let bind = bind_raw
        .parse::<SocketAddr>()
        .map_err(|_| ConfigError::InvalidBind {
            key: "IMAGING_BIND",
            value: bind_raw.clone(),
        })?;

    let media_root = value("IMAGING_MEDIA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT));
    let media_root = if media_root.is_absolute() {
        media_root
    } else {
        app_root.join(media_root)
    };

    let media_url = normalize_media_url(
        value("IMAGING_MEDIA_URL")
            .unwrap_or_else(|| String::from(DEFAULT_MEDIA_URL))
            .as_str(),
    );

    let max_upload_bytes = parse_positive(
        "IMAGING_MAX_UPLOAD_BYTES",
        value("IMAGING_MAX_UPLOAD_BYTES"),
        DEFAULT_MAX_UPLOAD_BYTES as u64,
    )?;
    let max_upload_bytes =
        usize::try_from(max_upload_bytes).map_err(|_| ConfigError::InvalidNumber {
            key: "IMAGING_MAX_UPLOAD_BYTES",
            value: max_upload_bytes.to_string(),
        })?;
    let timeout_secs = parse_positive(
        "IMAGING_PROVIDER_TIMEOUT_SECS",
        value("IMAGING_PROVIDER_TIMEOUT_SECS"),
        DEFAULT_PROVIDER_TIMEOUT_SECS,
    )?;

    let gemini_base =
        value("GEMINI_API_BASE").unwrap_or_else(|| String::from(gemini::DEFAULT_API_BASE));
    let gemini_model =
        value("GEMINI_MODEL").unwrap_or_else(|| String::from(gemini::DEFAULT_MODEL));
    let gemini_generate_content = generate_content_url(gemini_base.as_str(), gemini_model.as_str())
        .map_err(|source| ConfigError::InvalidUrl {
            key: "GEMINI_API_BASE",
            source,
        })?;
    let remove_bg_raw =
        value("REMOVE_BG_ENDPOINT").unwrap_or_else(|| String::from(removebg::DEFAULT_ENDPOINT));
    let remove_bg = Url::parse(remove_bg_raw.as_str()).map_err(|source| ConfigError::InvalidUrl {
        key: "REMOVE_BG_ENDPOINT",
        source,
    })?;

    Ok(ServiceConfig {
        bind,
        media_root,
        media_url,
        max_upload_bytes,
        credentials: ProviderCredentials {
            gemini_api_key: value("GEMINI_API_KEY").unwrap_or_default(),
            remove_bg_api_key: value("REMOVE_BG_API_KEY").unwrap_or_default(),
        },
        endpoints: ProviderEndpoints {
            gemini_generate_content,
            remove_bg,
        },
        provider_timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_positive(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

fn normalize_media_url(raw: &str) -> String {
    let mut out = raw.trim().to_string();
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}

fn load_dotenv_map(app_root: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let path = app_root.join(".env");
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let raw = fs::read_to_string(path.as_path()).map_err(|source| ConfigError::Dotenv {
        path: path.display().to_string(),
        source,
    })?;
    parse_dotenv_content(raw.as_str()).map_err(|source| ConfigError::DotenvSyntax {
        path: path.display().to_string(),
        source,
    })
}

/// Parses `KEY=VALUE` lines. Blank lines, `#` comments and a leading
/// `export ` are skipped. Any other line must be a valid assignment.
pub fn parse_dotenv_content(raw: &str) -> Result<HashMap<String, String>, DotenvLineError> {
    let mut out = HashMap::new();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        let entry = entry
            .strip_prefix("export ")
            .map(str::trim_start)
            .unwrap_or(entry);
        let (key, value) = entry
            .split_once('=')
            .ok_or(DotenvLineError::MissingSeparator { line: line_no })?;
        let key = key.trim();
        if !is_env_key(key) {
            return Err(DotenvLineError::InvalidKey {
                line: line_no,
                key: key.to_string(),
            });
        }
        let value = dotenv_value(value.trim()).ok_or_else(|| DotenvLineError::UnterminatedQuote {
            line: line_no,
            key: key.to_string(),
        })?;
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

fn is_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Quoted values keep everything up to the matching quote. Unquoted values
/// drop a trailing ` #` comment. `None` when a quote is never closed.
fn dotenv_value(raw: &str) -> Option<String> {
    if let Some(quote) = raw.chars().next().filter(|ch| matches!(ch, '"' | '\'')) {
        let body = &raw[1..];
        let end = body.find(quote)?;
        return Some(body[..end].to_string());
    }
    let value = raw.split_once(" #").map_or(raw, |(before, _)| before);
    Some(value.trim_end().to_string())
}
