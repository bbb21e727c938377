use std::fmt;

const FALLBACK_FILENAME: &str = "upload";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// An uploaded image, read once into memory and shared by reference across
/// validation, storage and the operation handlers.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl UploadedImage {
    /// Builds an upload from the raw multipart part.
    ///
    /// The filename is reduced to a safe single path component. A declared
    /// content type that is missing or not `image/*` is replaced by the type
    /// sniffed from the leading bytes.
    pub fn from_upload(
        filename: Option<&str>,
        declared_content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        let filename = sanitize_filename(filename.unwrap_or_default());
        let content_type = declared_content_type
            .map(str::trim)
            .filter(|v| v.to_ascii_lowercase().starts_with("image/"))
            .map(str::to_string)
            .or_else(|| sniffed_mime_type(bytes.as_slice()).map(str::to_string))
            .unwrap_or_else(|| String::from(FALLBACK_CONTENT_TYPE));
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    pub fn filename(&self) -> &str {
        self.filename.as_str()
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_str()
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Filename without its final extension.
    pub fn stem(&self) -> &str {
        split_extension(self.filename.as_str()).0
    }

    /// Final extension including the leading dot, or `""`.
    pub fn extension(&self) -> &str {
        split_extension(self.filename.as_str()).1
    }
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Splits `name` into `(stem, extension)` where the extension keeps its dot.
/// Leading dots belong to the stem, so `.env` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let Some(idx) = name.rfind('.') else {
        return (name, "");
    };
    if name[..idx].chars().all(|ch| ch == '.') {
        return (name, "");
    }
    name.split_at(idx)
}

/// Reduces `raw` to a single path component of word characters, `-`, `_` and
/// `.`. The extension is split off first, so a stem that cleans down to
/// nothing becomes `upload` and the extension survives.
pub fn sanitize_filename(raw: &str) -> String {
    let last_component = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let (raw_stem, raw_extension) = split_extension(last_component);
    let mut stem = clean_name_part(raw_stem);
    if stem.chars().all(|ch| ch == '.') {
        stem = String::from(FALLBACK_FILENAME);
    }
    let extension = clean_name_part(raw_extension);
    if extension.len() > 1 {
        stem.push_str(extension.as_str());
    }
    stem
}

fn clean_name_part(part: &str) -> String {
    part.chars()
        .filter_map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                Some(ch)
            } else if ch.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}

fn sniffed_mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}
