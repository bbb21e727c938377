use std::collections::BTreeMap;

use serde::Serialize;

/// Pseudo-field holding errors that are not tied to one input field.
pub const GLOBAL_FIELD: &str = "__all__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    GeometricConstraint,
    Configuration,
    Transport,
    UpstreamContract,
    Processing,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorEntry {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Accumulated errors keyed by field name, serialized as
/// `{"field": [{"kind": ..., "message": ...}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<ErrorEntry>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, kind: ErrorKind, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(ErrorEntry::new(kind, message));
    }

    pub fn add_validation(&mut self, field: &str, message: impl Into<String>) {
        self.add(field, ErrorKind::Validation, message);
    }

    pub fn add_global(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.add(GLOBAL_FIELD, kind, message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> &[ErrorEntry] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn global(&self) -> &[ErrorEntry] {
        self.field(GLOBAL_FIELD)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn entry_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}
