use crate::database::Episode;
use thiserror::Error;

/// Typed error hierarchy for every core operation.
///
/// Variants mirror what a caller needs to decide: `Duplicate` is an
/// idempotency signal carrying the row that already exists, `MetadataFetch`
/// distinguishes transient provider trouble from permanent failures, and
/// ownership mismatches surface as `NotFound` so foreign rows never leak
/// their existence.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unrecognized source url: {0}")]
    UnrecognizedSource(String),

    #[error("episode already exists: {}", .0.url)]
    Duplicate(Box<Episode>),

    #[error("metadata fetch failed: {reason}")]
    MetadataFetch { reason: String, transient: bool },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Json(String),
}

impl AppError {
    pub fn metadata(reason: impl Into<String>, transient: bool) -> Self {
        AppError::MetadataFetch {
            reason: reason.into(),
            transient,
        }
    }

    /// True when a retry by the caller could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::MetadataFetch { transient: true, .. })
    }
}

/// Serialize as a plain string so API layers can pass the message through
/// unchanged.
impl serde::Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

// ── From impls ─────────────────────────────────────────────────────────────

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e.to_string())
    }
}
