use std::fmt;
use thiserror::Error;

use crate::redaction::redact_secrets_in_text;

/// Maximum number of characters of a failing response body kept for diagnosis
pub const MAX_ERROR_BODY_CHARS: usize = 2000;

/// Core error type shared by every linkflow crate
#[derive(Debug, Error)]
pub enum LinkflowError {
    /// A remote call returned a non-success status or never completed
    #[error(transparent)]
    Transport(#[from] TransportFailure),

    /// The signed-upload response could not be mapped onto an upload target
    #[error(transparent)]
    SchemaResolution(#[from] SchemaResolutionFailure),

    /// The multipart upload form could not be assembled
    #[error("upload form error: {0}")]
    UploadForm(String),

    /// A response was received but lacks a field the pipeline depends on
    #[error("step [{step}] returned an unusable response: {reason}")]
    InvalidResponse { step: String, reason: String },

    /// A step was scheduled before the context field it consumes was produced
    #[error("step [{step}] requires '{field}' which no earlier step produced")]
    MissingInput { step: String, field: String },

    /// A set-once workflow field was written twice
    #[error("workflow field '{field}' is already set and cannot be overwritten")]
    ContextConflict { field: String },

    /// Invalid configuration or run parameters
    #[error("configuration error: {0}")]
    Config(String),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkflowError {
    pub fn invalid_response(step: &str, reason: impl Into<String>) -> Self {
        LinkflowError::InvalidResponse {
            step: step.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LinkflowError::Transport(_))
    }

    pub fn is_schema_resolution(&self) -> bool {
        matches!(self, LinkflowError::SchemaResolution(_))
    }

    /// HTTP status of a transport failure, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            LinkflowError::Transport(failure) => failure.status,
            _ => None,
        }
    }
}

/// Diagnostic record of a failed remote call
#[derive(Debug, Clone, Error)]
pub struct TransportFailure {
    pub step: String,
    pub method: String,
    pub url: String,
    /// `None` when the call failed before a response arrived (timeout, connection)
    pub status: Option<u16>,
    /// Response body (or client error text), truncated and redacted
    pub body: String,
}

impl TransportFailure {
    pub fn new(
        step: &str,
        method: &str,
        url: &str,
        status: Option<u16>,
        body: &str,
    ) -> Self {
        Self {
            step: step.to_string(),
            method: method.to_string(),
            url: redact_secrets_in_text(url),
            status,
            body: truncate_body(&redact_secrets_in_text(body)),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "no response".to_string());
        write!(
            f,
            "step [{}] failed: {} {} (status: {})",
            self.step, self.method, self.url, status
        )?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

/// What the field resolver could not find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaResolutionKind {
    MissingUploadTarget,
    MissingSigningKey,
}

#[derive(Debug, Clone, Error)]
#[error("{}: response keys were {response_keys:?}", describe_kind(.kind))]
pub struct SchemaResolutionFailure {
    pub kind: SchemaResolutionKind,
    /// Top-level keys of the response that was being resolved
    pub response_keys: Vec<String>,
}

fn describe_kind(kind: &SchemaResolutionKind) -> &'static str {
    match kind {
        SchemaResolutionKind::MissingUploadTarget => {
            "no upload URL found in the signed-upload response"
        }
        SchemaResolutionKind::MissingSigningKey => {
            "no presigned 'key' found in the signed-upload response"
        }
    }
}

/// Truncate on a character boundary
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

pub type LinkflowResult<T> = std::result::Result<T, LinkflowError>;
