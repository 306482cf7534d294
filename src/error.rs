//! Error taxonomy for API operations.

use crate::transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// An attribute value outside its enumerated domain. Raised before any request.
    #[error("invalid {field} value: {value}\nValid values: [{}]", .allowed.join(" "))]
    InvalidValue {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("invalid tag. Not a key=value format")]
    InvalidTag(String),

    #[error("invalid type. (license | vuln)")]
    InvalidIssueType(String),

    /// The endpoint answered with an unexpected status; carries its status text verbatim.
    #[error("{operation} failed: {status}")]
    Http {
        operation: &'static str,
        status: String,
    },

    #[error("{operation} failed: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("org not found: {0}")]
    OrgNotFound(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to render {format} output: {detail}")]
    Render {
        format: &'static str,
        detail: String,
    },
}

impl ApiError {
    /// True for errors raised by local validation, before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidValue { .. } | ApiError::InvalidTag(_) | ApiError::InvalidIssueType(_)
        )
    }
}
