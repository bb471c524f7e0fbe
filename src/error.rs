//! Error taxonomy for backend calls.
//!
//! Every variant is treated as a transient failure by the fetch controller and
//! retried under the same policy; the view only ever sees the rendered message.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout, body read failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status.
    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Body arrived but did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Malformed(e.to_string());
        }
        if let Some(status) = e.status() {
            let url = e.url().map(|u| u.to_string()).unwrap_or_default();
            return Self::status(status.as_u16(), url);
        }
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
