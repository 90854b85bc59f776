use thiserror::Error;

/// Errors returned by an upstream fetch.
///
/// The kinds stay distinct so callers can tell a dead network from a rejected
/// request from a payload that no longer matches the expected shape. None of
/// them are retried by the client.
///
/// A partial commit listing is never returned as success: listings arrive
/// newest first, so storing a prefix would move the watermark past commits
/// that were never fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body could not be decoded.
    #[error("Malformed response: {message}")]
    Decode { message: String },

    /// The listing had more pages than the client is allowed to follow.
    #[error("Listing truncated after {pages} pages")]
    Truncated { pages: u32 },
}

impl FetchError {
    /// Create a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a status error.
    #[inline]
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Create a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Whether upstream reported the resource as missing.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Short label for the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Decode { .. } => "decode",
            Self::Truncated { .. } => "truncated",
        }
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps multi-line causes
/// out of summaries and log lines.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
