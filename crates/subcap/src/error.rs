use std::path::PathBuf;

use reqwest::StatusCode;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture cancelled")]
    Cancelled,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("playlist error: {reason}")]
    Playlist { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("output file `{}` and all numbered alternatives already exist", .path.display())]
    OutputExists { path: PathBuf },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl CaptureError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    pub fn playlist(reason: impl Into<String>) -> Self {
        Self::Playlist {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_names_operation_and_url() {
        let err = CaptureError::http_status(
            StatusCode::NOT_FOUND,
            "https://example.com/subs.m3u8",
            "playlist fetch",
        );
        assert_eq!(
            err.to_string(),
            "request failed with HTTP 404 Not Found during playlist fetch for https://example.com/subs.m3u8"
        );
    }

    #[test]
    fn output_exists_names_the_path() {
        let err = CaptureError::OutputExists {
            path: PathBuf::from("/tmp/capture-fi.vtt"),
        };
        assert!(err.to_string().contains("/tmp/capture-fi.vtt"));
    }
}
