use subcap_engine::CaptureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid time `{0}`")]
    InvalidTime(String),

    #[error("Invalid duration `{0}`")]
    InvalidDuration(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("{failed} of {total} subtitle tracks failed")]
    TracksFailed { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, AppError>;
