use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{CaptureError, Result};

pub const DEFAULT_USER_AGENT: &str = concat!("subcap/", env!("CARGO_PKG_VERSION"));

/// What to capture and where to write it.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// No cue ending before this instant is kept. Also the zero point of the
    /// merged subtitle timeline.
    pub start: DateTime<Utc>,

    /// Stop once the stream reaches this instant. `None` captures until the
    /// stream ends or the capture is cancelled.
    pub end: Option<DateTime<Utc>>,

    /// Base for output filenames; may contain a directory. Each track is
    /// written to `<output_base>-<suffix>.vtt`.
    pub output_base: PathBuf,
}

impl CaptureConfig {
    pub fn new(start: DateTime<Utc>, output_base: impl Into<PathBuf>) -> Self {
        Self {
            start,
            end: None,
            output_base: output_base.into(),
        }
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets the end to `duration` after the start. Fails when that instant
    /// is outside the representable date range.
    pub fn with_duration(mut self, duration: TimeDelta) -> Result<Self> {
        let end = self.start.checked_add_signed(duration).ok_or_else(|| {
            CaptureError::configuration(format!("duration {duration} is out of range"))
        })?;
        self.end = Some(end);
        Ok(self)
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        self.end.map(|end| end - self.start)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(end) = self.end
            && end <= self.start
        {
            return Err(CaptureError::configuration(format!(
                "end time {end} is not after start time {}",
                self.start
            )));
        }
        if self.output_base.as_os_str().is_empty() {
            return Err(CaptureError::configuration("output filename base is empty"));
        }
        Ok(())
    }
}

/// Options for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,

    /// Overall timeout per request. `None` disables it.
    pub timeout: Option<Duration>,

    pub connect_timeout: Duration,

    /// Extra headers sent with every request.
    pub headers: HeaderMap,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(15),
            headers: HttpConfig::get_default_headers(),
        }
    }
}

impl HttpConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "application/vnd.apple.mpegurl,application/x-mpegurl,text/vtt,*/*;q=0.8",
            ),
        );
        default_headers
    }

    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(self.headers.clone())
            .connect_timeout(self.connect_timeout);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn duration_sets_end_relative_to_start() {
        let config = CaptureConfig::new(start(), "out/capture")
            .with_duration(TimeDelta::minutes(90))
            .unwrap();
        assert_eq!(
            config.end,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 13, 30, 0).unwrap())
        );
        assert_eq!(config.duration(), Some(TimeDelta::minutes(90)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn out_of_range_duration_is_an_error() {
        let result = CaptureConfig::new(start(), "capture")
            .with_duration(TimeDelta::microseconds(9_000_000_000_000_000_000));
        assert!(matches!(result, Err(CaptureError::Configuration { .. })));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let config = CaptureConfig::new(start(), "capture").with_end(start() - TimeDelta::seconds(1));
        assert!(matches!(
            config.validate(),
            Err(CaptureError::Configuration { .. })
        ));
    }

    #[test]
    fn unbounded_capture_has_no_duration() {
        let config = CaptureConfig::new(start(), "capture");
        assert_eq!(config.duration(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_output_base_is_rejected() {
        let config = CaptureConfig::new(start(), "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_http_config_builds_a_client() {
        let config = HttpConfig::default();
        assert!(config.user_agent.starts_with("subcap/"));
        assert!(config.build_client().is_ok());
    }
}
