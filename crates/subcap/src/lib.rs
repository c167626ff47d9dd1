//! # Subcap engine
//!
//! Captures subtitles from a live HLS stream. Every subtitle track announced
//! by the master playlist gets its own poller that reloads the media playlist
//! at the pace RFC 8216 allows, downloads each new WebVTT segment exactly once
//! and merges the cues into a single document whose timeline starts at the
//! chosen capture start instant.
//!
//! ## Layout
//!
//! - [`hls`]: media playlist tag scanner, the sequence-number cursor and
//!   master playlist track discovery
//! - [`vtt`]: cue timestamp handling and the incremental WebVTT merger
//! - [`poller`]: the per-track polling loop
//! - [`session`]: runs all tracks of a stream concurrently

pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod hls;
mod lines;
pub mod output;
pub mod poller;
pub mod session;
pub mod vtt;

pub use config::{CaptureConfig, DEFAULT_USER_AGENT, HttpConfig};
pub use error::{CaptureError, Result};
pub use events::{CaptureEvent, CaptureObserver, CollectingObserver, Reporter, TracingObserver};
pub use fetcher::{HttpTransport, Transport};
pub use hls::{
    FetchOutcome, PlaylistCursor, PollerState, Segment, StopReason, SubtitleTrack, TagRecord,
    discover_subtitle_tracks, parse_tags, reload_delay,
};
pub use poller::{TrackPoller, TrackSummary};
pub use session::{CaptureSession, TrackResult};
pub use vtt::WebVttMerger;
