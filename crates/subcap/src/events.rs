// Capture events: notable conditions raised while polling and merging a track.
//
// Components never log warnings directly; they hand events to a `Reporter`,
// which forwards them to the configured `CaptureObserver`. The default
// observer turns them into `tracing` records.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// First program-date-time seen for the track.
    EarliestAvailable { instant: DateTime<Utc> },
    /// A playlist line that matched no known grammar, or a known tag with a
    /// malformed value.
    InvalidPlaylistLine { line: String },
    /// A new segment had to be queued without a known start instant.
    MissingProgramDateTime { sequence: u64 },
    /// The capture end instant was reached while scanning the playlist.
    EndTimeReached,
    /// The playlist carried `#EXT-X-ENDLIST`.
    EndListReached,
    /// The poller is about to wait this long before reloading the playlist.
    ReloadScheduled { delay: Duration },
    /// A segment payload did not start with the WebVTT magic line and was
    /// discarded.
    NotWebVtt { segment: String },
    /// A cue timing line whose timestamps could not be parsed; it was copied
    /// to the output unchanged.
    InvalidCueTimestamp { segment: String, line: String },
    /// A segment was merged without a start instant, so its cues keep their
    /// own timeline.
    UnknownSegmentTiming { segment: String },
}

pub trait CaptureObserver: Send + Sync {
    fn on_event(&self, track: &str, event: &CaptureEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CaptureObserver for TracingObserver {
    fn on_event(&self, track: &str, event: &CaptureEvent) {
        match event {
            CaptureEvent::EarliestAvailable { instant } => {
                info!(track, %instant, "Earliest time available in playlist");
            }
            CaptureEvent::InvalidPlaylistLine { line } => {
                warn!(track, "Error parsing subtitle playlist");
                debug!(track, line = %line, "Playlist line");
            }
            CaptureEvent::MissingProgramDateTime { sequence } => {
                warn!(
                    track,
                    sequence, "No program date time in playlist; subtitle timing may be wrong"
                );
            }
            CaptureEvent::EndTimeReached => debug!(track, "End time reached. Stopping."),
            CaptureEvent::EndListReached => debug!(track, "End marker in playlist. Stopping."),
            CaptureEvent::ReloadScheduled { delay } => {
                debug!(track, ?delay, "Waiting before playlist reload");
            }
            CaptureEvent::NotWebVtt { segment } => {
                warn!(track, segment = %segment, "WebVTT parser: not a WebVTT file");
            }
            CaptureEvent::InvalidCueTimestamp { segment, line } => {
                warn!(track, segment = %segment, line = %line, "WebVTT parser: invalid timestamp");
            }
            CaptureEvent::UnknownSegmentTiming { segment } => {
                warn!(
                    track,
                    segment = %segment,
                    "WebVTT parser: segment start unknown; timing errors possible"
                );
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<(String, CaptureEvent)>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, CaptureEvent)> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, track: &str) -> Vec<CaptureEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(t, _)| t == track)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Reload delays scheduled for `track`, in order.
    pub fn reload_delays(&self, track: &str) -> Vec<Duration> {
        self.events_for(track)
            .into_iter()
            .filter_map(|e| match e {
                CaptureEvent::ReloadScheduled { delay } => Some(delay),
                _ => None,
            })
            .collect()
    }
}

impl CaptureObserver for CollectingObserver {
    fn on_event(&self, track: &str, event: &CaptureEvent) {
        self.events.lock().push((track.to_owned(), event.clone()));
    }
}

/// An observer bound to one track.
#[derive(Clone)]
pub struct Reporter {
    track: Arc<str>,
    observer: Arc<dyn CaptureObserver>,
}

impl Reporter {
    pub fn new(track: impl Into<Arc<str>>, observer: Arc<dyn CaptureObserver>) -> Self {
        Self {
            track: track.into(),
            observer,
        }
    }

    pub fn track(&self) -> &str {
        &self.track
    }

    pub fn emit(&self, event: CaptureEvent) {
        self.observer.on_event(&self.track, &event);
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("track", &self.track)
            .finish_non_exhaustive()
    }
}
