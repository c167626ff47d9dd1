// Playlist Cursor: decides which segments of a freshly loaded media playlist
// are new, when each of them starts, and whether polling should stop.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::trace;

use crate::events::{CaptureEvent, Reporter};
use crate::hls::tags::TagRecord;

/// How many recently placed segments are remembered for re-anchoring a
/// playlist reload that does not start with a program-date-time tag.
const TIMELINE_CAPACITY: usize = 256;

/// A media segment selected for download.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub sequence: u64,
    /// `None` only while no program-date-time has been seen for the track.
    pub start: Option<DateTime<Utc>>,
    pub duration: f64,
    /// URI as written in the playlist; may be relative.
    pub uri: String,
}

impl Segment {
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.start.and_then(|start| offset(start, self.duration))
    }

    /// Short description used in logs and events.
    pub fn label(&self) -> String {
        match self.start {
            Some(start) => format!("#{} at {} ({}s)", self.sequence, start, self.duration),
            None => format!("#{} at unknown time ({}s)", self.sequence, self.duration),
        }
    }
}

/// Why a track stopped polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The playlist carried `#EXT-X-ENDLIST`.
    EndList,
    /// The stream reached the capture end instant.
    EndTimeReached,
    /// The capture was cancelled from outside.
    Cancelled,
}

/// Per-track polling state that survives playlist reloads.
#[derive(Debug, Clone)]
pub struct PollerState {
    /// Lowest media sequence number not yet handed out for download. Never
    /// decreases.
    pub next_sequence: u64,
    pub target_duration: f64,
    pub capture_start: DateTime<Utc>,
    pub capture_end: Option<DateTime<Utc>>,
}

impl PollerState {
    pub fn new(capture_start: DateTime<Utc>, capture_end: Option<DateTime<Utc>>) -> Self {
        Self {
            next_sequence: 0,
            target_duration: 0.0,
            capture_start,
            capture_end,
        }
    }
}

/// Result of scanning one playlist load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Segments to download and merge, in sequence order.
    pub new_segments: Vec<Segment>,
    pub saw_end_list: bool,
    /// At least one sequence number was seen for the first time, whether or
    /// not its segment survived the capture-start filter.
    pub has_new_segments: bool,
    /// Set when polling must stop after the segments above are merged.
    pub stop: Option<StopReason>,
}

impl FetchOutcome {
    pub fn is_terminal(&self) -> bool {
        self.stop.is_some()
    }
}

pub struct PlaylistCursor {
    state: PollerState,
    /// sequence -> (start, duration) of recently placed segments
    timeline: BTreeMap<u64, (DateTime<Utc>, f64)>,
    seen_program_date_time: bool,
    warned_missing_timing: bool,
    reporter: Reporter,
}

impl PlaylistCursor {
    pub fn new(state: PollerState, reporter: Reporter) -> Self {
        Self {
            state,
            timeline: BTreeMap::new(),
            seen_program_date_time: false,
            warned_missing_timing: false,
            reporter,
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn target_duration(&self) -> f64 {
        self.state.target_duration
    }

    /// Scans the records of one playlist load, updating the download
    /// watermark and collecting the segments that still need downloading.
    pub fn advance<'a, I>(&mut self, records: I) -> FetchOutcome
    where
        I: IntoIterator<Item = TagRecord<'a>>,
    {
        let mut outcome = FetchOutcome::default();
        let mut sequence: u64 = 0;
        let mut cursor: Option<DateTime<Utc>> = None;
        let mut duration = 0.0_f64;

        for record in records {
            match record {
                TagRecord::TargetDuration(secs) => self.state.target_duration = secs,
                TagRecord::MediaSequence(n) => sequence = n,
                TagRecord::ProgramDateTime(instant) => {
                    cursor = Some(instant);
                    if !self.seen_program_date_time {
                        self.seen_program_date_time = true;
                        self.reporter
                            .emit(CaptureEvent::EarliestAvailable { instant });
                    }
                    if self.state.capture_end.is_some_and(|end| instant >= end) {
                        self.reporter.emit(CaptureEvent::EndTimeReached);
                        outcome.stop = Some(StopReason::EndTimeReached);
                        break;
                    }
                }
                TagRecord::SegmentDuration(secs) => duration = secs,
                TagRecord::SegmentUri(uri) => {
                    if cursor.is_none() {
                        cursor = self.recall_start(sequence);
                    }
                    let end = match cursor {
                        Some(start) => match offset(start, duration) {
                            Some(end) => Some(end),
                            None => {
                                // Unrepresentable end; keep the segment with no length.
                                self.reporter.emit(CaptureEvent::InvalidPlaylistLine {
                                    line: format!("#EXTINF:{duration},"),
                                });
                                duration = 0.0;
                                Some(start)
                            }
                        },
                        None => None,
                    };

                    if sequence >= self.state.next_sequence {
                        self.state.next_sequence = sequence.saturating_add(1);
                        outcome.has_new_segments = true;

                        let wanted = end.is_none_or(|end| end > self.state.capture_start);
                        if wanted {
                            if cursor.is_none() && !self.warned_missing_timing {
                                self.warned_missing_timing = true;
                                self.reporter
                                    .emit(CaptureEvent::MissingProgramDateTime { sequence });
                            }
                            outcome.new_segments.push(Segment {
                                sequence,
                                start: cursor,
                                duration,
                                uri: uri.to_owned(),
                            });

                            if let (Some(end), Some(capture_end)) = (end, self.state.capture_end)
                                && end >= capture_end
                            {
                                self.reporter.emit(CaptureEvent::EndTimeReached);
                                outcome.stop = Some(StopReason::EndTimeReached);
                                break;
                            }
                        }
                    } else {
                        trace!(
                            track = self.reporter.track(),
                            sequence, "Skipping already downloaded segment"
                        );
                    }

                    if let Some(start) = cursor {
                        self.remember(sequence, start, duration);
                    }
                    sequence = sequence.saturating_add(1);
                    cursor = end;
                }
                TagRecord::EndList => {
                    self.reporter.emit(CaptureEvent::EndListReached);
                    outcome.saw_end_list = true;
                    outcome.stop = Some(StopReason::EndList);
                    break;
                }
                TagRecord::ParseError(line) => {
                    self.reporter.emit(CaptureEvent::InvalidPlaylistLine {
                        line: line.to_owned(),
                    });
                }
                TagRecord::Comment | TagRecord::Blank => {}
            }
        }

        outcome
    }

    /// Start of `sequence` as placed by an earlier load, if known.
    fn recall_start(&self, sequence: u64) -> Option<DateTime<Utc>> {
        if let Some((start, _)) = self.timeline.get(&sequence) {
            return Some(*start);
        }
        let previous = sequence.checked_sub(1)?;
        self.timeline
            .get(&previous)
            .and_then(|(start, duration)| offset(*start, *duration))
    }

    fn remember(&mut self, sequence: u64, start: DateTime<Utc>, duration: f64) {
        self.timeline.insert(sequence, (start, duration));
        while self.timeline.len() > TIMELINE_CAPACITY {
            self.timeline.pop_first();
        }
    }
}

/// Minimum wait before the next playlist reload (RFC 8216 §6.3.4).
///
/// A playlist that grew may not be reloaded before one target duration has
/// passed since the previous load began; an unchanged one may be retried
/// after half of it.
pub fn reload_delay(target_duration: f64, has_new_segments: bool, elapsed: Duration) -> Duration {
    let min_interval = if has_new_segments {
        target_duration
    } else {
        target_duration / 2.0
    };
    Duration::try_from_secs_f64(min_interval.max(0.0))
        .unwrap_or(Duration::MAX)
        .saturating_sub(elapsed)
}

/// `start` shifted by `secs`, or `None` when the result leaves chrono's range.
fn offset(start: DateTime<Utc>, secs: f64) -> Option<DateTime<Utc>> {
    let micros = (secs * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return None;
    }
    start.checked_add_signed(TimeDelta::microseconds(micros as i64))
}
