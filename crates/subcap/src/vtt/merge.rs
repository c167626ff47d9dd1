use std::io::{self, Write};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::events::{CaptureEvent, Reporter};
use crate::lines::physical_lines;
use crate::vtt::timestamp::{format_timestamp, parse_timestamp};

static CUE_TIMINGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+?)\s*-->\s*(\S+)(\s+.*)?$").unwrap());

const MAGIC: &str = "WEBVTT";
const TIMESTAMP_MAP: &str = "X-TIMESTAMP-MAP";

/// Merges WebVTT segments into one document on a shared timeline.
///
/// Cue times of each segment are shifted by the distance between the
/// segment's start instant and the merge start instant. Cues that end before
/// the merge start are dropped, cues that straddle it are clamped to zero.
/// Each segment reaches the sink with a single `write_all`, so a capture
/// that stops between segments leaves a well-formed file.
pub struct WebVttMerger<W: Write> {
    sink: W,
    merge_start: DateTime<Utc>,
    is_first_segment: bool,
    last_line_was_empty: bool,
    reporter: Reporter,
}

impl<W: Write> WebVttMerger<W> {
    pub fn new(sink: W, merge_start: DateTime<Utc>, reporter: Reporter) -> Self {
        Self {
            sink,
            merge_start,
            is_first_segment: true,
            // Nothing written yet, so no separator is owed.
            last_line_was_empty: true,
            reporter,
        }
    }

    /// True until a valid segment has been merged.
    pub fn is_first_segment(&self) -> bool {
        self.is_first_segment
    }

    /// Rewrites one segment payload onto the merged timeline and appends it.
    ///
    /// `segment_start` is the wall-clock start of the segment; `None` keeps the
    /// payload's own timeline. `label` names the segment in events.
    pub fn convert_and_write(
        &mut self,
        payload: &str,
        segment_start: Option<DateTime<Utc>>,
        label: &str,
    ) -> io::Result<()> {
        let payload = payload.strip_prefix('\u{feff}').unwrap_or(payload);
        let mut lines = physical_lines(payload).peekable();
        while lines.next_if(|l| l.trim().is_empty()).is_some() {}

        match lines.peek() {
            Some(first) if is_magic(first) => {}
            _ => {
                self.reporter.emit(CaptureEvent::NotWebVtt {
                    segment: label.to_owned(),
                });
                return Ok(());
            }
        }

        let offset_ms = match segment_start {
            Some(start) => self.offset_ms(start),
            None => {
                self.reporter.emit(CaptureEvent::UnknownSegmentTiming {
                    segment: label.to_owned(),
                });
                0
            }
        };

        let mut out = Rendered::new(self.last_line_was_empty);

        // Header block: magic line plus metadata up to the first blank line.
        while let Some(line) = lines.next_if(|l| !l.trim().is_empty() && !l.contains("-->")) {
            if self.is_first_segment && !line.starts_with(TIMESTAMP_MAP) {
                out.push(line);
            }
        }
        out.blank();

        let mut at_block_start = true;
        let mut dropping = false;
        let mut pending_identifier: Option<&str> = None;

        for line in lines {
            if line.trim().is_empty() {
                if let Some(id) = pending_identifier.take() {
                    out.push(id);
                }
                if !dropping {
                    out.blank();
                }
                dropping = false;
                at_block_start = true;
                continue;
            }
            if dropping {
                continue;
            }

            if line.contains("-->") {
                match self.shift_timing(line, offset_ms) {
                    Some(Shifted::Kept(rewritten)) => {
                        if let Some(id) = pending_identifier.take() {
                            out.push(id);
                        }
                        out.push(&rewritten);
                    }
                    Some(Shifted::Dropped) => {
                        pending_identifier = None;
                        dropping = true;
                    }
                    None => {
                        self.reporter.emit(CaptureEvent::InvalidCueTimestamp {
                            segment: label.to_owned(),
                            line: line.to_owned(),
                        });
                        if let Some(id) = pending_identifier.take() {
                            out.push(id);
                        }
                        out.push(line);
                    }
                }
                at_block_start = false;
                continue;
            }

            if let Some(id) = pending_identifier.take() {
                out.push(id);
            }
            if at_block_start {
                // Could be the identifier of a cue that ends up dropped.
                pending_identifier = Some(line);
                at_block_start = false;
            } else {
                out.push(line);
            }
        }
        if let Some(id) = pending_identifier {
            out.push(id);
        }

        self.sink.write_all(out.text.as_bytes())?;
        self.last_line_was_empty = out.last_empty;
        self.is_first_segment = false;
        Ok(())
    }

    /// Flushes and returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn offset_ms(&self, segment_start: DateTime<Utc>) -> i64 {
        let delta = segment_start - self.merge_start;
        match delta.num_microseconds() {
            Some(us) => (us + 500).div_euclid(1000),
            None => delta.num_milliseconds(),
        }
    }

    fn shift_timing(&self, line: &str, offset_ms: i64) -> Option<Shifted> {
        let caps = CUE_TIMINGS.captures(line)?;
        let start = parse_timestamp(caps.get(1)?.as_str())?;
        let end = parse_timestamp(caps.get(2)?.as_str())?;
        let settings = caps.get(3).map_or("", |m| m.as_str());

        let shifted_end = end.checked_add(offset_ms)?;
        if shifted_end < 0 {
            return Some(Shifted::Dropped);
        }
        let shifted_start = start.checked_add(offset_ms)?.max(0);
        Some(Shifted::Kept(format!(
            "{} --> {}{}",
            format_timestamp(shifted_start),
            format_timestamp(shifted_end),
            settings
        )))
    }
}

enum Shifted {
    Kept(String),
    Dropped,
}

fn is_magic(line: &str) -> bool {
    match line.strip_prefix(MAGIC) {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '\t']),
        None => false,
    }
}

/// Output of one segment, built before anything reaches the sink.
struct Rendered {
    text: String,
    last_empty: bool,
}

impl Rendered {
    fn new(last_empty: bool) -> Self {
        Self {
            text: String::new(),
            last_empty,
        }
    }

    fn push(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
        self.last_empty = false;
    }

    /// Blank line, unless the previous line already was one.
    fn blank(&mut self) {
        if !self.last_empty {
            self.text.push('\n');
            self.last_empty = true;
        }
    }
}
