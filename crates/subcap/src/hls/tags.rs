// HLS Tag Scanner: turns media playlist text into one typed record per line.
//
// The scanner is deliberately lenient. It never fails: a line it cannot make
// sense of becomes `TagRecord::ParseError` and scanning carries on.

use chrono::{DateTime, Utc};

use crate::lines::{PhysicalLines, physical_lines};

const TARGET_DURATION: &str = "#EXT-X-TARGETDURATION";
const MEDIA_SEQUENCE: &str = "#EXT-X-MEDIA-SEQUENCE";
const PROGRAM_DATE_TIME: &str = "#EXT-X-PROGRAM-DATE-TIME";
const EXTINF: &str = "#EXTINF";
const ENDLIST: &str = "#EXT-X-ENDLIST";

#[derive(Debug, Clone, PartialEq)]
pub enum TagRecord<'a> {
    TargetDuration(f64),
    MediaSequence(u64),
    ProgramDateTime(DateTime<Utc>),
    /// `#EXTINF` duration in seconds.
    SegmentDuration(f64),
    EndList,
    SegmentUri(&'a str),
    Comment,
    Blank,
    ParseError(&'a str),
}

/// Lazy scan over a playlist. A clone replays the scan from the same position.
#[derive(Debug, Clone)]
pub struct Tags<'a> {
    lines: PhysicalLines<'a>,
}

pub fn parse_tags(playlist: &str) -> Tags<'_> {
    Tags {
        lines: physical_lines(playlist),
    }
}

impl<'a> Iterator for Tags<'a> {
    type Item = TagRecord<'a>;

    fn next(&mut self) -> Option<TagRecord<'a>> {
        self.lines.next().map(parse_line)
    }
}

fn parse_line(line: &str) -> TagRecord<'_> {
    if line.trim().is_empty() {
        return TagRecord::Blank;
    }
    if line.starts_with("#EXT") {
        return parse_tag(line);
    }
    if line.starts_with('#') {
        return TagRecord::Comment;
    }
    if line.starts_with(char::is_whitespace) {
        return TagRecord::ParseError(line);
    }
    match line.split_whitespace().next() {
        Some(uri) => TagRecord::SegmentUri(uri),
        None => TagRecord::ParseError(line),
    }
}

fn parse_tag(line: &str) -> TagRecord<'_> {
    let (name, value) = match line.split_once(':') {
        Some((name, value)) => (name, Some(value.trim_start_matches([' ', '\t']))),
        None => (line, None),
    };

    let parsed = match (name, value) {
        (TARGET_DURATION, Some(value)) => {
            leading_integer(value).map(|secs| TagRecord::TargetDuration(secs as f64))
        }
        (MEDIA_SEQUENCE, Some(value)) => leading_integer(value).map(TagRecord::MediaSequence),
        (PROGRAM_DATE_TIME, Some(value)) => value
            .split_whitespace()
            .next()
            .and_then(parse_program_date_time)
            .map(TagRecord::ProgramDateTime),
        (EXTINF, Some(value)) => leading_decimal(value).map(TagRecord::SegmentDuration),
        (TARGET_DURATION | MEDIA_SEQUENCE | PROGRAM_DATE_TIME | EXTINF, None) => None,
        _ if is_endlist(line) => Some(TagRecord::EndList),
        _ => Some(TagRecord::Comment),
    };
    parsed.unwrap_or(TagRecord::ParseError(line))
}

fn is_endlist(line: &str) -> bool {
    match line.strip_prefix(ENDLIST) {
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}

fn leading_integer(value: &str) -> Option<u64> {
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

fn leading_decimal(value: &str) -> Option<f64> {
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    value[..end].parse().ok().filter(|secs: &f64| secs.is_finite())
}

/// Parses an `EXT-X-PROGRAM-DATE-TIME` value.
///
/// Accepts RFC 3339 (`Z`, `z` or `±HH:MM` offsets) and the compact `±HHMM`
/// offset some packagers emit.
pub fn parse_program_date_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}
