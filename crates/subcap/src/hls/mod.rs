// HLS playlist handling: tag scanning, sequence tracking and track discovery.

mod cursor;
mod master;
mod tags;

pub use cursor::{FetchOutcome, PlaylistCursor, PollerState, Segment, StopReason, reload_delay};
pub use master::{SubtitleTrack, discover_subtitle_tracks, parse_subtitle_tracks};
pub use tags::{TagRecord, Tags, parse_program_date_time, parse_tags};
