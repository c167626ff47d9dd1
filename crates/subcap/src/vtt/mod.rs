// WebVTT handling: cue timestamps and the segment merger.

mod merge;
pub mod timestamp;

pub use merge::WebVttMerger;
pub use timestamp::{format_timestamp, parse_timestamp};
