use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(author, version, about = "Capture subtitles from a live HLS stream", long_about = None)]
#[command(after_help = "It is possible to set the start time some hours in the past and \
capture subtitles from that time, as long as the server still has them.")]
pub struct Args {
    /// Master playlist URL of the stream
    pub url: String,

    /// Base for output filenames; may contain a path but should not have an
    /// extension. Subtitles are saved with names like `<base>-fi.vtt`.
    pub output_basename: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// No subtitles older than this are captured. Also the zero point of the
    /// saved cue times. Accepts `now`, RFC 3339, `YYYY-MM-DD HH:MM[:SS]`,
    /// `DD.MM.YYYY HH:MM[:SS]` or `HH:MM[:SS]` (today, local time).
    #[arg(short = 's', long = "start-time", default_value = "now")]
    pub start_time: String,

    /// Stop capturing at this time (same formats as --start-time)
    #[arg(short = 'e', long = "end-time", conflicts_with = "duration")]
    pub end_time: Option<String>,

    /// Capture this long from the start time: `hh:mm:ss[.sss]`, `hh:mm`,
    /// `ss[.sss]`, or phrases like `1h 2m 3s` or `1 hour 30 minutes`
    /// (English, Finnish and Swedish units)
    #[arg(short = 'd', long)]
    pub duration: Option<String>,

    /// User agent for HTTP requests
    #[arg(long)]
    pub user_agent: Option<String>,
}
