mod cli;
mod error;
mod time;

use std::process;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::Parser;
use subcap_engine::{CaptureConfig, CaptureSession, HttpConfig, HttpTransport, StopReason};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use url::Url;

use crate::cli::Args;
use crate::error::{AppError, Result};
use crate::time::{parse_duration, parse_time};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let url = Url::parse(&args.url)?;
    let config = capture_config(&args, Local::now())?;

    let mut http = HttpConfig::default();
    if let Some(user_agent) = args.user_agent {
        http.user_agent = user_agent;
    }
    let transport = Arc::new(HttpTransport::new(&http)?);

    let token = CancellationToken::new();
    let session = CaptureSession::new(transport, config).with_cancellation_token(token.clone());
    print_window(session.config());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping capture");
            token.cancel();
        }
    });

    let results = session.run(&url).await?;

    let total = results.len();
    let mut failed = 0;
    for result in &results {
        let path = result
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_owned());
        match &result.outcome {
            Ok(summary) => {
                let how = match summary.stop {
                    StopReason::EndList => "stream ended",
                    StopReason::EndTimeReached => "end time reached",
                    StopReason::Cancelled => "interrupted",
                };
                info!(
                    track = %result.track.name,
                    segments = summary.segments_merged,
                    "Track complete ({how})"
                );
                println!("  {} ({}): {path}", result.track.name, result.track.language);
            }
            Err(e) => {
                failed += 1;
                warn!(track = %result.track.name, "Track failed: {e}");
                println!(
                    "  {} ({}): failed: {e}",
                    result.track.name, result.track.language
                );
            }
        }
    }
    println!("Done.");

    if failed > 0 {
        return Err(AppError::TracksFailed { failed, total });
    }
    Ok(())
}

/// Builds the capture window from the command line. `now` anchors `now`
/// and bare times of day.
fn capture_config(args: &Args, now: DateTime<Local>) -> Result<CaptureConfig> {
    let start = parse_time(&args.start_time, now)?;
    let mut config = CaptureConfig::new(start, args.output_basename.clone());
    if let Some(end) = &args.end_time {
        config = config.with_end(parse_time(end, now)?);
    } else if let Some(duration) = &args.duration {
        config = config
            .with_duration(parse_duration(duration)?)
            .map_err(|_| AppError::InvalidDuration(duration.clone()))?;
    }
    config.validate()?;
    Ok(config)
}

fn print_window(config: &CaptureConfig) {
    println!("Capturing subtitles from the following time period:");
    println!("  start:    {}", local_display(config.start));
    match (config.end, config.duration()) {
        (Some(end), Some(duration)) => {
            println!("  end:      {}", local_display(end));
            println!("  duration: {}", format_duration(duration));
        }
        _ => {
            println!("  end:      until stopped");
            println!("  duration: until stopped");
        }
    }
    println!();
}

fn local_display(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S%.3f %:z")
        .to_string()
}

fn format_duration(duration: chrono::TimeDelta) -> String {
    let millis = duration.num_milliseconds().max(0);
    format!(
        "{}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1000 % 60,
        millis % 1000
    )
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose >= 2).with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["subcap", "https://tv.example.com/master.m3u8", "news"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap()
    }

    #[test]
    fn duration_is_measured_from_the_start_time() {
        let config = capture_config(&args(&["-s", "17:00", "-d", "1h 30m"]), now()).unwrap();
        assert_eq!(config.duration(), Some(TimeDelta::minutes(90)));
        assert_eq!(config.output_base, std::path::PathBuf::from("news"));
    }

    #[test]
    fn duration_past_the_calendar_is_an_invalid_duration() {
        let result = capture_config(&args(&["-d", "9000000000000"]), now());
        assert!(matches!(result, Err(AppError::InvalidDuration(d)) if d == "9000000000000"));
    }

    #[test]
    fn end_before_start_is_a_capture_error() {
        let result = capture_config(&args(&["-s", "17:00", "-e", "16:00"]), now());
        assert!(matches!(result, Err(AppError::Capture(_))));
    }
}
