// Session Orchestrator: discovers the subtitle tracks of a stream and
// captures all of them concurrently.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};
use url::Url;

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::events::{CaptureObserver, Reporter, TracingObserver};
use crate::fetcher::Transport;
use crate::hls::{PollerState, SubtitleTrack, discover_subtitle_tracks};
use crate::output::{create_exclusive, output_path};
use crate::poller::{TrackPoller, TrackSummary};

/// Outcome of one track. A failed track never affects the others.
#[derive(Debug)]
pub struct TrackResult {
    pub track: SubtitleTrack,
    /// `None` when the output file could not be created.
    pub output_path: Option<PathBuf>,
    pub outcome: Result<TrackSummary>,
}

impl TrackResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

enum TrackTask {
    Running(JoinHandle<Result<TrackSummary>>),
    NotStarted(CaptureError),
}

pub struct CaptureSession {
    transport: Arc<dyn Transport>,
    config: CaptureConfig,
    observer: Arc<dyn CaptureObserver>,
    token: CancellationToken,
}

impl CaptureSession {
    pub fn new(transport: Arc<dyn Transport>, config: CaptureConfig) -> Self {
        Self {
            transport,
            config,
            observer: Arc::new(TracingObserver),
            token: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CaptureObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Cancelling this token stops every track cleanly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Captures every subtitle track announced by the master playlist at
    /// `master_url`. Fails only when no track could be started; per-track
    /// failures are reported in the returned results.
    pub async fn run(&self, master_url: &Url) -> Result<Vec<TrackResult>> {
        self.config.validate()?;

        let tracks = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(CaptureError::Cancelled),
            tracks = discover_subtitle_tracks(self.transport.as_ref(), master_url) => tracks?,
        };
        if tracks.is_empty() {
            return Err(CaptureError::playlist(format!(
                "no subtitle tracks in {master_url}"
            )));
        }
        info!(count = tracks.len(), "Found subtitle tracks");

        Ok(self.run_tracks(tracks).await)
    }

    /// Captures the given tracks concurrently and waits for all of them.
    pub async fn run_tracks(&self, tracks: Vec<SubtitleTrack>) -> Vec<TrackResult> {
        let mut pending = Vec::with_capacity(tracks.len());

        // Files are created one at a time so colliding names resolve
        // deterministically.
        for track in tracks {
            let path = output_path(&self.config.output_base, &track);
            match create_exclusive(&path) {
                Ok((file, path)) => {
                    info!(track = %track.name, path = %path.display(), "Writing subtitles");
                    let handle = self.spawn_track(&track, file);
                    pending.push((track, Some(path), TrackTask::Running(handle)));
                }
                Err(e) => pending.push((track, None, TrackTask::NotStarted(e))),
            }
        }

        let mut results = Vec::with_capacity(pending.len());
        for (track, output_path, task) in pending {
            let outcome = match task {
                TrackTask::Running(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(CaptureError::internal(format!("track task failed: {e}"))),
                },
                TrackTask::NotStarted(e) => Err(e),
            };
            if let Err(e) = &outcome {
                error!(track = %track.name, error = %e, "Track failed");
            }
            results.push(TrackResult {
                track,
                output_path,
                outcome,
            });
        }
        results
    }

    fn spawn_track(
        &self,
        track: &SubtitleTrack,
        file: File,
    ) -> JoinHandle<Result<TrackSummary>> {
        let poller = TrackPoller::new(
            track.url.clone(),
            self.transport.clone(),
            BufWriter::new(file),
            PollerState::new(self.config.start, self.config.end),
            Reporter::new(track.name.as_str(), self.observer.clone()),
            self.token.child_token(),
        );
        let span = info_span!("track", name = %track.name, language = %track.language);
        tokio::spawn(poller.run().instrument(span))
    }
}
