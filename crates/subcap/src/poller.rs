// Track Poller: reloads one subtitle media playlist, downloads each new
// segment once and feeds it to the merger until the track is done.

use std::io::Write;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::error::{CaptureError, Result};
use crate::events::{CaptureEvent, Reporter};
use crate::fetcher::Transport;
use crate::hls::{PlaylistCursor, PollerState, StopReason, parse_tags, reload_delay};
use crate::vtt::WebVttMerger;

/// What a finished track did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSummary {
    pub stop: StopReason,
    pub segments_merged: u64,
    pub playlist_fetches: u64,
}

pub struct TrackPoller<W: Write> {
    playlist_url: Url,
    transport: Arc<dyn Transport>,
    cursor: PlaylistCursor,
    merger: WebVttMerger<W>,
    reporter: Reporter,
    token: CancellationToken,
    segments_merged: u64,
    playlist_fetches: u64,
}

impl<W: Write> TrackPoller<W> {
    pub fn new(
        playlist_url: Url,
        transport: Arc<dyn Transport>,
        sink: W,
        state: PollerState,
        reporter: Reporter,
        token: CancellationToken,
    ) -> Self {
        let merger = WebVttMerger::new(sink, state.capture_start, reporter.clone());
        Self {
            playlist_url,
            transport,
            cursor: PlaylistCursor::new(state, reporter.clone()),
            merger,
            reporter,
            token,
            segments_merged: 0,
            playlist_fetches: 0,
        }
    }

    /// Polls until the playlist ends, the capture end is reached, the token
    /// is cancelled or a fetch fails. The sink is flushed on every path.
    pub async fn run(mut self) -> Result<TrackSummary> {
        let outcome = self.poll_loop().await;
        let flushed = self.merger.finish();

        let stop = outcome?;
        flushed?;
        info!(
            track = self.reporter.track(),
            ?stop,
            segments = self.segments_merged,
            "Track finished"
        );
        Ok(TrackSummary {
            stop,
            segments_merged: self.segments_merged,
            playlist_fetches: self.playlist_fetches,
        })
    }

    async fn poll_loop(&mut self) -> Result<StopReason> {
        let mut first_fetch = true;
        loop {
            let fetch_started = Instant::now();
            let Some(playlist) = self.fetch(&self.playlist_url, "playlist fetch").await? else {
                return Ok(StopReason::Cancelled);
            };
            self.playlist_fetches += 1;

            let outcome = self.cursor.advance(parse_tags(&playlist));
            debug!(
                track = self.reporter.track(),
                new_segments = outcome.new_segments.len(),
                has_new = outcome.has_new_segments,
                "Playlist scanned"
            );

            for segment in &outcome.new_segments {
                let url = self
                    .playlist_url
                    .join(&segment.uri)
                    .map_err(|e| CaptureError::invalid_url(&segment.uri, e.to_string()))?;
                let Some(payload) = self.fetch(&url, "segment fetch").await? else {
                    return Ok(StopReason::Cancelled);
                };
                self.merger
                    .convert_and_write(&payload, segment.start, &segment.label())?;
                self.segments_merged += 1;
            }

            if let Some(stop) = outcome.stop {
                return Ok(stop);
            }

            // The first load counts as growth: there was nothing before it.
            let delay = reload_delay(
                self.cursor.target_duration(),
                outcome.has_new_segments || first_fetch,
                fetch_started.elapsed(),
            );
            first_fetch = false;
            self.reporter.emit(CaptureEvent::ReloadScheduled { delay });

            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!(track = self.reporter.track(), "Cancelled while waiting for reload");
                    return Ok(StopReason::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// `None` when cancelled before the response arrived.
    async fn fetch(&self, url: &Url, operation: &'static str) -> Result<Option<String>> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Ok(None),
            text = self.transport.fetch_text(url, operation) => text.map(Some),
        }
    }
}
