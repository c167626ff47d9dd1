use m3u8_rs::{AlternativeMedia, AlternativeMediaType, Playlist, parse_playlist_res};
use tracing::{debug, warn};
use url::Url;

use crate::error::{CaptureError, Result};
use crate::fetcher::Transport;

/// A subtitle rendition announced by a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub name: String,
    pub language: String,
    pub characteristics: Option<String>,
    /// Absolute URL of the track's media playlist.
    pub url: Url,
}

impl SubtitleTrack {
    fn from_alternative(media: &AlternativeMedia, base_url: &Url) -> Option<Self> {
        if !matches!(media.media_type, AlternativeMediaType::Subtitles) {
            return None;
        }
        let language = media.language.as_deref().filter(|l| !l.is_empty())?;
        let uri = media.uri.as_deref().filter(|u| !u.is_empty())?;
        if media.name.is_empty() {
            return None;
        }
        let url = match base_url.join(uri) {
            Ok(url) => url,
            Err(e) => {
                warn!(name = %media.name, uri, error = %e, "Skipping subtitle track with bad URI");
                return None;
            }
        };
        Some(Self {
            name: media.name.clone(),
            language: language.to_owned(),
            characteristics: media.characteristics.clone(),
            url,
        })
    }
}

/// Extracts the subtitle tracks from master playlist text fetched from
/// `master_url`.
pub fn parse_subtitle_tracks(text: &str, master_url: &Url) -> Result<Vec<SubtitleTrack>> {
    let master = match parse_playlist_res(text.as_bytes()) {
        Ok(Playlist::MasterPlaylist(pl)) => pl,
        Ok(Playlist::MediaPlaylist(_)) => {
            return Err(CaptureError::playlist(format!(
                "{master_url} is a media playlist, expected a master playlist"
            )));
        }
        Err(e) => {
            return Err(CaptureError::playlist(format!(
                "Failed to parse master playlist: {e}"
            )));
        }
    };

    let tracks: Vec<SubtitleTrack> = master
        .alternatives
        .iter()
        .filter_map(|media| SubtitleTrack::from_alternative(media, master_url))
        .collect();
    debug!(
        count = tracks.len(),
        alternatives = master.alternatives.len(),
        "Subtitle tracks in master playlist"
    );
    Ok(tracks)
}

/// Fetches the master playlist and lists its subtitle tracks.
pub async fn discover_subtitle_tracks(
    transport: &dyn Transport,
    master_url: &Url,
) -> Result<Vec<SubtitleTrack>> {
    let text = transport.fetch_text(master_url, "master playlist fetch").await?;
    parse_subtitle_tracks(&text, master_url)
}
