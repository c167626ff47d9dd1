// Output files: per-track naming and exclusive creation.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CaptureError, Result};
use crate::hls::SubtitleTrack;

const SPOKEN_DIALOG: &str = "public.accessibility.transcribes-spoken-dialog";
const MAX_COLLISION_INDEX: u32 = 99;

/// Filename suffix for a track: a short language code, plus `h` for
/// hard-of-hearing renditions.
pub fn track_suffix(language: &str, characteristics: Option<&str>) -> String {
    let mut suffix = match language {
        "fin" => "fi".to_owned(),
        "swe" => "sv".to_owned(),
        "smi" => "se".to_owned(),
        "eng" => "en".to_owned(),
        other => {
            let cleaned: String = other
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect();
            if cleaned.is_empty() {
                "unknown".to_owned()
            } else {
                cleaned
            }
        }
    };
    let transcribes_dialog = characteristics
        .is_some_and(|list| list.split(',').any(|c| c.trim() == SPOKEN_DIALOG));
    if transcribes_dialog {
        suffix.push('h');
    }
    suffix
}

/// `<base>-<suffix>.vtt`
pub fn output_path(base: &Path, track: &SubtitleTrack) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push("-");
    name.push(track_suffix(&track.language, track.characteristics.as_deref()));
    name.push(".vtt");
    PathBuf::from(name)
}

/// Creates `path`, never overwriting. When it exists, `<stem>-1.vtt` up to
/// `<stem>-99.vtt` are tried in turn. Returns the file and the path used.
pub fn create_exclusive(path: &Path) -> Result<(File, PathBuf)> {
    match try_create(path)? {
        Some(file) => return Ok((file, path.to_path_buf())),
        None => debug!(path = %path.display(), "Output file exists, trying numbered names"),
    }

    let stem = path.file_stem().unwrap_or_default();
    let extension = path.extension();
    for index in 1..=MAX_COLLISION_INDEX {
        let mut name = OsString::from(stem);
        name.push(format!("-{index}"));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }
        let candidate = path.with_file_name(name);
        if let Some(file) = try_create(&candidate)? {
            return Ok((file, candidate));
        }
    }

    Err(CaptureError::OutputExists {
        path: path.to_path_buf(),
    })
}

fn try_create(path: &Path) -> Result<Option<File>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e.into()),
    }
}
