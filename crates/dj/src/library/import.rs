//! Audio file import and metadata extraction.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;

use super::types::{AudioFormat, TrackRecord};
use crate::analysis::estimate_bpm;
use crate::decoder::{decode_all, Decoder};

/// Artist used when a file carries no artist tag.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Build the locator stored for a file: a `file://` URL of its absolute path.
pub fn locator_for_path(path: &Path) -> String {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

/// Import a single audio file.
///
/// The title is the file name, the artist comes from the file tags, and the
/// duration and BPM come from one full decode through `decoder`.
pub fn import_file(path: &Path, decoder: &dyn Decoder) -> Result<TrackRecord, anyhow::Error> {
    log::info!("Importing file: {:?}", path);

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if AudioFormat::from_extension(extension) == AudioFormat::Unknown {
        anyhow::bail!("Unsupported audio format: {}", extension);
    }

    let title = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string();

    let url = locator_for_path(path);
    let signal = decode_all(decoder, &url)?;

    let artist = read_artist(path).unwrap_or_else(|e| {
        log::debug!("No tags read from {:?}: {}", path, e);
        None
    });

    let track = TrackRecord {
        title,
        duration: signal.duration_seconds() as i32,
        artist: artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        url,
        bpm: estimate_bpm(&signal),
    };

    log::info!(
        "Imported: {} by {} ({}s, {} BPM)",
        track.title,
        track.artist,
        track.duration,
        track.bpm_display()
    );

    Ok(track)
}

/// Read the artist tag of a file, if it has one.
pub fn read_artist(path: &Path) -> Result<Option<String>, anyhow::Error> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    // Container tags take precedence over tags found while probing (ID3)
    if let Some(artist) = probed.format.metadata().current().and_then(artist_tag) {
        return Ok(Some(artist));
    }
    if let Some(metadata) = probed.metadata.get() {
        if let Some(artist) = metadata.current().and_then(artist_tag) {
            return Ok(Some(artist));
        }
    }
    Ok(None)
}

fn artist_tag(revision: &MetadataRevision) -> Option<String> {
    revision
        .tags()
        .iter()
        .find(|tag| tag.std_key == Some(StandardTagKey::Artist))
        .map(|tag| tag.value.to_string())
        .filter(|artist| !artist.trim().is_empty())
}

/// List the supported audio files in a directory, sorted by path.
pub fn scan_directory(path: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();

            if entry_path.is_dir() {
                if recursive {
                    files.extend(scan_directory(&entry_path, true));
                }
            } else if is_supported_audio_file(&entry_path) {
                files.push(entry_path);
            }
        }
    }

    files.sort();
    files
}

/// Check if a file is a supported audio format.
pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| AudioFormat::from_extension(ext) != AudioFormat::Unknown)
        .unwrap_or(false)
}
