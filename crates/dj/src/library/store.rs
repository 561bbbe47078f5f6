//! JSON-backed track library.

use std::fs;
use std::path::{Path, PathBuf};

use super::import::{import_file, locator_for_path, scan_directory};
use super::types::TrackRecord;
use crate::decoder::Decoder;

/// An ordered list of tracks persisted as a JSON array.
#[derive(Debug, Clone)]
pub struct Library {
    path: PathBuf,
    tracks: Vec<TrackRecord>,
}

impl Library {
    /// Open the library stored at `path`. A missing file gives an empty library.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, anyhow::Error> {
        let path = path.into();

        let tracks = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            log::info!("No library at {:?}, starting empty", path);
            Vec::new()
        };

        log::info!("Library opened: {} tracks from {:?}", tracks.len(), path);
        Ok(Self { path, tracks })
    }

    /// Write the library back to its file.
    pub fn save(&self) -> Result<(), anyhow::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.tracks)?;
        fs::write(&self.path, json)?;
        log::debug!("Library saved: {} tracks to {:?}", self.tracks.len(), self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&TrackRecord> {
        self.tracks.get(row)
    }

    /// Locator of the track at `row`.
    pub fn locator(&self, row: usize) -> Option<&str> {
        self.tracks.get(row).map(|t| t.url.as_str())
    }

    /// Row of the track with the given locator.
    pub fn find(&self, locator: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.url == locator)
    }

    /// Import a file and append it, returning its row.
    ///
    /// A file already in the library is not imported again; its existing row
    /// is returned.
    pub fn add_track(&mut self, path: &Path, decoder: &dyn Decoder) -> Result<usize, anyhow::Error> {
        if let Some(row) = self.find(&locator_for_path(path)) {
            log::info!("Track already in library: {:?}", path);
            return Ok(row);
        }

        let track = import_file(path, decoder)?;
        self.tracks.push(track);
        Ok(self.tracks.len() - 1)
    }

    /// Import every supported file of a directory, returning the number added.
    ///
    /// Files that fail to import are logged and skipped.
    pub fn add_directory(
        &mut self,
        path: &Path,
        decoder: &dyn Decoder,
        recursive: bool,
    ) -> usize {
        let before = self.tracks.len();
        let files = scan_directory(path, recursive);

        for file in &files {
            if let Err(e) = self.add_track(file, decoder) {
                log::warn!("Skipping {:?}: {}", file, e);
            }
        }

        let added = self.tracks.len() - before;
        log::info!("Imported {} of {} files from {:?}", added, files.len(), path);
        added
    }

    /// Remove and return the track at `row`.
    pub fn remove(&mut self, row: usize) -> Option<TrackRecord> {
        if row < self.tracks.len() {
            Some(self.tracks.remove(row))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::InMemoryDecoder;
    use crate::signal::DecodedSignal;

    fn decoder_for(paths: &[&Path]) -> InMemoryDecoder {
        let mut decoder = InMemoryDecoder::new();
        for path in paths {
            decoder.insert(
                locator_for_path(path),
                DecodedSignal::mono(vec![0.0; 3000], 1000),
            );
        }
        decoder
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::open(dir.path().join("library.json")).unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn test_add_save_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("library.json");
        let a = Path::new("/no/such/a.wav");
        let b = Path::new("/no/such/b.mp3");
        let decoder = decoder_for(&[a, b]);

        let mut library = Library::open(&file).unwrap();
        assert_eq!(library.add_track(a, &decoder).unwrap(), 0);
        assert_eq!(library.add_track(b, &decoder).unwrap(), 1);
        // Same file again keeps its row
        assert_eq!(library.add_track(a, &decoder).unwrap(), 0);
        library.save().unwrap();

        let reopened = Library::open(&file).unwrap();
        assert_eq!(reopened.tracks(), library.tracks());
        assert_eq!(reopened.locator(1), Some("file:///no/such/b.mp3"));
        assert_eq!(reopened.get(0).map(|t| t.duration), Some(3));
        assert_eq!(reopened.get(0).map(|t| t.bpm), Some(0.0));
    }

    #[test]
    fn test_failed_import_is_not_added() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(dir.path().join("library.json")).unwrap();
        let decoder = InMemoryDecoder::new();

        assert!(library.add_track(Path::new("/no/such/c.wav"), &decoder).is_err());
        assert!(library.is_empty());
    }

    #[test]
    fn test_remove_row() {
        let dir = tempfile::tempdir().unwrap();
        let a = Path::new("/no/such/a.wav");
        let b = Path::new("/no/such/b.wav");
        let decoder = decoder_for(&[a, b]);

        let mut library = Library::open(dir.path().join("library.json")).unwrap();
        library.add_track(a, &decoder).unwrap();
        library.add_track(b, &decoder).unwrap();

        let removed = library.remove(0).unwrap();
        assert_eq!(removed.title, "a.wav");
        assert_eq!(library.len(), 1);
        assert!(library.remove(5).is_none());
        assert_eq!(library.find("file:///no/such/b.wav"), Some(0));
    }

    #[test]
    fn test_reads_plain_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("library.json");
        fs::write(
            &file,
            r#"[{"title": "x.mp3", "duration": 200, "artist": "DJ", "url": "file:///x.mp3", "bpm": 128.0}]"#,
        )
        .unwrap();

        let library = Library::open(&file).unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library.tracks()[0].duration_display(), "3:20");
        assert_eq!(library.tracks()[0].bpm_display(), "128");
    }
}
