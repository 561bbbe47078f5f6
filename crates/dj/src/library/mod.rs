//! Track library: records, JSON persistence and file import.

mod types;

pub mod import;
pub mod store;

pub use import::{
    import_file, is_supported_audio_file, locator_for_path, read_artist, scan_directory,
    UNKNOWN_ARTIST,
};
pub use store::Library;
pub use types::{AudioFormat, TrackRecord};
