// Transient audio storage for the Transcription Gateway
//
// Uploaded audio is written to a unique folder under the staging root so that a
// path-based speech engine can read it. The folder lives exactly as long as the
// `StagedAudio` handle that owns it.

use log::{debug, error, info};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extension given to every staged audio file
pub const STAGED_EXTENSION: &str = "wav";

/// Audio bytes materialized on disk for the duration of one request.
///
/// Dropping the handle removes its folder and everything the engine wrote next
/// to the audio file, on success, error and unwind alike.
#[derive(Debug)]
pub struct StagedAudio {
    id: String,
    folder: PathBuf,
    audio_file: PathBuf,
}

impl StagedAudio {
    /// Write `data` to `<base_dir>/<uuid>/audio_<uuid>.wav`
    ///
    /// # Errors
    ///
    /// Returns an IO error if the folder or the file cannot be written. Any
    /// partially created folder is removed before returning.
    pub fn create(base_dir: &Path, data: &[u8]) -> io::Result<Self> {
        let uuid = Uuid::new_v4();
        let id = uuid.to_string();
        let folder = base_dir.join(&id);
        fs::create_dir_all(&folder)?;

        let staged = Self {
            audio_file: folder.join(format!("audio_{}.{}", uuid, STAGED_EXTENSION)),
            folder,
            id,
        };

        // On error `staged` is dropped here, which removes the folder
        save_file_data(data, &staged.audio_file)?;
        debug!(
            "Staged {} bytes at {}",
            data.len(),
            staged.audio_file.display()
        );
        Ok(staged)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path of the staged audio file
    pub fn path(&self) -> &Path {
        &self.audio_file
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl Drop for StagedAudio {
    fn drop(&mut self) {
        cleanup_folder(&self.folder);
    }
}

/// Save uploaded file data to the filesystem
pub fn save_file_data(data: &[u8], file_path: &Path) -> io::Result<()> {
    let mut file = File::create(file_path)?;
    file.write_all(data)?;
    file.flush()
}

/// Remove a folder and its contents.
///
/// A folder that is already gone is ignored; other failures are logged and
/// never returned to the caller.
pub fn cleanup_folder(folder_path: &Path) {
    if !folder_path.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(folder_path) {
        error!("Failed to clean up folder {}: {}", folder_path.display(), e);
    } else {
        info!("Cleaned up staged audio: {}", folder_path.display());
    }
}
