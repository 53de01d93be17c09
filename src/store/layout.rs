//! Canonical on-disk layout of a sample folder.
//!
//! Epistemic foundation:
//! - K_i: A sample folder holds one x file, one y file and one settings file
//! - K_i: Settings and x are written atomically (write-then-rename) and never
//!   change afterwards
//! - K_i: The number of rows in the y file is the progress marker of a run
//! - B_i: Settings file may be missing or stale → Option with a warning
//! - I^B: Crash mid-run → x complete, y a valid prefix, resume continues

use super::array::{append_row, write_array};
use crate::models::{EmulikeError, FileNames, Result, Settings};
use ndarray::{ArrayView1, ArrayView2};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Handle on a sample folder.
#[derive(Debug, Clone)]
pub struct SampleStore {
    /// Folder holding the sample
    dir: PathBuf,
    /// File names inside the folder
    files: FileNames,
}

impl SampleStore {
    /// Open a sample folder, creating it if needed.
    ///
    /// Existing files are overwritten by later writes.
    pub fn new(dir: &Path, files: FileNames) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| EmulikeError::io("creating sample folder", e))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    /// Create a folder for a fresh run.
    ///
    /// Fails with `OutputNotEmpty` if the folder already has any entry, so a
    /// previous run is never overwritten.
    pub fn fresh(dir: &Path, files: FileNames) -> Result<Self> {
        if dir.exists() {
            let mut entries = fs::read_dir(dir)
                .map_err(|e| EmulikeError::io(format!("listing {}", dir.display()), e))?;
            if entries.next().is_some() {
                return Err(EmulikeError::OutputNotEmpty(dir.to_path_buf()));
            }
        }

        info!(path = %dir.display(), "Writing sample");
        Self::new(dir, files)
    }

    /// Handle on an existing sample folder, without touching the filesystem.
    pub fn existing(dir: &Path, files: FileNames) -> Result<Self> {
        if !dir.is_dir() {
            return Err(EmulikeError::InvalidPath(dir.to_path_buf()));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    /// Get the sample folder.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the x file.
    pub fn x_path(&self) -> PathBuf {
        self.dir.join(&self.files.x)
    }

    /// Path of the y file.
    pub fn y_path(&self) -> PathBuf {
        self.dir.join(&self.files.y)
    }

    /// Path of the settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(&self.files.settings)
    }

    /// Check if at least one y row has been written.
    pub fn has_y(&self) -> bool {
        self.y_path().is_file()
    }

    /// Load the settings, if any.
    ///
    /// Missing or unparseable settings are not fatal: a warning is logged and
    /// `None` returned.
    pub fn read_settings(&self) -> Option<Settings> {
        let path = self.settings_path();
        if !path.is_file() {
            warn!(path = %path.display(), "No settings file found, loading sample without settings");
            return None;
        }

        match Settings::from_file(&path) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!(error = %e, "Unable to load settings file, loading sample without settings");
                None
            }
        }
    }

    /// Save the settings (atomic write).
    pub fn write_settings(&self, settings: &Settings) -> Result<()> {
        let document = settings.to_document()?;
        let temp_path = self.temp_path(&self.files.settings);

        fs::write(&temp_path, document)
            .map_err(|e| EmulikeError::io("writing temp settings", e))?;
        fs::rename(&temp_path, self.settings_path())
            .map_err(|e| EmulikeError::io("renaming settings", e))?;

        debug!(path = %self.settings_path().display(), "Settings saved");
        Ok(())
    }

    /// Save the full x array (atomic write).
    pub fn write_x(&self, x: ArrayView2<f64>, names: Option<&[String]>) -> Result<()> {
        let temp_path = self.temp_path(&self.files.x);
        write_array(&temp_path, x, names)?;
        fs::rename(&temp_path, self.x_path()).map_err(|e| EmulikeError::io("renaming x array", e))?;

        debug!(path = %self.x_path().display(), rows = x.nrows(), "x array saved");
        Ok(())
    }

    /// Save the y array, header included.
    pub fn write_y(&self, y: ArrayView2<f64>, names: Option<&[String]>) -> Result<()> {
        write_array(&self.y_path(), y, names)
    }

    /// Append a single y row.
    pub fn append_y(&self, row: ArrayView1<f64>) -> Result<()> {
        append_row(&self.y_path(), row)
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!(".{name}.tmp"))
    }
}
