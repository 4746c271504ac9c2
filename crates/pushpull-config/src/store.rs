// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Storage port for the preferences document and its filesystem adapter.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::PrefsError;

/// File name of the preferences document.
pub const PREFS_FILE: &str = "prefs.json";

/// Holds the raw preferences document.
pub trait PrefsStore {
    /// Stored bytes, or `None` when nothing has been saved yet.
    fn read(&self) -> Result<Option<Vec<u8>>, PrefsError>;
    /// Replaces the stored document.
    fn write(&self, data: &[u8]) -> Result<(), PrefsError>;
}

/// Keeps the document in a single [`PREFS_FILE`].
#[derive(Debug, Clone)]
pub struct FsPrefsStore {
    path: PathBuf,
}

impl FsPrefsStore {
    /// Store in the user config directory (e.g. `~/.config/pushpull`).
    pub fn user() -> Result<Self, PrefsError> {
        let dirs =
            ProjectDirs::from("dev", "flyingrobots", "pushpull").ok_or(PrefsError::NoConfigDir)?;
        Ok(Self::in_dir(dirs.config_dir()))
    }

    /// Store in `dir`; the directory is created on first save.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PREFS_FILE),
        }
    }

    /// Location of the preferences file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &'static str, source: std::io::Error) -> PrefsError {
        PrefsError::Io {
            action,
            path: self.path.clone(),
            source,
        }
    }
}

impl PrefsStore for FsPrefsStore {
    fn read(&self) -> Result<Option<Vec<u8>>, PrefsError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error("read", err)),
        }
    }

    fn write(&self, data: &[u8]) -> Result<(), PrefsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error("create directory for", e))?;
        }
        // Staged beside the target; the rename replaces the file whole.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, data).map_err(|e| self.io_error("write", e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.io_error("replace", e))
    }
}
