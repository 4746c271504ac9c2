// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors raised while reading, editing, or persisting preferences.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for preference operations.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// The platform reports no per-user config directory.
    #[error("could not resolve a config directory")]
    NoConfigDir,
    /// Filesystem access to the preferences file failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// What was being done (`read`, `write`, ...).
        action: &'static str,
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The stored document is not valid preferences JSON.
    #[error("malformed preferences: {0}")]
    Serde(#[from] serde_json::Error),
    /// A key outside [`crate::ConstraintPrefs::KEYS`].
    #[error("unknown preference: {0}")]
    UnknownKey(String),
    /// A value the key cannot hold.
    #[error("{key} expects {expected}, got {value:?}")]
    InvalidValue {
        /// Preference name.
        key: &'static str,
        /// Accepted forms.
        expected: &'static str,
        /// Rejected input.
        value: String,
    },
}
