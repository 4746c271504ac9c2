// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted defaults for push/pull tools.
//!
//! [`ConstraintPrefs`] is the document, [`PrefsStore`] is where it lives
//! (one JSON file per user via [`FsPrefsStore`]), and [`PrefsService`] loads,
//! edits, and saves it.

pub mod error;
pub mod prefs;
pub mod service;
pub mod store;

pub use error::PrefsError;
pub use prefs::{ConstraintPrefs, DegenerateFallback};
pub use service::PrefsService;
pub use store::{FsPrefsStore, PrefsStore, PREFS_FILE};
