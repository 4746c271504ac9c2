// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed access to [`ConstraintPrefs`] over a [`PrefsStore`].

use tracing::debug;

use crate::error::PrefsError;
use crate::prefs::ConstraintPrefs;
use crate::store::PrefsStore;

/// Loads, edits, and saves the preferences document as pretty JSON.
#[derive(Debug, Clone)]
pub struct PrefsService<S> {
    store: S,
}

impl<S> PrefsService<S> {
    /// Service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> PrefsService<S>
where
    S: PrefsStore,
{
    /// Stored preferences. A missing or blank document yields the defaults,
    /// and fields absent from the document take their default values.
    ///
    /// # Errors
    /// [`PrefsError::Io`] if the store cannot be read, [`PrefsError::Serde`]
    /// if the document is malformed.
    pub fn load(&self) -> Result<ConstraintPrefs, PrefsError> {
        match self.store.read()? {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                Ok(serde_json::from_slice(&bytes)?)
            }
            _ => {
                debug!("no stored preferences; using defaults");
                Ok(ConstraintPrefs::default())
            }
        }
    }

    /// Persists `prefs`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn save(&self, prefs: &ConstraintPrefs) -> Result<(), PrefsError> {
        let mut data = serde_json::to_vec_pretty(prefs)?;
        data.push(b'\n');
        self.store.write(&data)
    }

    /// Applies one textual edit to `prefs` and saves the result. Nothing is
    /// written when the edit is rejected.
    ///
    /// # Errors
    /// [`PrefsError::UnknownKey`] or [`PrefsError::InvalidValue`] from
    /// [`ConstraintPrefs::set`], or a store failure.
    pub fn update(
        &self,
        prefs: &mut ConstraintPrefs,
        key: &str,
        value: &str,
    ) -> Result<(), PrefsError> {
        prefs.set(key, value)?;
        self.save(prefs)
    }

    /// Saves and returns the defaults.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn reset(&self) -> Result<ConstraintPrefs, PrefsError> {
        let prefs = ConstraintPrefs::default();
        self.save(&prefs)?;
        Ok(prefs)
    }
}
