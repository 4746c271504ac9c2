// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted defaults for newly created constraints and for tool logging.

use pushpull_core::{ConstraintSettings, DegeneratePolicy, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::PrefsError;

/// Serializable form of [`DegeneratePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateFallback {
    /// Skip the correction for that cycle.
    #[default]
    Skip,
    /// Push along a fixed world direction.
    Axis([f64; 3]),
}

impl DegenerateFallback {
    /// Policy understood by the evaluator.
    pub fn to_policy(self) -> DegeneratePolicy {
        match self {
            Self::Skip => DegeneratePolicy::Skip,
            Self::Axis(dir) => DegeneratePolicy::Axis(Vec3::from(dir)),
        }
    }
}

impl From<DegeneratePolicy> for DegenerateFallback {
    fn from(policy: DegeneratePolicy) -> Self {
        match policy {
            DegeneratePolicy::Skip => Self::Skip,
            DegeneratePolicy::Axis(dir) => Self::Axis(dir.to_array()),
        }
    }
}

/// User preferences. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintPrefs {
    /// Push toggle for new constraints.
    pub default_push: bool,
    /// Pull toggle for new constraints.
    pub default_pull: bool,
    /// Tie-break for zero-length offsets.
    pub degenerate_policy: DegenerateFallback,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ConstraintPrefs {
    fn default() -> Self {
        Self {
            default_push: true,
            default_pull: true,
            degenerate_policy: DegenerateFallback::Skip,
            log_filter: "info".to_owned(),
        }
    }
}

impl ConstraintPrefs {
    /// Keys accepted by [`ConstraintPrefs::set`].
    pub const KEYS: [&'static str; 4] = [
        "default_push",
        "default_pull",
        "degenerate_policy",
        "log_filter",
    ];

    /// Base settings for a new constraint; distance, start frame, and start
    /// position are resolved per creation.
    pub fn settings(&self) -> ConstraintSettings {
        ConstraintSettings {
            push: self.default_push,
            pull: self.default_pull,
            degenerate_policy: self.degenerate_policy.to_policy(),
            ..ConstraintSettings::default()
        }
    }

    /// Sets one preference from its textual form.
    ///
    /// `degenerate_policy` takes `skip` or a finite direction `x,y,z`.
    ///
    /// # Errors
    /// [`PrefsError::UnknownKey`] or [`PrefsError::InvalidValue`]; `self` is
    /// unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        match key {
            "default_push" => self.default_push = parse_bool("default_push", value)?,
            "default_pull" => self.default_pull = parse_bool("default_pull", value)?,
            "degenerate_policy" => self.degenerate_policy = parse_fallback(value)?,
            "log_filter" => self.log_filter = value.to_owned(),
            _ => return Err(PrefsError::UnknownKey(key.to_owned())),
        }
        Ok(())
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, PrefsError> {
    match value {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        _ => Err(PrefsError::InvalidValue {
            key,
            expected: "true/false",
            value: value.to_owned(),
        }),
    }
}

fn parse_fallback(value: &str) -> Result<DegenerateFallback, PrefsError> {
    if value.eq_ignore_ascii_case("skip") {
        return Ok(DegenerateFallback::Skip);
    }
    let invalid = || PrefsError::InvalidValue {
        key: "degenerate_policy",
        expected: "`skip` or a finite direction `x,y,z`",
        value: value.to_owned(),
    };
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    match parts.as_slice() {
        [x, y, z] if parts.iter().all(|c| c.is_finite()) => {
            Ok(DegenerateFallback::Axis([*x, *y, *z]))
        }
        _ => Err(invalid()),
    }
}
