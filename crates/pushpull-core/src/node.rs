// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-instance state of a push/pull constraint node.

use pushpull_math::{Mat4, Vec3};
use tracing::{debug, warn};

use crate::eval::{evaluate, DegeneratePolicy, EvalError, EvalInputs, Evaluation};
use crate::plug::{Axis, Plug};

/// Authored attributes of a constraint node.
///
/// Defaults: `distance = 0`, `start_frame = 1`, `start_position = 0`, push
/// and pull enabled, degenerate offsets skipped.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstraintSettings {
    /// Target separation, never negative.
    pub distance: f64,
    /// Activation time.
    pub start_frame: f64,
    /// Rest position, parent space.
    pub start_position: Vec3,
    /// Push toggle.
    pub push: bool,
    /// Pull toggle.
    pub pull: bool,
    /// Tie-break for a zero-length offset.
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for ConstraintSettings {
    fn default() -> Self {
        Self {
            distance: 0.0,
            start_frame: 1.0,
            start_position: Vec3::ZERO,
            push: true,
            pull: true,
            degenerate_policy: DegeneratePolicy::Skip,
        }
    }
}

/// A push/pull constraint node: authored settings, the hidden memo, and the
/// last value written to `constraintTranslate`.
///
/// Invariants
/// - `last_position` is the start position until the first correction, and
///   afterwards the most recent corrected position.
/// - `distance` is clamped to `≥ 0` on write.
/// - Only [`ConstraintNode::compute`] mutates the memo.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintNode {
    name: String,
    settings: ConstraintSettings,
    last_position: Vec3,
    output: Vec3,
}

impl ConstraintNode {
    /// Creates a node with memo and output initialised to the start position.
    pub fn new(name: impl Into<String>, settings: ConstraintSettings) -> Self {
        let mut settings = settings;
        settings.distance = clamp_distance(settings.distance);
        Self {
            name: name.into(),
            settings,
            last_position: settings.start_position,
            output: settings.start_position,
        }
    }

    /// Node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authored settings.
    pub fn settings(&self) -> &ConstraintSettings {
        &self.settings
    }

    /// Target separation.
    pub fn distance(&self) -> f64 {
        self.settings.distance
    }

    /// Sets the target separation; negative values clamp to `0`.
    pub fn set_distance(&mut self, distance: f64) {
        self.settings.distance = clamp_distance(distance);
    }

    /// Activation time.
    pub fn start_frame(&self) -> f64 {
        self.settings.start_frame
    }

    /// Sets the activation time.
    pub fn set_start_frame(&mut self, frame: f64) {
        self.settings.start_frame = frame;
    }

    /// Rest position, parent space.
    pub fn start_position(&self) -> Vec3 {
        self.settings.start_position
    }

    /// Sets the rest position. The memo is untouched until the next reset.
    pub fn set_start_position(&mut self, position: Vec3) {
        self.settings.start_position = position;
    }

    /// Push toggle.
    pub fn push_enabled(&self) -> bool {
        self.settings.push
    }

    /// Sets the push toggle.
    pub fn set_push_enabled(&mut self, enabled: bool) {
        self.settings.push = enabled;
    }

    /// Pull toggle.
    pub fn pull_enabled(&self) -> bool {
        self.settings.pull
    }

    /// Sets the pull toggle.
    pub fn set_pull_enabled(&mut self, enabled: bool) {
        self.settings.pull = enabled;
    }

    /// Tie-break for a zero-length offset.
    pub fn degenerate_policy(&self) -> DegeneratePolicy {
        self.settings.degenerate_policy
    }

    /// Sets the tie-break for a zero-length offset.
    pub fn set_degenerate_policy(&mut self, policy: DegeneratePolicy) {
        self.settings.degenerate_policy = policy;
    }

    /// Hidden memo (`lastPosition`).
    pub fn last_position(&self) -> Vec3 {
        self.last_position
    }

    /// Current value of `constraintTranslate`.
    pub fn output(&self) -> Vec3 {
        self.output
    }

    /// One component of `constraintTranslate`.
    pub fn output_component(&self, axis: Axis) -> f64 {
        self.output.to_array()[axis.index()]
    }

    /// Builds the evaluator snapshot from the settings and the connected
    /// inputs.
    pub fn inputs(&self, current_time: f64, target_world: Mat4, parent_world: Mat4) -> EvalInputs {
        EvalInputs {
            current_time,
            target_world_matrix: target_world,
            constraint_parent_matrix: parent_world,
            distance: self.settings.distance,
            start_frame: self.settings.start_frame,
            start_position: self.settings.start_position,
            push_enabled: self.settings.push,
            pull_enabled: self.settings.pull,
            degenerate_policy: self.settings.degenerate_policy,
        }
    }

    /// Evaluates `plug` and applies the resulting writes.
    ///
    /// The returned [`Evaluation`] tells the host whether `constraintTranslate`
    /// was written (`output` is `Some`) and should be pushed downstream. On
    /// error nothing is written; output and memo keep their values.
    ///
    /// # Errors
    /// Propagates [`EvalError`] from [`evaluate`].
    pub fn compute(
        &mut self,
        plug: Plug,
        current_time: f64,
        target_world: Mat4,
        parent_world: Mat4,
    ) -> Result<Evaluation, EvalError> {
        let inputs = self.inputs(current_time, target_world, parent_world);
        match evaluate(plug, &inputs, self.last_position) {
            Ok(ev) => {
                self.output = ev.output_or(self.output);
                self.last_position = ev.memo_or(self.last_position);
                debug!(node = %self.name, time = current_time, branch = ?ev.branch, "constraint evaluated");
                Ok(ev)
            }
            Err(EvalError::ComputeFailure(failure)) => {
                warn!(node = %self.name, time = current_time, %failure, "constraint compute failed");
                Err(EvalError::ComputeFailure(failure))
            }
            Err(err) => Err(err),
        }
    }
}

fn clamp_distance(distance: f64) -> f64 {
    if distance < 0.0 {
        0.0
    } else {
        distance
    }
}
