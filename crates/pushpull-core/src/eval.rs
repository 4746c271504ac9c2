// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Constraint evaluator: the reset / inactive / active state machine and the
//! distance correction.
//!
//! [`evaluate`] is a pure function of an [`EvalInputs`] snapshot and the
//! memo (`lastPosition`). It never touches a scene; the caller applies the
//! returned writes. Calling it twice with the same inputs and memo yields the
//! same [`Evaluation`].

use pushpull_math::{Mat4, Vec3};
use thiserror::Error;

use crate::plug::Plug;

/// What to do when the constrained point sits exactly on the target and a
/// push correction has no direction to push along.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum DegeneratePolicy {
    /// Leave output and memo untouched for this cycle.
    #[default]
    Skip,
    /// Push out along this world-space direction. A zero direction behaves
    /// like [`DegeneratePolicy::Skip`].
    Axis(Vec3),
}

/// Snapshot of every value the evaluator reads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EvalInputs {
    /// Scene clock.
    pub current_time: f64,
    /// Target world transform; only its translation is read.
    pub target_world_matrix: Mat4,
    /// World transform of the constrained object's parent.
    pub constraint_parent_matrix: Mat4,
    /// Target separation (negative values are treated as `0`).
    pub distance: f64,
    /// Time at or after which the constraint is active.
    pub start_frame: f64,
    /// Rest position in parent space.
    pub start_position: Vec3,
    /// Push out when closer than `distance`.
    pub push_enabled: bool,
    /// Pull in when farther than `distance`.
    pub pull_enabled: bool,
    /// Tie-break for a zero-length offset.
    pub degenerate_policy: DegeneratePolicy,
}

/// Which branch of the state machine produced an [`Evaluation`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Branch {
    /// `current_time < start_frame`: output and memo snapped to the rest pose.
    Reset,
    /// Push and pull both disabled: nothing written.
    Inactive,
    /// Already within the enabled bounds: nothing written.
    Satisfied,
    /// Position corrected: output and memo written.
    Corrected,
    /// Offset had no direction and the policy skipped: nothing written.
    Degenerate,
}

/// Writes produced by one evaluation. `None` means "do not write"; the host
/// keeps whatever value it already holds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Evaluation {
    /// New `constraintTranslate`, parent space.
    pub output: Option<Vec3>,
    /// New `lastPosition`, parent space.
    pub memo: Option<Vec3>,
    /// Branch taken.
    pub branch: Branch,
}

impl Evaluation {
    const fn unwritten(branch: Branch) -> Self {
        Self {
            output: None,
            memo: None,
            branch,
        }
    }

    const fn written(position: Vec3, branch: Branch) -> Self {
        Self {
            output: Some(position),
            memo: Some(position),
            branch,
        }
    }

    /// Output value the host holds after applying this evaluation.
    pub fn output_or(&self, previous: Vec3) -> Vec3 {
        self.output.unwrap_or(previous)
    }

    /// Memo value the host holds after applying this evaluation.
    pub fn memo_or(&self, previous: Vec3) -> Vec3 {
        self.memo.unwrap_or(previous)
    }
}

/// Reason a single evaluation could not be computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ComputeFailure {
    /// A required input held NaN or an infinity.
    #[error("input `{0}` is not finite")]
    NonFiniteInput(&'static str),
    /// The parent matrix could not be inverted to return to parent space.
    #[error("constraint parent matrix is singular")]
    SingularParentMatrix,
}

/// Errors emitted by [`evaluate`]. Both are recoverable for the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The requested plug is not produced by this evaluator.
    #[error("plug not handled by the constraint evaluator: {0}")]
    NotHandled(Plug),
    /// The evaluation failed for this cycle; nothing was written.
    #[error("constraint compute failed: {0}")]
    ComputeFailure(#[from] ComputeFailure),
}

fn require_finite(value: f64, name: &'static str) -> Result<(), ComputeFailure> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ComputeFailure::NonFiniteInput(name))
    }
}

fn require_finite_vec(value: &Vec3, name: &'static str) -> Result<(), ComputeFailure> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ComputeFailure::NonFiniteInput(name))
    }
}

fn require_finite_mat(value: &Mat4, name: &'static str) -> Result<(), ComputeFailure> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ComputeFailure::NonFiniteInput(name))
    }
}

/// Evaluates the constraint for `plug`.
///
/// Children of `constraintTranslate` are served by the compound output; any
/// other plug returns [`EvalError::NotHandled`].
///
/// # Errors
/// [`EvalError::NotHandled`] for plugs outside the output group and
/// [`EvalError::ComputeFailure`] for non-finite inputs or a singular parent
/// matrix. No write is implied by an error.
pub fn evaluate(plug: Plug, inputs: &EvalInputs, memo: Vec3) -> Result<Evaluation, EvalError> {
    if plug.root() != Plug::ConstraintTranslate {
        return Err(EvalError::NotHandled(plug));
    }

    require_finite(inputs.current_time, "inTime")?;
    require_finite(inputs.start_frame, "startFrame")?;

    if inputs.current_time < inputs.start_frame {
        require_finite_vec(&inputs.start_position, "startPosition")?;
        return Ok(Evaluation::written(inputs.start_position, Branch::Reset));
    }

    if !inputs.push_enabled && !inputs.pull_enabled {
        return Ok(Evaluation::unwritten(Branch::Inactive));
    }

    correct(inputs, memo).map_err(EvalError::from)
}

fn correct(inputs: &EvalInputs, memo: Vec3) -> Result<Evaluation, ComputeFailure> {
    require_finite_mat(&inputs.target_world_matrix, "targetWorldMatrix")?;
    require_finite_mat(&inputs.constraint_parent_matrix, "constraintParentMatrix")?;
    require_finite(inputs.distance, "distance")?;
    require_finite_vec(&memo, "lastPosition")?;

    let distance = inputs.distance.max(0.0);
    let target_pos = inputs.target_world_matrix.translation_part();
    let last_world_pos = inputs.constraint_parent_matrix.transform_point(&memo);
    let relative = last_world_pos - target_pos;
    let current_distance = relative.length();

    let too_far = inputs.pull_enabled && current_distance > distance;
    let too_close = inputs.push_enabled && current_distance < distance;
    if !(too_far || too_close) {
        return Ok(Evaluation::unwritten(Branch::Satisfied));
    }

    let direction = match relative.try_normalize() {
        Some(dir) => dir,
        None => match inputs.degenerate_policy {
            DegeneratePolicy::Axis(axis) => match axis.try_normalize() {
                Some(dir) => dir,
                None => return Ok(Evaluation::unwritten(Branch::Degenerate)),
            },
            DegeneratePolicy::Skip => return Ok(Evaluation::unwritten(Branch::Degenerate)),
        },
    };

    let new_world_pos = target_pos + direction * distance;
    let to_parent = inputs
        .constraint_parent_matrix
        .inverse()
        .ok_or(ComputeFailure::SingularParentMatrix)?;
    let local = to_parent.transform_point(&new_world_pos);
    require_finite_vec(&local, "constraintTranslate")?;

    Ok(Evaluation::written(local, Branch::Corrected))
}
