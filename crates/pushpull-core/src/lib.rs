// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! pushpull-core: a distance constraint that pushes and/or pulls one object so
//! it keeps a set separation from a target.
//!
//! The crate is layered:
//! - [`evaluate`] is the pure state machine (reset, inactive, active) and the
//!   world-space distance correction.
//! - [`ConstraintNode`] holds one instance's authored settings and the hidden
//!   `lastPosition` memo, and applies evaluations to them.
//! - [`Scene`] is a small host: transforms, a clock, dirty tracking, and
//!   output routing onto translate channels.
//! - [`CreateConstraint`] is the undoable creation command.
#![forbid(unsafe_code)]

mod command;
mod eval;
mod ident;
mod node;
mod plug;
mod scene;

pub use command::{CommandError, CreateConstraint, DEFAULT_NODE_NAME, MAX_SKIPS};
pub use eval::{
    evaluate, Branch, ComputeFailure, DegeneratePolicy, EvalError, EvalInputs, Evaluation,
};
pub use ident::{make_node_id, make_object_id, Hash, NodeId, ObjectId};
pub use node::{ConstraintNode, ConstraintSettings};
pub use plug::{Axis, AxisMask, ParseAxisError, Plug};
pub use scene::{
    ConstraintWiring, EvalReport, NodeReport, Scene, SceneError, TransformRecord, DEFAULT_TIME,
};

pub use pushpull_math::{Mat4, Vec3};
