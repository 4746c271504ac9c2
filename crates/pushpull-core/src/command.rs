// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Undoable command that creates and wires a constraint node.
//!
//! Defaults are resolved once, in [`CreateConstraint::do_it`]; a later
//! [`CreateConstraint::redo_it`] recreates the node with exactly those
//! settings even if the scene has moved on.

use pushpull_math::Vec3;
use thiserror::Error;
use tracing::{info, warn};

use crate::ident::{NodeId, ObjectId};
use crate::node::{ConstraintNode, ConstraintSettings};
use crate::plug::{Axis, AxisMask, ParseAxisError};
use crate::scene::{ConstraintWiring, Scene, SceneError};

/// Base name for nodes created without an explicit name.
pub const DEFAULT_NODE_NAME: &str = "pushPullConstraint";

/// Maximum number of skip flags accepted.
pub const MAX_SKIPS: usize = 3;

/// Errors emitted by [`CreateConstraint`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Fewer than two objects were supplied.
    #[error("two transforms are required to create a constraint, got {0}")]
    ObjectCount(usize),
    /// More skip flags than there are axes.
    #[error("at most 3 skip flags are allowed, got {0}")]
    TooManySkips(usize),
    /// A skip flag named something other than x, y, or z.
    #[error(transparent)]
    UnknownAxis(#[from] ParseAxisError),
    /// The scene rejected a lookup or mutation.
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// `undo_it`/`redo_it` called before a successful `do_it`.
    #[error("nothing to undo or redo")]
    NothingToUndo,
}

/// Everything needed to recreate the node after an undo.
#[derive(Debug, Clone, PartialEq)]
struct Resolved {
    name: String,
    settings: ConstraintSettings,
    wiring: ConstraintWiring,
}

/// Creates a constraint between a target and a constrained transform.
///
/// Unset options fall back to values read from the scene at `do_it` time:
/// the world distance between the two objects, the scene clock, and the
/// constrained object's local translation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateConstraint {
    target: String,
    constrained: String,
    name: Option<String>,
    distance: Option<f64>,
    start_frame: Option<f64>,
    start_position: Option<Vec3>,
    skips: Vec<Axis>,
    base: ConstraintSettings,
    resolved: Option<Resolved>,
    node: Option<NodeId>,
}

impl CreateConstraint {
    /// Command for `target` driving `constrained`.
    pub fn new(target: impl Into<String>, constrained: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            constrained: constrained.into(),
            name: None,
            distance: None,
            start_frame: None,
            start_position: None,
            skips: Vec::new(),
            base: ConstraintSettings::default(),
            resolved: None,
            node: None,
        }
    }

    /// Command from an object list: the first entry is the target, the second
    /// the constrained object. Extra entries are ignored.
    ///
    /// # Errors
    /// [`CommandError::ObjectCount`] when fewer than two names are given.
    pub fn from_objects<I, S>(objects: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut objects: Vec<String> = objects.into_iter().map(Into::into).collect();
        if objects.len() < 2 {
            return Err(CommandError::ObjectCount(objects.len()));
        }
        if objects.len() > 2 {
            warn!(ignored = objects.len() - 2, "extra objects ignored");
        }
        objects.truncate(2);
        let constrained = objects.pop().unwrap_or_default();
        let target = objects.pop().unwrap_or_default();
        Ok(Self::new(target, constrained))
    }

    /// Node name; a taken name gets a numeric suffix.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Explicit target separation.
    pub fn distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Explicit activation time.
    pub fn start_frame(mut self, frame: f64) -> Self {
        self.start_frame = Some(frame);
        self
    }

    /// Explicit rest position, parent space.
    pub fn start_position(mut self, position: Vec3) -> Self {
        self.start_position = Some(position);
        self
    }

    /// Leaves one translate channel of the constrained object unconnected.
    pub fn skip(mut self, axis: Axis) -> Self {
        self.skips.push(axis);
        self
    }

    /// Parses and adds a skip flag (`x`, `y`, or `z`).
    ///
    /// # Errors
    /// [`CommandError::UnknownAxis`] for any other name.
    pub fn skip_named(self, axis: &str) -> Result<Self, CommandError> {
        Ok(self.skip(axis.parse()?))
    }

    /// Settings used for attributes the command has no option for (push,
    /// pull, degenerate policy).
    pub fn base_settings(mut self, settings: ConstraintSettings) -> Self {
        self.base = settings;
        self
    }

    /// Node created by the last `do_it`/`redo_it`, if still present.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Resolved node name, available after `do_it`.
    pub fn node_name(&self) -> Option<&str> {
        self.resolved.as_ref().map(|r| r.name.as_str())
    }

    /// Resolved settings, available after `do_it`.
    pub fn resolved_settings(&self) -> Option<&ConstraintSettings> {
        self.resolved.as_ref().map(|r| &r.settings)
    }

    /// Resolves defaults against `scene`, then creates and wires the node.
    ///
    /// # Errors
    /// [`CommandError::TooManySkips`] or [`CommandError::Scene`] when either
    /// object is missing.
    pub fn do_it(&mut self, scene: &mut Scene) -> Result<NodeId, CommandError> {
        if self.skips.len() > MAX_SKIPS {
            return Err(CommandError::TooManySkips(self.skips.len()));
        }
        let target = lookup(scene, &self.target)?;
        let constrained = lookup(scene, &self.constrained)?;

        let distance = match self.distance {
            Some(d) => d,
            None => scene
                .world_position(target)?
                .distance(&scene.world_position(constrained)?),
        };
        let start_position = match self.start_position {
            Some(p) => p,
            None => scene.translation(constrained)?,
        };
        let settings = ConstraintSettings {
            distance,
            start_frame: self.start_frame.unwrap_or_else(|| scene.time()),
            start_position,
            ..self.base
        };
        let name = match &self.name {
            Some(name) if scene.node_id(name).is_none() => name.clone(),
            Some(name) => scene.unique_node_name(name),
            None => scene.unique_node_name(DEFAULT_NODE_NAME),
        };

        self.resolved = Some(Resolved {
            name,
            settings,
            wiring: ConstraintWiring {
                target,
                constrained,
                axes: AxisMask::from_skips(&self.skips),
            },
        });
        self.redo_it(scene)
    }

    /// Recreates the node from the settings resolved by `do_it`.
    ///
    /// # Errors
    /// [`CommandError::NothingToUndo`] before `do_it`, or
    /// [`CommandError::Scene`] if the node name was taken or an object was
    /// removed in the meantime.
    pub fn redo_it(&mut self, scene: &mut Scene) -> Result<NodeId, CommandError> {
        let resolved = self.resolved.as_ref().ok_or(CommandError::NothingToUndo)?;
        let id = scene.insert_node(ConstraintNode::new(&resolved.name, resolved.settings))?;
        if let Err(err) = scene.connect(id, resolved.wiring) {
            if let Err(rollback) = scene.remove_node(id) {
                warn!(node = %resolved.name, %rollback, "rollback of unwired node failed");
            }
            return Err(err.into());
        }
        info!(
            node = %resolved.name,
            distance = resolved.settings.distance,
            start_frame = resolved.settings.start_frame,
            "constraint created"
        );
        self.node = Some(id);
        Ok(id)
    }

    /// Breaks the node's connections, then deletes it.
    ///
    /// # Errors
    /// [`CommandError::NothingToUndo`] when no node is live, or
    /// [`CommandError::Scene`] if it was already removed.
    pub fn undo_it(&mut self, scene: &mut Scene) -> Result<(), CommandError> {
        let id = self.node.take().ok_or(CommandError::NothingToUndo)?;
        scene.disconnect(id)?;
        let (node, _) = scene.remove_node(id)?;
        info!(node = %node.name(), "constraint deleted");
        Ok(())
    }
}

fn lookup(scene: &Scene, name: &str) -> Result<ObjectId, SceneError> {
    scene
        .object_id(name)
        .ok_or_else(|| SceneError::UnknownObject(name.to_owned()))
}
