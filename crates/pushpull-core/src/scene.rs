// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Minimal host scene that drives constraint nodes.
//!
//! The scene owns a transform hierarchy, a shared clock, and the constraint
//! nodes with their wiring. Every change is mapped to the node plugs it feeds
//! and checked against [`Plug::affects_output`]; stale nodes are recomputed by
//! [`Scene::evaluate`], which writes their output onto the constrained
//! object's translate channels when the evaluation produced one.
//!
//! Ordering: nodes are visited in ascending [`NodeId`] order, except that a
//! node whose inputs read an object another pending node is about to write
//! waits for that writer. Each node is evaluated at most once per pass; a node
//! re-dirtied by a later writer in the same pass stays dirty for the next one.

use std::collections::{BTreeMap, BTreeSet};

use pushpull_math::{Mat4, Vec3};
use thiserror::Error;
use tracing::{debug, trace};

use crate::eval::{Branch, ComputeFailure, EvalError};
use crate::ident::{make_node_id, make_object_id, NodeId, ObjectId};
use crate::node::ConstraintNode;
use crate::plug::{AxisMask, Plug};

/// Clock value of a fresh scene.
pub const DEFAULT_TIME: f64 = 1.0;

/// Errors emitted by scene operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// No transform with this name or id.
    #[error("unknown object: {0}")]
    UnknownObject(String),
    /// No constraint node with this name or id.
    #[error("unknown node: {0}")]
    UnknownNode(String),
    /// A transform or node with this name already exists.
    #[error("name already in use: {0}")]
    DuplicateName(String),
    /// Reparenting would make an object its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    ParentCycle {
        /// Object being reparented.
        child: String,
        /// Requested parent.
        parent: String,
    },
    /// The object still has children.
    #[error("object {0} has children")]
    HasChildren(String),
    /// The object is the target or constrained object of a node.
    #[error("object {object} is wired to node {node}")]
    InUse {
        /// Object name.
        object: String,
        /// Node name.
        node: String,
    },
}

/// A transform in the scene: local translation plus a rotation/scale basis,
/// optionally parented to another transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRecord {
    name: String,
    parent: Option<ObjectId>,
    translation: Vec3,
    basis: Mat4,
}

impl TransformRecord {
    /// Object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent object, if any.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Local translation (parent space).
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Rotation/scale block; its translation column is always zero.
    pub fn basis(&self) -> Mat4 {
        self.basis
    }

    /// Local matrix `T * B`.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * self.basis
    }
}

/// Connections of one constraint node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConstraintWiring {
    /// Object whose world matrix feeds `targetWorldMatrix`.
    pub target: ObjectId,
    /// Object whose parent matrix feeds `constraintParentMatrix` and whose
    /// translate channels receive the output.
    pub constrained: ObjectId,
    /// Translate channels driven by the output.
    pub axes: AxisMask,
}

impl ConstraintWiring {
    /// Output plugs connected to the constrained object.
    pub fn output_plugs(&self) -> Vec<Plug> {
        self.axes.output_plugs()
    }
}

#[derive(Debug, Clone)]
struct NodeSlot {
    node: ConstraintNode,
    wiring: Option<ConstraintWiring>,
    dirty: bool,
}

impl NodeSlot {
    /// Records a change to `plug`; the node goes stale if the plug feeds its
    /// output.
    fn touch(&mut self, plug: Plug) {
        if plug.affects_output() {
            self.dirty = true;
        }
    }

    fn touch_authored(&mut self) {
        for plug in Plug::AUTHORED {
            self.touch(plug);
        }
    }
}

/// Outcome of one node during [`Scene::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    /// Evaluated node.
    pub node: NodeId,
    /// Branch taken, or the failure that left the node untouched.
    pub outcome: Result<Branch, ComputeFailure>,
}

/// Per-pass evaluation summary, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalReport {
    /// One entry per evaluated node.
    pub entries: Vec<NodeReport>,
}

impl EvalReport {
    /// Outcome recorded for `node`, if it was evaluated.
    pub fn outcome(&self, node: NodeId) -> Option<&Result<Branch, ComputeFailure>> {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .map(|e| &e.outcome)
    }

    /// Number of failed evaluations.
    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_err()).count()
    }

    /// Number of evaluated nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was evaluated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Transform hierarchy, clock, and constraint nodes.
#[derive(Debug, Clone)]
pub struct Scene {
    time: f64,
    objects: BTreeMap<ObjectId, TransformRecord>,
    nodes: BTreeMap<NodeId, NodeSlot>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene with the clock at [`DEFAULT_TIME`].
    pub fn new() -> Self {
        Self {
            time: DEFAULT_TIME,
            objects: BTreeMap::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Current clock value.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Moves the clock. Every node reads time, so all nodes become dirty.
    pub fn set_time(&mut self, time: f64) {
        if time.to_bits() == self.time.to_bits() {
            return;
        }
        self.time = time;
        for slot in self.nodes.values_mut() {
            slot.touch(Plug::InTime);
        }
    }

    // ── Transforms ─────────────────────────────────────────────────────

    /// Adds a transform named `name` under `parent` with an identity basis.
    ///
    /// # Errors
    /// [`SceneError::DuplicateName`] if the name is taken and
    /// [`SceneError::UnknownObject`] if `parent` does not exist.
    pub fn add_transform(
        &mut self,
        name: &str,
        parent: Option<ObjectId>,
        translation: Vec3,
    ) -> Result<ObjectId, SceneError> {
        let id = make_object_id(name);
        if self.objects.contains_key(&id) {
            return Err(SceneError::DuplicateName(name.to_owned()));
        }
        if let Some(p) = parent {
            self.record(p)?;
        }
        self.objects.insert(
            id,
            TransformRecord {
                name: name.to_owned(),
                parent,
                translation,
                basis: Mat4::identity(),
            },
        );
        Ok(id)
    }

    /// Removes a leaf transform that no node is wired to.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`], [`SceneError::HasChildren`], or
    /// [`SceneError::InUse`].
    pub fn remove_transform(&mut self, id: ObjectId) -> Result<TransformRecord, SceneError> {
        let name = self.record(id)?.name.clone();
        if self.objects.values().any(|r| r.parent == Some(id)) {
            return Err(SceneError::HasChildren(name));
        }
        if let Some(slot) = self.nodes.values().find(|slot| {
            slot.wiring
                .is_some_and(|w| w.target == id || w.constrained == id)
        }) {
            return Err(SceneError::InUse {
                object: name,
                node: slot.node.name().to_owned(),
            });
        }
        self.objects
            .remove(&id)
            .ok_or_else(|| SceneError::UnknownObject(id.short()))
    }

    /// Looks up a transform by name.
    pub fn object_id(&self, name: &str) -> Option<ObjectId> {
        let id = make_object_id(name);
        self.objects.contains_key(&id).then_some(id)
    }

    /// Transform record for `id`.
    pub fn object(&self, id: ObjectId) -> Option<&TransformRecord> {
        self.objects.get(&id)
    }

    /// All transforms in id order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &TransformRecord)> {
        self.objects.iter().map(|(id, r)| (*id, r))
    }

    /// Reparents `child`; the local transform is kept, so the world position
    /// moves with the new parent.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`] or [`SceneError::ParentCycle`].
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> Result<(), SceneError> {
        let child_name = self.record(child)?.name.clone();
        if let Some(p) = parent {
            let parent_name = self.record(p)?.name.clone();
            if self.is_ancestor_or_self(child, p) {
                return Err(SceneError::ParentCycle {
                    child: child_name,
                    parent: parent_name,
                });
            }
        }
        let record = self.record_mut(child)?;
        if record.parent == parent {
            return Ok(());
        }
        record.parent = parent;
        self.mark_dependents(child, None);
        let reparented: Vec<(NodeId, Plug)> = self
            .nodes
            .iter()
            .filter(|(_, slot)| slot.wiring.is_some_and(|w| w.constrained == child))
            .map(|(id, _)| (*id, Plug::ConstraintParentMatrix))
            .collect();
        self.touch_inputs(reparented);
        Ok(())
    }

    /// Sets the local translation of `id`.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`].
    pub fn set_translation(&mut self, id: ObjectId, translation: Vec3) -> Result<(), SceneError> {
        let record = self.record_mut(id)?;
        if record.translation == translation {
            return Ok(());
        }
        record.translation = translation;
        self.mark_dependents(id, None);
        Ok(())
    }

    /// Sets the rotation/scale block of `id`; any translation in `basis` is
    /// dropped.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`].
    pub fn set_basis(&mut self, id: ObjectId, basis: Mat4) -> Result<(), SceneError> {
        let basis = basis.with_translation(Vec3::ZERO);
        let record = self.record_mut(id)?;
        if record.basis == basis {
            return Ok(());
        }
        record.basis = basis;
        self.mark_dependents(id, None);
        Ok(())
    }

    /// Local translation of `id`.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`].
    pub fn translation(&self, id: ObjectId) -> Result<Vec3, SceneError> {
        Ok(self.record(id)?.translation)
    }

    /// World matrix of `id`: `parent_world * local`.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`].
    pub fn world_matrix(&self, id: ObjectId) -> Result<Mat4, SceneError> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let record = self.record(current)?;
            chain.push(record.local_matrix());
            cursor = record.parent;
        }
        Ok(chain
            .iter()
            .rev()
            .fold(Mat4::identity(), |acc, local| acc * *local))
    }

    /// World matrix of the parent of `id`, or identity for a root object.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`].
    pub fn parent_matrix(&self, id: ObjectId) -> Result<Mat4, SceneError> {
        match self.record(id)?.parent {
            Some(parent) => self.world_matrix(parent),
            None => Ok(Mat4::identity()),
        }
    }

    /// World-space position of `id`.
    ///
    /// # Errors
    /// [`SceneError::UnknownObject`].
    pub fn world_position(&self, id: ObjectId) -> Result<Vec3, SceneError> {
        Ok(self.world_matrix(id)?.translation_part())
    }

    // ── Nodes ──────────────────────────────────────────────────────────

    /// Stores a node; it starts dirty and unwired.
    ///
    /// # Errors
    /// [`SceneError::DuplicateName`] if a node with the same name exists.
    pub fn insert_node(&mut self, node: ConstraintNode) -> Result<NodeId, SceneError> {
        let id = make_node_id(node.name());
        if self.nodes.contains_key(&id) {
            return Err(SceneError::DuplicateName(node.name().to_owned()));
        }
        self.nodes.insert(
            id,
            NodeSlot {
                node,
                wiring: None,
                dirty: true,
            },
        );
        Ok(id)
    }

    /// Removes a node together with its connections.
    ///
    /// # Errors
    /// [`SceneError::UnknownNode`].
    pub fn remove_node(
        &mut self,
        id: NodeId,
    ) -> Result<(ConstraintNode, Option<ConstraintWiring>), SceneError> {
        self.nodes
            .remove(&id)
            .map(|slot| (slot.node, slot.wiring))
            .ok_or_else(|| SceneError::UnknownNode(id.short()))
    }

    /// Looks up a node by name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        let id = make_node_id(name);
        self.nodes.contains_key(&id).then_some(id)
    }

    /// Node stored under `id`.
    pub fn node(&self, id: NodeId) -> Option<&ConstraintNode> {
        self.nodes.get(&id).map(|slot| &slot.node)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ConstraintNode)> {
        self.nodes.iter().map(|(id, slot)| (*id, &slot.node))
    }

    /// Mutable access to a node. The node is marked dirty up front, since any
    /// authored attribute affects its output.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ConstraintNode> {
        self.nodes.get_mut(&id).map(|slot| {
            slot.touch_authored();
            &mut slot.node
        })
    }

    /// Edits a node's authored attributes and marks it dirty.
    ///
    /// # Errors
    /// [`SceneError::UnknownNode`].
    pub fn edit_node<R>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut ConstraintNode) -> R,
    ) -> Result<R, SceneError> {
        let slot = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| SceneError::UnknownNode(id.short()))?;
        slot.touch_authored();
        Ok(edit(&mut slot.node))
    }

    /// `true` when the node's output is stale.
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|slot| slot.dirty)
    }

    /// First free name of the form `{base}{n}`, starting at 1.
    pub fn unique_node_name(&self, base: &str) -> String {
        (1_u64..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.nodes.contains_key(&make_node_id(candidate)))
            .unwrap_or_else(|| base.to_owned())
    }

    /// Wires a node to its target and constrained objects, replacing any
    /// previous wiring.
    ///
    /// # Errors
    /// [`SceneError::UnknownNode`] or [`SceneError::UnknownObject`].
    pub fn connect(&mut self, id: NodeId, wiring: ConstraintWiring) -> Result<(), SceneError> {
        self.record(wiring.target)?;
        self.record(wiring.constrained)?;
        let slot = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| SceneError::UnknownNode(id.short()))?;
        slot.wiring = Some(wiring);
        slot.touch(Plug::TargetWorldMatrix);
        slot.touch(Plug::ConstraintParentMatrix);
        Ok(())
    }

    /// Drops a node's connections, returning them. An unwired node is skipped
    /// by [`Scene::evaluate`] and leaves its former constrained object alone.
    ///
    /// # Errors
    /// [`SceneError::UnknownNode`].
    pub fn disconnect(&mut self, id: NodeId) -> Result<Option<ConstraintWiring>, SceneError> {
        let slot = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| SceneError::UnknownNode(id.short()))?;
        Ok(slot.wiring.take())
    }

    /// Connections of `id`, if wired.
    pub fn wiring(&self, id: NodeId) -> Option<&ConstraintWiring> {
        self.nodes.get(&id).and_then(|slot| slot.wiring.as_ref())
    }

    // ── Evaluation ─────────────────────────────────────────────────────

    /// Recomputes every dirty, wired node and pushes its output onto the
    /// driven translate channels.
    ///
    /// Compute failures are logged by the node, recorded in the report, and
    /// leave both the node and the constrained object untouched.
    pub fn evaluate(&mut self) -> EvalReport {
        let mut report = EvalReport::default();
        let mut visited = BTreeSet::new();
        loop {
            let pending: Vec<(NodeId, ConstraintWiring)> = self
                .nodes
                .iter()
                .filter(|(id, slot)| slot.dirty && !visited.contains(*id))
                .filter_map(|(id, slot)| slot.wiring.map(|w| (*id, w)))
                .collect();
            let Some(&(first, _)) = pending.first() else {
                break;
            };
            let next = pending
                .iter()
                .find(|(id, wiring)| {
                    !pending.iter().any(|(other, other_wiring)| {
                        other != id && self.reads(wiring, other_wiring.constrained)
                    })
                })
                .map_or(first, |(id, _)| *id);
            visited.insert(next);
            if let Some(entry) = self.evaluate_node(next) {
                report.entries.push(entry);
            }
        }
        report
    }

    fn evaluate_node(&mut self, id: NodeId) -> Option<NodeReport> {
        let wiring = self.nodes.get(&id)?.wiring?;
        let inputs = self
            .world_matrix(wiring.target)
            .and_then(|t| Ok((t, self.parent_matrix(wiring.constrained)?)));
        let time = self.time;
        let slot = self.nodes.get_mut(&id)?;
        slot.dirty = false;
        let Ok((target_world, parent_world)) = inputs else {
            debug!(node = %slot.node.name(), "wired object missing; skipping");
            return None;
        };

        let evaluation = match slot
            .node
            .compute(Plug::ConstraintTranslate, time, target_world, parent_world)
        {
            Ok(evaluation) => evaluation,
            Err(EvalError::ComputeFailure(failure)) => {
                return Some(NodeReport {
                    node: id,
                    outcome: Err(failure),
                })
            }
            Err(EvalError::NotHandled(plug)) => {
                trace!(%plug, "output not handled");
                return None;
            }
        };

        if let Some(output) = evaluation.output {
            self.write_channels(id, wiring, output);
        }
        Some(NodeReport {
            node: id,
            outcome: Ok(evaluation.branch),
        })
    }

    fn write_channels(&mut self, writer: NodeId, wiring: ConstraintWiring, output: Vec3) {
        let Some(record) = self.objects.get_mut(&wiring.constrained) else {
            return;
        };
        let mut translation = record.translation;
        for axis in wiring.axes.axes() {
            let i = axis.index();
            translation = translation.with_component(i, output.to_array()[i]);
        }
        if translation != record.translation {
            record.translation = translation;
            self.mark_dependents(wiring.constrained, Some(writer));
        }
    }

    /// Input plugs of a node wired as `wiring` whose value follows the world
    /// transform of `object`.
    fn inputs_reading(&self, wiring: &ConstraintWiring, object: ObjectId) -> Vec<Plug> {
        let mut plugs = Vec::new();
        if self.is_ancestor_or_self(object, wiring.target) {
            plugs.push(Plug::TargetWorldMatrix);
        }
        if self
            .objects
            .get(&wiring.constrained)
            .and_then(|r| r.parent)
            .is_some_and(|parent| self.is_ancestor_or_self(object, parent))
        {
            plugs.push(Plug::ConstraintParentMatrix);
        }
        plugs
    }

    fn reads(&self, wiring: &ConstraintWiring, object: ObjectId) -> bool {
        !self.inputs_reading(wiring, object).is_empty()
    }

    fn mark_dependents(&mut self, changed: ObjectId, except: Option<NodeId>) {
        let changes: Vec<(NodeId, Plug)> = self
            .nodes
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .filter_map(|(id, slot)| slot.wiring.map(|w| (*id, w)))
            .flat_map(|(id, wiring)| {
                self.inputs_reading(&wiring, changed)
                    .into_iter()
                    .map(move |plug| (id, plug))
            })
            .collect();
        self.touch_inputs(changes);
    }

    fn touch_inputs(&mut self, changes: Vec<(NodeId, Plug)>) {
        for (id, plug) in changes {
            if let Some(slot) = self.nodes.get_mut(&id) {
                slot.touch(plug);
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ObjectId, object: ObjectId) -> bool {
        let mut cursor = Some(object);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.objects.get(&current).and_then(|r| r.parent);
        }
        false
    }

    fn record(&self, id: ObjectId) -> Result<&TransformRecord, SceneError> {
        self.objects
            .get(&id)
            .ok_or_else(|| SceneError::UnknownObject(id.short()))
    }

    fn record_mut(&mut self, id: ObjectId) -> Result<&mut TransformRecord, SceneError> {
        self.objects
            .get_mut(&id)
            .ok_or_else(|| SceneError::UnknownObject(id.short()))
    }
}
