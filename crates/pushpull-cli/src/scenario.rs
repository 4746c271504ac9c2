// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON scenario files: a transform hierarchy with translation keys, a set of
//! constraints to create, and the frame range to step through.

use std::collections::BTreeMap;

use anyhow::{bail, ensure, Context, Result};
use pushpull_core::{
    Branch, ConstraintSettings, CreateConstraint, NodeId, ObjectId, Scene, Vec3,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scenario as read from disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Transforms, parents before children.
    pub objects: Vec<ObjectSpec>,
    /// Constraints to create once the objects exist.
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    /// Frames to evaluate.
    pub frames: FrameRange,
}

/// One transform.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    /// Unique name.
    pub name: String,
    /// Parent transform name.
    #[serde(default)]
    pub parent: Option<String>,
    /// Initial local translation.
    #[serde(default)]
    pub translation: [f64; 3],
    /// Uniform scale of the local basis.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Animated local translation; overrides `translation` on every frame.
    #[serde(default)]
    pub keys: Vec<Key>,
}

/// Translation key.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Key {
    /// Frame of the key.
    pub frame: f64,
    /// Local translation at that frame.
    pub translation: [f64; 3],
}

/// Arguments of one creation command.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSpec {
    /// `[target, constrained]`.
    pub objects: Vec<String>,
    /// Node name.
    #[serde(default)]
    pub name: Option<String>,
    /// Target separation; defaults to the initial world distance.
    #[serde(default)]
    pub distance: Option<f64>,
    /// Activation frame; defaults to the first simulated frame.
    #[serde(default)]
    pub start_frame: Option<f64>,
    /// Rest position; defaults to the constrained object's translation.
    #[serde(default)]
    pub start_position: Option<[f64; 3]>,
    /// Translate channels left unconnected (`x`, `y`, `z`).
    #[serde(default)]
    pub skip: Vec<String>,
    /// Overrides the preference default.
    #[serde(default)]
    pub push: Option<bool>,
    /// Overrides the preference default.
    #[serde(default)]
    pub pull: Option<bool>,
}

/// Upper bound on the number of frames one scenario may simulate.
pub const MAX_FRAMES: u32 = 1_000_000;

/// Inclusive frame range.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameRange {
    /// First frame.
    pub start: f64,
    /// Last frame, included when reached exactly.
    pub end: f64,
    /// Increment between frames.
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_step() -> f64 {
    1.0
}

impl FrameRange {
    /// Frame values from `start` to `end`.
    pub fn frames(&self) -> Result<Vec<f64>> {
        ensure!(
            self.step.is_finite() && self.step > 0.0,
            "frame step must be positive, got {}",
            self.step
        );
        ensure!(
            self.start.is_finite() && self.end.is_finite(),
            "frame range must be finite"
        );
        ensure!(
            (self.end - self.start) / self.step < f64::from(MAX_FRAMES),
            "frame range {}..{} step {} exceeds {MAX_FRAMES} frames",
            self.start,
            self.end,
            self.step
        );
        let mut frames = Vec::new();
        for i in 0..=MAX_FRAMES {
            let frame = self.step.mul_add(f64::from(i), self.start);
            if frame > self.end + self.step * 1e-9 {
                return Ok(frames);
            }
            ensure!(i < MAX_FRAMES, "frame range exceeds {MAX_FRAMES} frames");
            frames.push(frame);
        }
        Ok(frames)
    }
}

impl Scenario {
    /// Parses a scenario from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut scenario: Self = serde_json::from_str(text).context("parse scenario JSON")?;
        for object in &mut scenario.objects {
            object.keys.sort_by(|a, b| a.frame.total_cmp(&b.frame));
        }
        Ok(scenario)
    }
}

/// Linear interpolation through `keys` (sorted by frame), holding the first
/// and last values outside their range.
pub fn sample(keys: &[Key], frame: f64) -> Option<Vec3> {
    let first = keys.first()?;
    let last = keys.last()?;
    if frame <= first.frame {
        return Some(Vec3::from(first.translation));
    }
    if frame >= last.frame {
        return Some(Vec3::from(last.translation));
    }
    keys.windows(2).find_map(|pair| {
        let (a, b) = (pair[0], pair[1]);
        if frame < a.frame || frame > b.frame {
            return None;
        }
        let span = b.frame - a.frame;
        if span <= 0.0 {
            return Some(Vec3::from(b.translation));
        }
        let t = (frame - a.frame) / span;
        let from = Vec3::from(a.translation);
        let to = Vec3::from(b.translation);
        Some(from + (to - from) * t)
    })
}

/// Per-frame output record, one JSON line each.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameRecord {
    /// Scene time.
    pub frame: f64,
    /// Object name to positions.
    pub objects: BTreeMap<String, ObjectState>,
    /// Constraint name to state.
    pub constraints: BTreeMap<String, ConstraintState>,
}

/// Object positions after evaluation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ObjectState {
    /// Local translation.
    pub translate: [f64; 3],
    /// World position.
    pub world: [f64; 3],
}

/// Constraint state after evaluation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConstraintState {
    /// Branch taken this frame; absent when the node was clean.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Failure reason, if the compute failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Current output, parent space.
    pub output: [f64; 3],
}

/// A built scene plus the keyed objects to drive each frame.
#[derive(Debug)]
pub struct Simulation {
    scene: Scene,
    animated: Vec<(ObjectId, Vec<Key>)>,
    nodes: Vec<NodeId>,
}

impl Simulation {
    /// Builds the hierarchy, poses it at the first frame, then runs every
    /// creation command against that pose.
    pub fn build(scenario: &Scenario, base: ConstraintSettings) -> Result<Self> {
        let mut scene = Scene::new();
        let mut animated = Vec::new();
        for object in &scenario.objects {
            let parent = match &object.parent {
                Some(name) => Some(scene.object_id(name).with_context(|| {
                    format!("{}: parent {name} must be declared first", object.name)
                })?),
                None => None,
            };
            let id = scene
                .add_transform(&object.name, parent, Vec3::from(object.translation))
                .with_context(|| format!("add object {}", object.name))?;
            if let Some(s) = object.scale {
                scene.set_basis(id, pushpull_core::Mat4::scale(s, s, s))?;
            }
            if !object.keys.is_empty() {
                animated.push((id, object.keys.clone()));
            }
        }

        let first = scenario.frames.start;
        scene.set_time(first);
        for (id, keys) in &animated {
            if let Some(t) = sample(keys, first) {
                scene.set_translation(*id, t)?;
            }
        }

        let mut nodes = Vec::new();
        for spec in &scenario.constraints {
            let mut cmd = command_for(spec, base)?;
            let id = cmd
                .do_it(&mut scene)
                .with_context(|| format!("create constraint on {:?}", spec.objects))?;
            nodes.push(id);
        }
        debug!(
            objects = scenario.objects.len(),
            constraints = nodes.len(),
            "scenario built"
        );
        Ok(Self {
            scene,
            animated,
            nodes,
        })
    }

    /// Scene being driven.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Poses keyed objects, moves the clock, evaluates, and reports.
    pub fn step(&mut self, frame: f64) -> Result<FrameRecord> {
        for (id, keys) in &self.animated {
            if let Some(t) = sample(keys, frame) {
                self.scene.set_translation(*id, t)?;
            }
        }
        self.scene.set_time(frame);
        let report = self.scene.evaluate();

        let mut objects = BTreeMap::new();
        for (id, record) in self.scene.objects() {
            objects.insert(
                record.name().to_owned(),
                ObjectState {
                    translate: record.translation().to_array(),
                    world: self.scene.world_position(id)?.to_array(),
                },
            );
        }

        let mut constraints = BTreeMap::new();
        for id in &self.nodes {
            let Some(node) = self.scene.node(*id) else {
                continue;
            };
            let (branch, failure) = match report.outcome(*id) {
                Some(Ok(branch)) => (Some(branch_name(*branch).to_owned()), None),
                Some(Err(failure)) => (None, Some(failure.to_string())),
                None => (None, None),
            };
            constraints.insert(
                node.name().to_owned(),
                ConstraintState {
                    branch,
                    failure,
                    output: node.output().to_array(),
                },
            );
        }
        Ok(FrameRecord {
            frame,
            objects,
            constraints,
        })
    }
}

fn command_for(spec: &ConstraintSpec, base: ConstraintSettings) -> Result<CreateConstraint> {
    let mut cmd = CreateConstraint::from_objects(spec.objects.iter().cloned())?.base_settings(
        ConstraintSettings {
            push: spec.push.unwrap_or(base.push),
            pull: spec.pull.unwrap_or(base.pull),
            ..base
        },
    );
    if let Some(name) = &spec.name {
        cmd = cmd.name(name.clone());
    }
    if let Some(d) = spec.distance {
        cmd = cmd.distance(d);
    }
    if let Some(f) = spec.start_frame {
        cmd = cmd.start_frame(f);
    }
    if let Some(p) = spec.start_position {
        cmd = cmd.start_position(Vec3::from(p));
    }
    for axis in &spec.skip {
        cmd = cmd.skip_named(axis)?;
    }
    Ok(cmd)
}

fn branch_name(branch: Branch) -> &'static str {
    match branch {
        Branch::Reset => "reset",
        Branch::Inactive => "inactive",
        Branch::Satisfied => "satisfied",
        Branch::Corrected => "corrected",
        Branch::Degenerate => "degenerate",
    }
}

/// Rejects scenarios that would fail half way through a run.
pub fn validate(scenario: &Scenario) -> Result<()> {
    if scenario.objects.is_empty() {
        bail!("scenario declares no objects");
    }
    scenario.frames.frames()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PULL: &str = r#"{
        "objects": [
            { "name": "target",
              "keys": [ { "frame": 1, "translation": [0, 0, 0] },
                        { "frame": 5, "translation": [8, 0, 0] } ] },
            { "name": "follower", "translation": [-4, 0, 0] }
        ],
        "constraints": [ { "objects": ["target", "follower"], "push": false } ],
        "frames": { "start": 1, "end": 5 }
    }"#;

    #[test]
    fn keys_interpolate_and_hold() {
        let keys = [
            Key {
                frame: 0.0,
                translation: [0.0, 0.0, 0.0],
            },
            Key {
                frame: 10.0,
                translation: [10.0, -20.0, 0.0],
            },
        ];
        assert_eq!(sample(&keys, 2.5), Some(Vec3::new(2.5, -5.0, 0.0)));
        assert_eq!(sample(&keys, -1.0), Some(Vec3::ZERO));
        assert_eq!(sample(&keys, 99.0), Some(Vec3::new(10.0, -20.0, 0.0)));
        assert_eq!(sample(&[], 1.0), None);
    }

    #[test]
    fn frame_range_includes_end() {
        let range = FrameRange {
            start: 1.0,
            end: 2.0,
            step: 0.25,
        };
        assert_eq!(range.frames().expect("frames"), vec![1.0, 1.25, 1.5, 1.75, 2.0]);
        let bad = FrameRange {
            step: 0.0,
            ..range
        };
        assert!(bad.frames().is_err());
    }

    #[test]
    fn oversized_frame_range_is_rejected() {
        let range = FrameRange {
            start: 1.0,
            end: 1000.0,
            step: 1e-6,
        };
        let err = range.frames().unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");

        let backwards = FrameRange {
            start: 5.0,
            end: 1.0,
            step: 1.0,
        };
        assert!(backwards.frames().expect("frames").is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Scenario::from_json(r#"{"objects": [], "frames": {"start": 1, "end": 2}, "extra": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn follower_is_dragged_behind_target() {
        let scenario = Scenario::from_json(PULL).expect("parse");
        validate(&scenario).expect("valid");
        let mut sim = Simulation::build(&scenario, ConstraintSettings::default()).expect("build");
        let mut last = None;
        for frame in scenario.frames.frames().expect("frames") {
            last = Some(sim.step(frame).expect("step"));
        }
        let last = last.expect("at least one frame");
        // Distance defaults to 4; target ends at x = 8.
        assert_eq!(last.objects["follower"].world, [4.0, 0.0, 0.0]);
        let state = &last.constraints["pushPullConstraint1"];
        assert_eq!(state.branch.as_deref(), Some("corrected"));
        assert_eq!(state.output, [4.0, 0.0, 0.0]);
    }

    #[test]
    fn undeclared_parent_is_an_error() {
        let scenario = Scenario::from_json(
            r#"{"objects": [{"name": "a", "parent": "b"}], "frames": {"start": 1, "end": 1}}"#,
        )
        .expect("parse");
        assert!(Simulation::build(&scenario, ConstraintSettings::default()).is_err());
    }
}
