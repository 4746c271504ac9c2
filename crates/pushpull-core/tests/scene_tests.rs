// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use pushpull_core::{
    make_node_id, Axis, AxisMask, Branch, ComputeFailure, ConstraintNode, ConstraintSettings,
    ConstraintWiring, Mat4, Scene, SceneError, Vec3,
};

struct Rig {
    scene: Scene,
    target: pushpull_core::ObjectId,
    follower: pushpull_core::ObjectId,
    node: pushpull_core::NodeId,
}

/// Target at the origin, follower ten units out on X, pull-only constraint of
/// length five active from frame 1.
fn rig(axes: AxisMask) -> Rig {
    let mut scene = Scene::new();
    let target = scene
        .add_transform("target", None, Vec3::ZERO)
        .expect("add target");
    let follower = scene
        .add_transform("follower", None, Vec3::new(10.0, 0.0, 0.0))
        .expect("add follower");
    let node = scene
        .insert_node(ConstraintNode::new(
            "c1",
            ConstraintSettings {
                distance: 5.0,
                start_frame: 1.0,
                start_position: Vec3::new(10.0, 0.0, 0.0),
                push: false,
                pull: true,
                ..ConstraintSettings::default()
            },
        ))
        .expect("insert node");
    scene
        .connect(
            node,
            ConstraintWiring {
                target,
                constrained: follower,
                axes,
            },
        )
        .expect("connect");
    Rig {
        scene,
        target,
        follower,
        node,
    }
}

#[test]
fn new_scene_clock_starts_at_one() {
    assert_eq!(Scene::new().time(), 1.0);
}

#[test]
fn world_matrix_composes_parent_chain() {
    let mut scene = Scene::new();
    let root = scene
        .add_transform("root", None, Vec3::new(1.0, 0.0, 0.0))
        .expect("root");
    let child = scene
        .add_transform("child", Some(root), Vec3::new(0.0, 2.0, 0.0))
        .expect("child");
    let leaf = scene
        .add_transform("leaf", Some(child), Vec3::new(0.0, 0.0, 3.0))
        .expect("leaf");
    scene
        .set_basis(root, Mat4::scale(2.0, 2.0, 2.0))
        .expect("scale root");

    assert_eq!(
        scene.world_position(leaf).expect("leaf"),
        Vec3::new(1.0, 4.0, 6.0)
    );
    assert_eq!(
        scene.parent_matrix(leaf).expect("parent").translation_part(),
        Vec3::new(1.0, 4.0, 0.0)
    );
    assert_eq!(scene.parent_matrix(root).expect("root"), Mat4::identity());
}

#[test]
fn duplicate_and_unknown_names_are_rejected() {
    let mut scene = Scene::new();
    let a = scene.add_transform("a", None, Vec3::ZERO).expect("a");
    assert_eq!(
        scene.add_transform("a", None, Vec3::ZERO),
        Err(SceneError::DuplicateName("a".into()))
    );
    let ghost = pushpull_core::make_object_id("ghost");
    assert!(matches!(
        scene.add_transform("b", Some(ghost), Vec3::ZERO),
        Err(SceneError::UnknownObject(_))
    ));
    assert_eq!(scene.object_id("a"), Some(a));
    assert_eq!(scene.object_id("ghost"), None);
}

#[test]
fn parenting_cycles_are_rejected() {
    let mut scene = Scene::new();
    let a = scene.add_transform("a", None, Vec3::ZERO).expect("a");
    let b = scene.add_transform("b", Some(a), Vec3::ZERO).expect("b");
    let err = scene.set_parent(a, Some(b)).unwrap_err();
    assert!(matches!(err, SceneError::ParentCycle { .. }));
    assert!(matches!(
        scene.set_parent(a, Some(a)),
        Err(SceneError::ParentCycle { .. })
    ));
    scene.set_parent(b, None).expect("unparent");
    scene.set_parent(a, Some(b)).expect("now legal");
}

#[test]
fn wired_and_parent_objects_cannot_be_removed() {
    let mut rig = rig(AxisMask::ALL);
    assert!(matches!(
        rig.scene.remove_transform(rig.target),
        Err(SceneError::InUse { .. })
    ));
    let child = rig
        .scene
        .add_transform("kid", Some(rig.target), Vec3::ZERO)
        .expect("kid");
    rig.scene.remove_node(rig.node).expect("remove node");
    assert!(matches!(
        rig.scene.remove_transform(rig.target),
        Err(SceneError::HasChildren(_))
    ));
    rig.scene.remove_transform(child).expect("leaf removed");
    rig.scene.remove_transform(rig.target).expect("target removed");
}

#[test]
fn evaluate_pulls_follower_and_writes_translate() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(2.0);
    let report = rig.scene.evaluate();
    assert_eq!(report.outcome(rig.node), Some(&Ok(Branch::Corrected)));
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(5.0, 0.0, 0.0)
    );
    let node = rig.scene.node(rig.node).expect("node");
    assert_eq!(node.last_position(), Vec3::new(5.0, 0.0, 0.0));
    assert!(!rig.scene.is_dirty(rig.node));
}

#[test]
fn writing_own_output_does_not_redirty() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(2.0);
    assert_eq!(rig.scene.evaluate().len(), 1);
    assert!(rig.scene.evaluate().is_empty());
}

#[test]
fn scrubbing_before_start_frame_snaps_back() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(5.0);
    rig.scene.evaluate();
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(5.0, 0.0, 0.0)
    );

    rig.scene.set_time(0.0);
    let report = rig.scene.evaluate();
    assert_eq!(report.outcome(rig.node), Some(&Ok(Branch::Reset)));
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(10.0, 0.0, 0.0)
    );
    let node = rig.scene.node(rig.node).expect("node");
    assert_eq!(node.last_position(), Vec3::new(10.0, 0.0, 0.0));
}

#[test]
fn skipped_axes_keep_their_values() {
    let mut rig = rig(AxisMask::from_skips(&[Axis::X]));
    rig.scene.set_time(2.0);
    rig.scene.evaluate();
    // Node output is fully computed; only Y and Z are routed.
    assert_eq!(
        rig.scene.node(rig.node).expect("node").output(),
        Vec3::new(5.0, 0.0, 0.0)
    );
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(10.0, 0.0, 0.0)
    );
}

#[test]
fn moving_the_target_redirties_only_dependents() {
    let mut rig = rig(AxisMask::ALL);
    let other = rig
        .scene
        .add_transform("other", None, Vec3::new(0.0, 50.0, 0.0))
        .expect("other");
    rig.scene.set_time(2.0);
    rig.scene.evaluate();

    rig.scene
        .set_translation(other, Vec3::new(0.0, 60.0, 0.0))
        .expect("move other");
    assert!(!rig.scene.is_dirty(rig.node));

    rig.scene
        .set_translation(rig.target, Vec3::new(-10.0, 0.0, 0.0))
        .expect("move target");
    assert!(rig.scene.is_dirty(rig.node));
    rig.scene.evaluate();
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(-5.0, 0.0, 0.0)
    );
}

#[test]
fn unchanged_translation_does_not_redirty() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(2.0);
    rig.scene.evaluate();
    rig.scene
        .set_translation(rig.target, Vec3::ZERO)
        .expect("same value");
    assert!(!rig.scene.is_dirty(rig.node));
}

#[test]
fn editing_a_node_marks_it_dirty() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(2.0);
    rig.scene.evaluate();
    rig.scene
        .edit_node(rig.node, |n| n.set_distance(2.0))
        .expect("edit");
    assert!(rig.scene.is_dirty(rig.node));
    rig.scene.evaluate();
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(2.0, 0.0, 0.0)
    );
}

#[test]
fn chained_constraints_evaluate_upstream_first() {
    let mut rig = rig(AxisMask::ALL);
    let tail = rig
        .scene
        .add_transform("tail", None, Vec3::new(20.0, 0.0, 0.0))
        .expect("tail");
    // "a0" hashes independently of "c1"; ordering must come from the wiring.
    let chained = rig
        .scene
        .insert_node(ConstraintNode::new(
            "a0",
            ConstraintSettings {
                distance: 1.0,
                start_position: Vec3::new(20.0, 0.0, 0.0),
                push: false,
                ..ConstraintSettings::default()
            },
        ))
        .expect("insert");
    rig.scene
        .connect(
            chained,
            ConstraintWiring {
                target: rig.follower,
                constrained: tail,
                axes: AxisMask::ALL,
            },
        )
        .expect("connect");

    rig.scene.set_time(2.0);
    let report = rig.scene.evaluate();
    assert_eq!(report.len(), 2);
    assert_eq!(report.entries[0].node, rig.node);
    assert_eq!(
        rig.scene.translation(tail).expect("tail"),
        Vec3::new(6.0, 0.0, 0.0)
    );
    assert!(!rig.scene.is_dirty(chained));
}

#[test]
fn compute_failure_is_reported_and_leaves_object() {
    let mut scene = Scene::new();
    let target = scene.add_transform("t", None, Vec3::ZERO).expect("t");
    let parent = scene.add_transform("p", None, Vec3::ZERO).expect("p");
    scene
        .set_basis(parent, Mat4::scale(1.0, 0.0, 1.0))
        .expect("flatten parent");
    let follower = scene
        .add_transform("f", Some(parent), Vec3::new(10.0, 0.0, 0.0))
        .expect("f");
    let node = scene
        .insert_node(ConstraintNode::new(
            "c",
            ConstraintSettings {
                distance: 5.0,
                start_position: Vec3::new(10.0, 0.0, 0.0),
                ..ConstraintSettings::default()
            },
        ))
        .expect("node");
    scene
        .connect(
            node,
            ConstraintWiring {
                target,
                constrained: follower,
                axes: AxisMask::ALL,
            },
        )
        .expect("connect");

    let report = scene.evaluate();
    assert_eq!(
        report.outcome(node),
        Some(&Err(ComputeFailure::SingularParentMatrix))
    );
    assert_eq!(report.failures(), 1);
    assert_eq!(
        scene.translation(follower).expect("f"),
        Vec3::new(10.0, 0.0, 0.0)
    );
    assert!(!scene.is_dirty(node));
}

#[test]
fn unwired_nodes_are_not_evaluated() {
    let mut scene = Scene::new();
    let id = scene
        .insert_node(ConstraintNode::new("lonely", ConstraintSettings::default()))
        .expect("insert");
    assert_eq!(id, make_node_id("lonely"));
    assert!(scene.evaluate().is_empty());
    assert!(scene.is_dirty(id));
}

#[test]
fn unique_node_name_counts_up() {
    let mut scene = Scene::new();
    assert_eq!(scene.unique_node_name("pushPullConstraint"), "pushPullConstraint1");
    scene
        .insert_node(ConstraintNode::new(
            "pushPullConstraint1",
            ConstraintSettings::default(),
        ))
        .expect("insert");
    assert_eq!(scene.unique_node_name("pushPullConstraint"), "pushPullConstraint2");
}

#[test]
fn reparenting_the_constrained_object_redirties_its_node() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(2.0);
    rig.scene.evaluate();
    assert!(!rig.scene.is_dirty(rig.node));

    let carrier = rig
        .scene
        .add_transform("carrier", None, Vec3::new(100.0, 0.0, 0.0))
        .expect("carrier");
    rig.scene
        .set_parent(rig.follower, Some(carrier))
        .expect("reparent");
    assert!(rig.scene.is_dirty(rig.node));

    let report = rig.scene.evaluate();
    assert_eq!(report.outcome(rig.node), Some(&Ok(Branch::Corrected)));
    let gap = rig
        .scene
        .world_position(rig.follower)
        .expect("follower")
        .distance(&rig.scene.world_position(rig.target).expect("target"));
    assert!((gap - 5.0).abs() < 1e-9, "gap {gap}");
}

#[test]
fn reparenting_to_the_same_parent_is_a_no_op() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(2.0);
    rig.scene.evaluate();
    rig.scene.set_parent(rig.follower, None).expect("same parent");
    assert!(!rig.scene.is_dirty(rig.node));
}

#[test]
fn inactive_constraint_leaves_manual_translation_alone() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene
        .edit_node(rig.node, |n| n.set_pull_enabled(false))
        .expect("disable pull");
    rig.scene
        .set_translation(rig.follower, Vec3::new(7.0, 0.0, 0.0))
        .expect("manual move");
    rig.scene.set_time(3.0);

    let report = rig.scene.evaluate();
    assert_eq!(report.outcome(rig.node), Some(&Ok(Branch::Inactive)));
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(7.0, 0.0, 0.0)
    );
}

#[test]
fn satisfied_constraint_leaves_manual_translation_alone() {
    let mut rig = rig(AxisMask::ALL);
    rig.scene.set_time(2.0);
    rig.scene.evaluate();

    // The memo sits five units out, so the pull is satisfied and writes nothing.
    rig.scene
        .set_translation(rig.follower, Vec3::new(30.0, 0.0, 0.0))
        .expect("manual move");
    rig.scene.set_time(3.0);
    let report = rig.scene.evaluate();
    assert_eq!(report.outcome(rig.node), Some(&Ok(Branch::Satisfied)));
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(30.0, 0.0, 0.0)
    );
}

#[test]
fn disconnected_node_is_skipped() {
    let mut rig = rig(AxisMask::ALL);
    let wiring = rig.scene.disconnect(rig.node).expect("disconnect");
    assert_eq!(wiring.map(|w| w.constrained), Some(rig.follower));
    assert!(rig.scene.wiring(rig.node).is_none());

    rig.scene.set_time(2.0);
    assert!(rig.scene.evaluate().is_empty());
    assert_eq!(
        rig.scene.translation(rig.follower).expect("follower"),
        Vec3::new(10.0, 0.0, 0.0)
    );
    assert_eq!(rig.scene.disconnect(rig.node), Ok(None));
}
