// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use pushpull_core::{
    Axis, AxisMask, CommandError, ConstraintSettings, CreateConstraint, DegeneratePolicy, Scene,
    SceneError, Vec3,
};

fn scene() -> Scene {
    let mut scene = Scene::new();
    let parent = scene
        .add_transform("rig", None, Vec3::new(0.0, 1.0, 0.0))
        .expect("rig");
    scene
        .add_transform("target", None, Vec3::new(3.0, 0.0, 0.0))
        .expect("target");
    scene
        .add_transform("follower", Some(parent), Vec3::new(0.0, 3.0, 0.0))
        .expect("follower");
    scene.set_time(12.0);
    scene
}

#[test]
fn defaults_are_derived_from_the_scene() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "follower");
    let id = cmd.do_it(&mut scene).expect("created");

    // follower world = (0, 4, 0); target world = (3, 0, 0).
    let node = scene.node(id).expect("node");
    assert_eq!(node.name(), "pushPullConstraint1");
    assert_eq!(node.distance(), 5.0);
    assert_eq!(node.start_frame(), 12.0);
    assert_eq!(node.start_position(), Vec3::new(0.0, 3.0, 0.0));
    assert_eq!(node.last_position(), Vec3::new(0.0, 3.0, 0.0));
    assert_eq!(node.output(), Vec3::new(0.0, 3.0, 0.0));

    let wiring = scene.wiring(id).expect("wired");
    assert_eq!(Some(wiring.target), scene.object_id("target"));
    assert_eq!(Some(wiring.constrained), scene.object_id("follower"));
    assert_eq!(wiring.axes, AxisMask::ALL);
}

#[test]
fn explicit_options_override_defaults() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "follower")
        .name("keepAway")
        .distance(2.5)
        .start_frame(30.0)
        .start_position(Vec3::new(1.0, 1.0, 1.0))
        .base_settings(ConstraintSettings {
            pull: false,
            degenerate_policy: DegeneratePolicy::Axis(Vec3::UNIT_Y),
            ..ConstraintSettings::default()
        });
    let id = cmd.do_it(&mut scene).expect("created");
    let node = scene.node(id).expect("node");
    assert_eq!(node.name(), "keepAway");
    assert_eq!(node.distance(), 2.5);
    assert_eq!(node.start_frame(), 30.0);
    assert_eq!(node.start_position(), Vec3::new(1.0, 1.0, 1.0));
    assert!(node.push_enabled());
    assert!(!node.pull_enabled());
    assert_eq!(
        node.degenerate_policy(),
        DegeneratePolicy::Axis(Vec3::UNIT_Y)
    );
}

#[test]
fn taken_names_get_a_suffix() {
    let mut scene = scene();
    let mut first = CreateConstraint::new("target", "follower").name("pp");
    first.do_it(&mut scene).expect("first");
    let mut second = CreateConstraint::new("target", "follower").name("pp");
    second.do_it(&mut scene).expect("second");
    assert_eq!(second.node_name(), Some("pp1"));
}

#[test]
fn skips_route_only_remaining_channels() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "follower")
        .skip(Axis::Y)
        .skip_named("z")
        .expect("axis z");
    let id = cmd.do_it(&mut scene).expect("created");
    let wiring = scene.wiring(id).expect("wired");
    assert!(wiring.axes.contains(Axis::X));
    assert!(!wiring.axes.contains(Axis::Y));
    assert!(!wiring.axes.contains(Axis::Z));
    assert_eq!(
        wiring.output_plugs(),
        vec![pushpull_core::Plug::ConstraintTranslateX]
    );
}

#[test]
fn four_skips_are_rejected() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "follower")
        .skip(Axis::X)
        .skip(Axis::Y)
        .skip(Axis::Z)
        .skip(Axis::X);
    assert_eq!(cmd.do_it(&mut scene), Err(CommandError::TooManySkips(4)));
    assert_eq!(scene.nodes().count(), 0);
}

#[test]
fn missing_object_is_a_scene_error() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "nobody");
    assert_eq!(
        cmd.do_it(&mut scene),
        Err(CommandError::Scene(SceneError::UnknownObject(
            "nobody".into()
        )))
    );
}

#[test]
fn undo_removes_node_and_redo_restores_resolved_settings() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "follower");
    let id = cmd.do_it(&mut scene).expect("created");
    let settings = *scene.node(id).expect("node").settings();

    cmd.undo_it(&mut scene).expect("undo");
    assert!(scene.node(id).is_none());
    assert!(scene.wiring(id).is_none());
    assert_eq!(cmd.undo_it(&mut scene), Err(CommandError::NothingToUndo));

    // Scene changes after do_it must not leak into redo.
    scene.set_time(99.0);
    let target = scene.object_id("target").expect("target");
    scene
        .set_translation(target, Vec3::new(100.0, 0.0, 0.0))
        .expect("move");

    let again = cmd.redo_it(&mut scene).expect("redo");
    assert_eq!(again, id);
    assert_eq!(scene.node(again).expect("node").settings(), &settings);
    assert!(scene.wiring(again).is_some());
}

#[test]
fn created_constraint_drives_follower() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "follower").distance(1.0);
    cmd.do_it(&mut scene).expect("created");
    scene.evaluate();

    let follower = scene.object_id("follower").expect("follower");
    let target = scene.object_id("target").expect("target");
    let gap = scene
        .world_position(follower)
        .expect("follower")
        .distance(&scene.world_position(target).expect("target"));
    assert!((gap - 1.0).abs() < 1e-9, "gap {gap}");
}

#[test]
fn failed_redo_rolls_back_the_inserted_node() {
    let mut scene = scene();
    let mut cmd = CreateConstraint::new("target", "follower");
    cmd.do_it(&mut scene).expect("created");
    cmd.undo_it(&mut scene).expect("undo");

    let target = scene.object_id("target").expect("target");
    scene.remove_transform(target).expect("remove target");
    assert!(matches!(
        cmd.redo_it(&mut scene),
        Err(CommandError::Scene(SceneError::UnknownObject(_)))
    ));
    assert_eq!(scene.nodes().count(), 0);
    assert_eq!(cmd.node(), None);
}
