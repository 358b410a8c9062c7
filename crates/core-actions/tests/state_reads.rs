//! The read surface: computed values, base values, introspection.

mod common;

use std::time::Instant;

use common::{at, rig_at, start};
use core_actions::{Cardinal, Mode, Value, Vec2};
use core_model::{Operator, Property};

#[test]
fn computed_values_compose_base_and_layers() {
    let (rig, _backend) = rig_at(0, 0);
    let t0 = Instant::now();
    rig.speed().to(2.0);
    start(&rig, t0);

    rig.layer_ordered("add", 1).speed().offset().add(4.0);
    rig.layer_ordered("scale", 2).speed().scale().mul(2.0);
    assert!((rig.state().speed() - 12.0).abs() < 1e-6, "(2 + 4) * 2");

    let v = rig.state().vector();
    assert!(v.approx_eq(Vec2::new(12.0, 0.0)));
}

#[test]
fn explicit_order_beats_insertion_order() {
    let (rig, _backend) = rig_at(0, 0);
    let t0 = Instant::now();
    rig.speed().to(2.0);
    start(&rig, t0);

    // Inserted scale-first, but ordered to run after the offset.
    rig.layer_ordered("scale", 10).speed().scale().mul(2.0);
    rig.layer_ordered("add", 1).speed().offset().add(4.0);
    assert!((rig.state().speed() - 12.0).abs() < 1e-6, "offset applies first");
}

#[test]
fn cardinal_names_follow_screen_coordinates() {
    let (rig, _backend) = rig_at(0, 0);
    let t0 = Instant::now();

    rig.direction().to(0.0, -1.0);
    start(&rig, t0);
    assert_eq!(rig.state().direction_cardinal(), Some(Cardinal::Up));

    rig.direction().to(1.0, 1.0);
    rig.tick_at(at(t0, 16));
    rig.tick_at(at(t0, 32));
    assert_eq!(rig.state().direction_cardinal(), Some(Cardinal::DownRight));
}

#[test]
fn base_view_reflects_baked_state_only() {
    let (rig, _backend) = rig_at(0, 0);
    let t0 = Instant::now();
    rig.speed().to(3.0);
    start(&rig, t0);

    rig.layer("boost").speed().offset().add(10.0);
    assert!((rig.state().speed() - 13.0).abs() < 1e-6, "computed sees the boost");
    assert_eq!(rig.state().base().speed(), 3.0, "base does not");
    assert!(rig.state().base().vector().approx_eq(Vec2::new(3.0, 0.0)));
}

#[test]
fn layer_introspection_exposes_the_command_shape() {
    let (rig, _backend) = rig_at(0, 0);
    let t0 = Instant::now();
    rig.layer("boost").speed().offset().add(10.0).over(100.0).hold(100.0);
    start(&rig, t0);
    rig.tick_at(at(t0, 50));

    let info = rig.state().layer("boost").expect("live layer");
    assert_eq!(info.property, Property::Speed);
    assert_eq!(info.mode, Some(Mode::Offset));
    assert_eq!(info.operator, Some(Operator::Add));
    assert_eq!(info.target, Some(Value::Scalar(10.0)));
    assert!(info.value.approx_eq(Value::Scalar(5.0)), "halfway through over");
    assert!(info.time_alive >= 0.0);

    assert_eq!(rig.state().layers(), vec!["boost".to_string()]);
    assert!(rig.state().layer("missing").is_none());
}

#[test]
fn is_moving_tracks_engine_liveness() {
    let (rig, _backend) = rig_at(0, 0);
    let t0 = Instant::now();
    assert!(!rig.state().is_moving());

    rig.speed().to(1.0);
    assert!(rig.state().is_moving());

    start(&rig, t0);
    rig.stop();
    assert!(!rig.state().is_moving());
}

#[test]
fn reads_are_stable_between_ticks() {
    let (rig, _backend) = rig_at(0, 0);
    let t0 = Instant::now();
    rig.layer("b").speed().offset().add(10.0).over(100.0);
    start(&rig, t0);
    rig.tick_at(at(t0, 50));

    // No tick between these reads: identical values.
    let a = rig.state().speed();
    let b = rig.state().speed();
    assert_eq!(a, b);
}
