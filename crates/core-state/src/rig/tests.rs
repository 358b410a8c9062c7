use std::time::Duration;

use core_backend::{BackendRegistry, SharedVirtualBackend};
use core_config::RigConfig;
use core_events::ManualScheduler;
use core_model::{
    Behavior, BuilderConfig, Easing, InputKind, LayerKind, Mode, MovementType, Operator, Property,
    Value, Vec2,
};

use super::*;

fn rig_with_backend(x: i32, y: i32) -> (RigState, SharedVirtualBackend) {
    let backend = SharedVirtualBackend::at(x, y);
    let registry = BackendRegistry::new(Box::new(backend.clone()));
    let rig = RigState::new(
        registry,
        Box::new(ManualScheduler::new()),
        RigConfig {
            detect_manual_movement: false,
            ..RigConfig::default()
        },
    );
    (rig, backend)
}

fn at(base: Instant, ms: u64) -> Instant {
    base + Duration::from_millis(ms)
}

fn pos_to(x: f64, y: f64) -> BuilderConfig {
    BuilderConfig::new(Property::Pos, Operator::To, Value::Pair(Vec2::new(x, y)))
}

fn pos_by(dx: f64, dy: f64) -> BuilderConfig {
    let mut c = BuilderConfig::new(Property::Pos, Operator::Add, Value::Pair(Vec2::new(dx, dy)));
    c.movement_type = MovementType::Relative;
    c
}

fn speed_to(v: f64) -> BuilderConfig {
    BuilderConfig::new(Property::Speed, Operator::To, Value::Scalar(v))
}

fn layer_speed_offset(layer: &str, v: f64) -> BuilderConfig {
    let mut c = BuilderConfig::new(Property::Speed, Operator::Add, Value::Scalar(v));
    c.layer_name = layer.to_string();
    c.layer_kind = LayerKind::UserModifier;
    c.mode = Some(Mode::Offset);
    c
}

fn layer_vector_offset(layer: &str, x: f64, y: f64) -> BuilderConfig {
    let mut c = BuilderConfig::new(
        Property::Vector,
        Operator::Add,
        Value::Pair(Vec2::new(x, y)),
    );
    c.layer_name = layer.to_string();
    c.layer_kind = LayerKind::UserModifier;
    c.mode = Some(Mode::Offset);
    c
}

/// Tick the rig at every step in `[from_ms, to_ms]` relative to `base`.
fn run_ticks(rig: &mut RigState, base: Instant, from_ms: u64, to_ms: u64, step_ms: u64) {
    let mut elapsed = from_ms;
    while elapsed <= to_ms {
        rig.tick_at(at(base, elapsed));
        elapsed += step_ms;
    }
}

#[test]
fn instant_pos_to_moves_and_bakes_without_ticking() {
    let (mut rig, backend) = rig_with_backend(100, 100);
    let t0 = Instant::now();
    rig.admit_at(pos_to(500.0, 300.0), t0).unwrap();

    assert_eq!(backend.pos(), (500, 300));
    assert_eq!(rig.base_pos(), Some(Vec2::new(500.0, 300.0)));
    assert!(!rig.should_tick());
    assert!(rig.layers().is_empty());
}

#[test]
fn instant_pos_by_emits_one_relative_move() {
    let (mut rig, backend) = rig_with_backend(10, 10);
    let t0 = Instant::now();
    rig.admit_at(pos_by(25.0, -5.0), t0).unwrap();

    assert_eq!(backend.pos(), (35, 5));
    assert_eq!(backend.move_counts().1, 1);
    assert!(!rig.should_tick());
}

#[test]
fn animated_pos_to_reaches_target_exactly() {
    let (mut rig, backend) = rig_with_backend(100, 100);
    let t0 = Instant::now();
    let mut config = pos_to(500.0, 300.0);
    config.over_ms = Some(1000.0);
    rig.admit_at(config, t0).unwrap();
    assert!(rig.should_tick());

    // First tick records the frame clock; second starts the lifecycle at t0.
    rig.tick_at(t0);
    rig.tick_at(t0);

    rig.tick_at(at(t0, 500));
    let (x, y) = backend.pos();
    assert!((x - 300).abs() <= 1, "x at halfway was {x}");
    assert!((y - 200).abs() <= 1, "y at halfway was {y}");

    rig.tick_at(at(t0, 1000));
    assert_eq!(backend.pos(), (500, 300));

    let outcome = rig.tick_at(at(t0, 1016));
    assert!(!outcome.ticking);
    assert_eq!(rig.base_pos(), Some(Vec2::new(500.0, 300.0)));
    assert!(rig.layers().is_empty());
}

#[test]
fn velocity_moves_roughly_speed_per_frame() {
    let (mut rig, backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(speed_to(5.0), t0).unwrap();

    // ~60 frames at 16 ms.
    let mut t = t0;
    for i in 0..=60 {
        t = at(t0, i * 16);
        rig.tick_at(t);
    }
    let (x, y) = backend.pos();
    assert!((295..=305).contains(&x), "x after ~1s was {x}");
    assert_eq!(y, 0);
    assert_eq!(rig.base_speed(), 5.0);
    assert!(rig.should_tick(), "velocity keeps the loop alive");

    let callbacks = rig.stop(None, Easing::Linear, t);
    assert!(callbacks.is_empty());
    assert_eq!(rig.base_speed(), 0.0);
    assert!(!rig.should_tick());
    assert!(rig.layers().is_empty());
}

#[test]
fn boost_layer_ramps_holds_and_reverts() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(speed_to(3.0), t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0); // bake base speed

    let mut config = layer_speed_offset("boost", 10.0);
    config.over_ms = Some(200.0);
    config.hold_ms = Some(500.0);
    config.revert_ms = Some(200.0);
    rig.admit_at(config, t0).unwrap();

    rig.tick_at(t0); // lifecycle starts here
    let start = rig.speed();
    assert!((start - 3.0).abs() < 1e-6, "over begins at the base speed");
    rig.tick_at(at(t0, 100));
    let mid_over = rig.speed();
    assert!((mid_over - 8.0).abs() < 0.5, "3 + 10/2 at half over, got {mid_over}");

    // Phase boundaries hit exactly so the hold window starts at 200.
    rig.tick_at(at(t0, 200));
    rig.tick_at(at(t0, 400));
    assert!((rig.speed() - 13.0).abs() < 1e-6, "hold sustains 13");

    rig.tick_at(at(t0, 700)); // hold ends, revert starts
    rig.tick_at(at(t0, 800));
    let mid_revert = rig.speed();
    assert!((mid_revert - 8.0).abs() < 0.5, "13 -> 3 at half revert, got {mid_revert}");

    rig.tick_at(at(t0, 900));
    rig.tick_at(at(t0, 916));
    assert!((rig.speed() - 3.0).abs() < 1e-6);
    assert!(!rig.has_layer("boost"), "reverted boost group is destroyed");
    assert_eq!(rig.base_speed(), 3.0);
}

#[test]
fn queue_runs_commands_sequentially() {
    let (mut rig, backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    for _ in 0..3 {
        let mut config = pos_by(100.0, 0.0);
        config.layer_name = "q".into();
        config.layer_kind = LayerKind::UserModifier;
        config.mode = Some(Mode::Offset);
        config.over_ms = Some(200.0);
        config.behavior = Some(Behavior::Queue(None));
        rig.admit_at(config, t0).unwrap();
    }
    let group = rig.group("q").expect("queue group");
    assert_eq!(group.builders.len(), 1);
    assert_eq!(group.pending_queue.len(), 2);

    rig.tick_at(t0);
    rig.tick_at(t0);
    rig.tick_at(at(t0, 100));
    let (x, _) = backend.pos();
    assert!((45..=55).contains(&x), "first command half done, got {x}");

    // Each command takes 200 ms plus a tick to pop its successor.
    run_ticks(&mut rig, t0, 116, 800, 16);
    let (x, _) = backend.pos();
    assert_eq!(x, 300, "all three queued moves landed");
    assert!(!rig.has_layer("q"), "drained queue group is destroyed");
}

#[test]
fn emit_converts_layer_to_decaying_vector() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(layer_vector_offset("wind", 5.0, 0.0), t0).unwrap();
    assert!(rig.has_layer("wind"));

    let emit_name = rig.emit_layer("wind", 500.0, Easing::Linear, t0).unwrap();
    assert!(!rig.has_layer("wind"), "emit consumes the source layer");
    assert!(emit_name.starts_with("emit.wind."));
    assert!(rig.has_layer(&emit_name));

    rig.tick_at(t0);
    rig.tick_at(t0);
    let v0 = rig.vector();
    assert!((v0.x - 5.0).abs() < 0.2, "starts at full contribution, got {}", v0.x);

    rig.tick_at(at(t0, 250));
    let mid = rig.vector();
    assert!((mid.x - 2.5).abs() < 0.3, "half decayed, got {}", mid.x);

    rig.tick_at(at(t0, 520));
    rig.tick_at(at(t0, 540));
    assert!(!rig.has_layer(&emit_name), "decayed emit layer vanishes");
    assert!(rig.vector().is_zero());
}

#[test]
fn emit_rejects_direction_layers() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut config = BuilderConfig::new(Property::Direction, Operator::Add, Value::Scalar(45.0));
    config.layer_name = "turn".into();
    config.layer_kind = LayerKind::UserModifier;
    config.mode = Some(Mode::Offset);
    rig.admit_at(config, t0).unwrap();

    let err = rig.emit_layer("turn", 500.0, Easing::Linear, t0).unwrap_err();
    assert!(matches!(
        err,
        RigError::Admit(AdmitError::InvalidEmitSource { .. })
    ));
    assert!(rig.has_layer("turn"), "failed emit leaves the source intact");
}

#[test]
fn throttle_window_rejects_rapid_repeats() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    for i in 0..5 {
        let mut config = layer_speed_offset("t", 1.0);
        config.over_ms = Some(10.0);
        config.behavior = Some(Behavior::Throttle(Some(100.0)));
        rig.admit_at(config, at(t0, i * 10)).unwrap();
    }
    assert_eq!(rig.group("t").unwrap().builders.len(), 1);

    let mut config = layer_speed_offset("t", 1.0);
    config.over_ms = Some(10.0);
    config.behavior = Some(Behavior::Throttle(Some(100.0)));
    rig.admit_at(config, at(t0, 150)).unwrap();
    assert_eq!(rig.group("t").unwrap().builders.len(), 2);
}

#[test]
fn bare_throttle_rejects_while_key_is_live() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    for _ in 0..3 {
        let mut config = layer_speed_offset("t", 1.0);
        config.over_ms = Some(1000.0);
        config.behavior = Some(Behavior::Throttle(None));
        rig.admit_at(config, t0).unwrap();
    }
    assert_eq!(rig.group("t").unwrap().builders.len(), 1);
}

#[test]
fn debounce_materializes_once_per_quiet_window() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    for i in 0u64..4 {
        let mut config = layer_speed_offset("d", i as f64);
        config.over_ms = Some(10.0);
        config.behavior = Some(Behavior::Debounce(50.0));
        rig.admit_at(config, at(t0, i * 10)).unwrap();
    }
    assert!(!rig.has_layer("d"), "still within the debounce window");
    assert!(rig.should_tick(), "pending debounce keeps the loop alive");

    rig.tick_at(at(t0, 40));
    assert!(!rig.has_layer("d"));

    // Quiet window expires 50 ms after the last arming (t=30).
    rig.tick_at(at(t0, 90));
    let group = rig.group("d").expect("debounced builder admitted");
    assert_eq!(group.builders.len(), 1);
    assert_eq!(group.builders[0].target_value, Value::Scalar(3.0));
}

#[test]
fn ignore_drops_while_active_extend_stretches_hold() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();

    let mut first = layer_speed_offset("i", 2.0);
    first.over_ms = Some(100.0);
    first.hold_ms = Some(100.0);
    rig.admit_at(first, t0).unwrap();

    let mut dup = layer_speed_offset("i", 2.0);
    dup.over_ms = Some(100.0);
    dup.behavior = Some(Behavior::Ignore);
    rig.admit_at(dup, t0).unwrap();
    assert_eq!(rig.group("i").unwrap().builders.len(), 1);

    let mut ext = layer_speed_offset("i", 2.0);
    ext.hold_ms = Some(400.0);
    ext.behavior = Some(Behavior::Extend);
    rig.admit_at(ext, t0).unwrap();
    assert_eq!(rig.group("i").unwrap().builders.len(), 1, "extend admits nothing new");

    rig.tick_at(t0);
    rig.tick_at(t0);
    // Original timing: over 100 + hold 100. Extended: hold 500, ending 600.
    rig.tick_at(at(t0, 100));
    rig.tick_at(at(t0, 450));
    assert!(
        !rig.group("i").unwrap().builders[0].lifecycle.is_complete(),
        "hold was extended past the original end"
    );
    rig.tick_at(at(t0, 620));
    assert!(rig.group("i").unwrap().builders[0].lifecycle.is_complete());
}

#[test]
fn replace_hands_off_from_current_value() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut first = layer_speed_offset("r", 10.0);
    first.over_ms = Some(1000.0);
    rig.admit_at(first, t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0);
    rig.tick_at(at(t0, 500));
    let before = rig.speed();
    assert!((before - 5.0).abs() < 0.2);

    let mut takeover = layer_speed_offset("r", 20.0);
    takeover.over_ms = Some(1000.0);
    takeover.behavior = Some(Behavior::Replace);
    rig.admit_at(takeover, at(t0, 500)).unwrap();

    let group = rig.group("r").unwrap();
    assert_eq!(group.builders.len(), 1, "incumbents cleared");
    // Continuity: right after the handoff the composed value is unchanged.
    rig.tick_at(at(t0, 500));
    assert!((rig.speed() - before).abs() < 0.2, "no discontinuity on replace");
}

#[test]
fn stack_cap_rejects_past_max() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    for _ in 0..5 {
        let mut config = layer_speed_offset("s", 1.0);
        config.over_ms = Some(1000.0);
        config.behavior = Some(Behavior::Stack(Some(3)));
        rig.admit_at(config, t0).unwrap();
    }
    assert_eq!(rig.group("s").unwrap().builders.len(), 3);
}

#[test]
fn manual_movement_pauses_the_rig() {
    let backend = SharedVirtualBackend::at(0, 0);
    let registry = BackendRegistry::new(Box::new(backend.clone()));
    let mut rig = RigState::new(
        registry,
        Box::new(ManualScheduler::new()),
        RigConfig {
            detect_manual_movement: true,
            manual_override_ms: 300.0,
            ..RigConfig::default()
        },
    );
    let t0 = Instant::now();
    rig.admit_at(speed_to(5.0), t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(at(t0, 16));
    let after_first = backend.pos();
    assert_eq!(after_first, (5, 0));

    // User grabs the mouse.
    backend.user_move(200, 200);
    rig.tick_at(at(t0, 32));
    assert_eq!(backend.pos(), (200, 200), "engine yields to the user");

    // Still inside the override window.
    rig.tick_at(at(t0, 100));
    assert_eq!(backend.pos(), (200, 200));

    // Window expires; engine resumes from the observed position.
    rig.tick_at(at(t0, 400));
    rig.tick_at(at(t0, 416));
    assert!(backend.pos().0 > 200);
}

#[test]
fn rate_timing_lowers_to_duration() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut config = speed_to(10.0);
    config.over_rate = Some(5.0); // 10 units at 5/s = 2 s
    rig.admit_at(config, t0).unwrap();

    let group = rig.group("base.speed").unwrap();
    let over = group.builders[0].config.over_ms.unwrap();
    assert!((over - 2000.0).abs() < 1e-6);
}

#[test]
fn rate_cache_coalesces_repeated_targets() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut config = speed_to(10.0);
    config.over_rate = Some(5.0);
    rig.admit_at(config, t0).unwrap();

    // Same command while in flight: coalesced, no duplicate builder.
    let mut repeat = speed_to(10.0);
    repeat.over_rate = Some(5.0);
    rig.admit_at(repeat, at(t0, 100)).unwrap();
    assert_eq!(rig.group("base.speed").unwrap().builders.len(), 1);
}

#[test]
fn rate_cache_refreshes_for_relative_commands() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut config = BuilderConfig::new(Property::Speed, Operator::Add, Value::Scalar(2.0));
    config.over_rate = Some(100.0); // 2 units at 100/s = 20 ms
    rig.admit_at(config, t0).unwrap();

    // Run it to completion: base speed becomes 2 and the group goes away.
    run_ticks(&mut rig, t0, 0, 48, 16);
    assert_eq!(rig.base_speed(), 2.0);

    // The same relative command now has a new computed target (2 -> 4) and
    // must not be swallowed by the stale cache entry.
    let mut again = BuilderConfig::new(Property::Speed, Operator::Add, Value::Scalar(2.0));
    again.over_rate = Some(100.0);
    rig.admit_at(again, at(t0, 100)).unwrap();
    let group = rig.group("base.speed").expect("re-admitted");
    assert_eq!(group.builders.len(), 1);
    assert_eq!(group.builders[0].target_value, Value::Scalar(4.0));
}

#[test]
fn reverse_negates_vector_layer() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(layer_vector_offset("drift", 4.0, 0.0), t0).unwrap();
    rig.reverse_layer("drift", None, Easing::Linear, t0).unwrap();
    let group = rig.group("drift").unwrap();
    assert_eq!(
        group.builders[0].target_value,
        Value::Pair(Vec2::new(-4.0, 0.0))
    );
}

#[test]
fn gradual_reverse_bridges_with_two_emits() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(layer_vector_offset("drift", 4.0, 0.0), t0).unwrap();
    rig.reverse_layer("drift", Some(300.0), Easing::Linear, t0).unwrap();

    let emits: Vec<String> = rig
        .layers()
        .into_iter()
        .filter(|n| n.starts_with("emit."))
        .collect();
    assert_eq!(emits.len(), 2, "two bridge emits");

    // Net contribution right after the reverse is still the old +4.
    rig.tick_at(t0);
    rig.tick_at(t0);
    let v = rig.vector();
    assert!((v.x - 4.0).abs() < 0.3, "continuous at reversal, got {}", v.x);

    // After the bridge decays only the negated layer remains.
    run_ticks(&mut rig, t0, 16, 400, 16);
    let v = rig.vector();
    assert!((v.x + 4.0).abs() < 0.3, "settled at -4, got {}", v.x);
}

#[test]
fn group_revert_unwinds_without_baking() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut config = layer_speed_offset("boost", 10.0);
    config.over_ms = Some(100.0);
    rig.admit_at(config, t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0);
    rig.tick_at(at(t0, 200));
    assert!((rig.speed() - 10.0).abs() < 1e-6);

    rig.revert_layer("boost", Some(100.0), Easing::Linear, at(t0, 200)).unwrap();
    rig.tick_at(at(t0, 250));
    assert!((rig.speed() - 5.0).abs() < 0.5);
    rig.tick_at(at(t0, 320));
    rig.tick_at(at(t0, 340));
    assert!(!rig.has_layer("boost"));
    assert_eq!(rig.base_speed(), 0.0, "reverted layer never baked");
}

#[test]
fn stop_with_transition_decelerates() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(speed_to(8.0), t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0);
    assert_eq!(rig.base_speed(), 8.0);

    rig.stop(Some(200.0), Easing::Linear, at(t0, 100));
    rig.tick_at(at(t0, 100));
    rig.tick_at(at(t0, 100));
    rig.tick_at(at(t0, 200));
    let mid = rig.speed();
    assert!((mid - 4.0).abs() < 0.5, "halfway through deceleration, got {mid}");
    rig.tick_at(at(t0, 320));
    rig.tick_at(at(t0, 340));
    assert_eq!(rig.base_speed(), 0.0);
    assert!(!rig.should_tick());
}

#[test]
fn stop_callbacks_fire_when_the_loop_stops() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let fired = std::rc::Rc::new(std::cell::Cell::new(false));
    let flag = fired.clone();
    rig.add_stop_callback(Box::new(move || flag.set(true)));

    let mut config = layer_speed_offset("blip", 0.0);
    config.over_ms = Some(10.0);
    config.revert_ms = Some(10.0);
    rig.admit_at(config, t0).unwrap();
    rig.tick_at(t0);
    let outcome = rig.tick_at(at(t0, 50));
    assert!(!outcome.ticking);
    let mut callbacks = outcome.callbacks;
    for cb in &mut callbacks {
        cb();
    }
    assert!(fired.get());
}

#[test]
fn reset_restores_defaults() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(speed_to(5.0), t0).unwrap();
    rig.admit_at(layer_speed_offset("x", 2.0), t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0);

    rig.reset();
    assert_eq!(rig.base_speed(), 0.0);
    assert_eq!(rig.base_direction(), Vec2::new(1.0, 0.0));
    assert_eq!(rig.base_pos(), None);
    assert!(rig.layers().is_empty());
    assert!(!rig.should_tick());
}

#[test]
fn bake_all_folds_layers_into_base() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(speed_to(3.0), t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0);
    rig.admit_at(layer_speed_offset("boost", 7.0), t0).unwrap();

    rig.bake_all();
    assert!(rig.layers().is_empty());
    assert_eq!(rig.base_speed(), 10.0);
}

#[test]
fn layer_introspection_reports_progress() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut config = layer_speed_offset("boost", 10.0);
    config.over_ms = Some(100.0);
    config.hold_ms = Some(100.0);
    rig.admit_at(config, t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0);
    rig.tick_at(at(t0, 50));

    let info = rig.layer_info("boost", at(t0, 50)).expect("layer exists");
    assert_eq!(info.property, Property::Speed);
    assert_eq!(info.mode, Some(Mode::Offset));
    assert_eq!(info.operator, Some(Operator::Add));
    assert_eq!(info.target, Some(Value::Scalar(10.0)));
    assert!((info.time_left_ms - 150.0).abs() < 1.0);
    assert!(info.value.approx_eq(Value::Scalar(5.0)));
}

#[test]
fn composition_applies_layers_in_order() {
    let (mut rig, _backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    rig.admit_at(speed_to(2.0), t0).unwrap();
    rig.tick_at(t0);
    rig.tick_at(t0);

    // Offset runs before scale because of explicit orders.
    let mut add = layer_speed_offset("add", 4.0);
    add.order = Some(1);
    rig.admit_at(add, t0).unwrap();

    let mut scale = BuilderConfig::new(Property::Speed, Operator::Mul, Value::Scalar(2.0));
    scale.layer_name = "scale".into();
    scale.layer_kind = LayerKind::UserModifier;
    scale.mode = Some(Mode::Scale);
    scale.order = Some(2);
    rig.admit_at(scale, t0).unwrap();

    assert!((rig.speed() - 12.0).abs() < 1e-6, "(2 + 4) * 2");
}

#[test]
fn scroll_velocity_emits_through_scroll_channel() {
    let (mut rig, backend) = rig_with_backend(0, 0);
    let t0 = Instant::now();
    let mut config = BuilderConfig::new(Property::Speed, Operator::To, Value::Scalar(2.0));
    config.input_kind = InputKind::Scroll;
    config.layer_name = "base.scroll.speed".into();
    rig.admit_at(config, t0).unwrap();

    rig.tick_at(t0);
    for i in 1..=10 {
        rig.tick_at(at(t0, i * 16));
    }
    let (sx, sy) = backend.scroll_total();
    assert_eq!(sx, 0);
    assert_eq!(sy, 20, "2 lines per frame straight down");
    assert_eq!(backend.pos(), (0, 0), "scroll does not move the pointer");
}
