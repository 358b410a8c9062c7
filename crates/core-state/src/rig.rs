//! Global rig state and the per-frame evaluator.
//!
//! One `RigState` owns the base values, every layer group, the back-end
//! registry and the tick bookkeeping. All mutation happens on the thread
//! that calls `admit_at`/`tick_at`; the struct holds no locks.
//!
//! Per-tick ordering contract: (1) debounce wakes, (2) phase advances,
//! (3) cursor emission, (4) completion bakes (layer then base), (5) the
//! stop-tick check, (6) then-callbacks. Callbacks are returned to the
//! caller rather than invoked here so the owner can drop its borrow first.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use core_backend::BackendRegistry;
use core_config::RigConfig;
use core_events::{ManualScheduler, TickHandle, TickScheduler};
use core_model::{
    AdmitError, Behavior, BuilderConfig, Cardinal, Easing, InputKind, LayerKind, Mode,
    MovementType, Operator, PhaseCallback, Property, RigError, Value, Vec2, modes, rate,
};

use crate::active::ActiveBuilder;
use crate::group::{BakeOutcome, LayerGroup};

/// Pixel distance past which the cursor found at tick-stop is treated as a
/// user move rather than rounding noise.
const STOP_SYNC_TOLERANCE_PX: f64 = 2.0;

/// Composed state as of the last completed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposedState {
    pub pos: Vec2,
    pub speed: f64,
    pub direction: Vec2,
    pub pos_overridden: bool,
}

/// Per-layer introspection snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    pub property: Property,
    pub mode: Option<Mode>,
    pub operator: Option<Operator>,
    pub value: Value,
    pub target: Option<Value>,
    pub time_alive: f64,
    pub time_left_ms: f64,
    pub order: Option<i32>,
}

/// What a tick produced: callbacks to fire once the caller has released its
/// borrow, and whether the loop is still live.
pub struct TickOutcome {
    pub callbacks: Vec<PhaseCallback>,
    pub ticking: bool,
}

struct DebounceEntry {
    ready_at: Instant,
    config: BuilderConfig,
}

pub struct RigState {
    // Base (baked) values.
    base_pos: Option<Vec2>,
    base_speed: f64,
    base_direction: Vec2,
    scroll_base_speed: f64,
    scroll_base_direction: Vec2,

    groups: BTreeMap<String, LayerGroup>,
    layer_orders: HashMap<String, i32>,
    next_auto_order: i32,

    last_frame_time: Option<Instant>,
    subpixel: core_model::SubpixelAccumulator,
    scroll_subpixel: core_model::SubpixelAccumulator,
    scroll_by_lines: bool,
    /// Internal absolute tracker; `None` until an absolute command starts it.
    current_pos: Option<Vec2>,

    throttle_times: HashMap<String, Instant>,
    rate_cache: HashMap<String, Value>,
    debounce_pending: HashMap<String, DebounceEntry>,

    manual_moved_at: Option<Instant>,
    expected_mouse_pos: Option<(i32, i32)>,

    stop_callbacks: Vec<PhaseCallback>,
    backends: BackendRegistry,
    scheduler: Box<dyn TickScheduler>,
    tick_handle: Option<TickHandle>,
    config: RigConfig,

    created_at: Instant,
    unique_counter: u64,
}

impl Default for RigState {
    fn default() -> Self {
        Self::new(
            BackendRegistry::default(),
            Box::new(ManualScheduler::new()),
            RigConfig::default(),
        )
    }
}

impl RigState {
    pub fn new(
        backends: BackendRegistry,
        scheduler: Box<dyn TickScheduler>,
        config: RigConfig,
    ) -> Self {
        Self {
            base_pos: None,
            base_speed: 0.0,
            base_direction: Vec2::new(1.0, 0.0),
            scroll_base_speed: 0.0,
            scroll_base_direction: Vec2::new(0.0, 1.0),
            groups: BTreeMap::new(),
            layer_orders: HashMap::new(),
            next_auto_order: 0,
            last_frame_time: None,
            subpixel: core_model::SubpixelAccumulator::new(),
            scroll_subpixel: core_model::SubpixelAccumulator::new(),
            scroll_by_lines: true,
            current_pos: None,
            throttle_times: HashMap::new(),
            rate_cache: HashMap::new(),
            debounce_pending: HashMap::new(),
            manual_moved_at: None,
            expected_mouse_pos: None,
            stop_callbacks: Vec::new(),
            backends,
            scheduler,
            tick_handle: None,
            config,
            created_at: Instant::now(),
            unique_counter: 0,
        }
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RigConfig) {
        self.config = config;
    }

    pub fn backends_mut(&mut self) -> &mut BackendRegistry {
        &mut self.backends
    }

    fn next_unique(&mut self) -> u64 {
        self.unique_counter += 1;
        let micros = self
            .created_at
            .elapsed()
            .as_micros()
            .min(u128::from(u64::MAX / 1000)) as u64;
        micros * 1000 + self.unique_counter % 1000
    }

    // ───────────────────────── admission ─────────────────────────

    pub fn admit(&mut self, config: BuilderConfig) -> Result<(), RigError> {
        self.admit_at(config, Instant::now())
    }

    /// Route one committed command through the policy gates and into its
    /// layer group. Gate order: debounce → rate-cache → throttle →
    /// ignore/extend → replace → stack cap → queue.
    pub fn admit_at(&mut self, mut config: BuilderConfig, now: Instant) -> Result<(), RigError> {
        config.validate().map_err(RigError::Chain)?;

        if config.operator == Operator::Bake {
            let layer = (!config.is_base_layer()).then(|| config.layer_name.clone());
            self.bake_property(config.property, layer.as_deref(), now);
            return Ok(());
        }

        if let Some(Behavior::Debounce(ms)) = config.behavior {
            let key = config.policy_key();
            config.behavior = None;
            tracing::trace!(target: "rig.admit", key = %key, ms, "debounce_armed");
            self.debounce_pending.insert(
                key,
                DebounceEntry {
                    ready_at: now + Duration::from_secs_f64(ms / 1000.0),
                    config,
                },
            );
            self.ensure_ticking(now);
            return Ok(());
        }

        if config.is_base_layer() {
            // Base layers behave as override on their own accumulator.
            config.mode.get_or_insert(Mode::Override);
        }

        let mut builder = self.materialize(config, now)?;

        // Rate cache: repeated rate-based commands with the same target
        // coalesce; a changed target hands off from the current value.
        if let Some(key) = rate_cache_key(&builder.config) {
            if let Some(cached) = self.rate_cache.get(&key) {
                let same_target = cached.approx_eq(builder.target_value);
                if same_target && self.groups.contains_key(&builder.config.layer_name) {
                    tracing::trace!(target: "rig.admit", key = %key, "rate_cache_drop");
                    return Ok(());
                }
                if let Some(group) = self.groups.get_mut(&builder.config.layer_name) {
                    builder.base_value = group.current_value();
                    builder.target_value =
                        compute_target(&builder.config, builder.base_value, Some(builder.base_value))?;
                    lower_rates(&mut builder.config, builder.base_value, builder.target_value);
                    builder.lifecycle = core_lifecycle::Lifecycle::from_config(&builder.config);
                    group.clear_builders();
                }
            }
            self.rate_cache.insert(key, builder.target_value);
        }

        self.ensure_group(&builder.config, now);
        let key = builder.config.policy_key();

        match builder.config.behavior {
            Some(Behavior::Throttle(None)) => {
                if self.group_has_key(&builder.config.layer_name, &key) {
                    tracing::trace!(target: "rig.admit", key = %key, "throttle_active_drop");
                    return Ok(());
                }
            }
            Some(Behavior::Throttle(Some(window_ms))) => {
                if let Some(last) = self.throttle_times.get(&key) {
                    let elapsed = now.saturating_duration_since(*last).as_secs_f64() * 1000.0;
                    if elapsed < window_ms {
                        tracing::trace!(target: "rig.admit", key = %key, "throttle_window_drop");
                        return Ok(());
                    }
                }
                self.throttle_times.insert(key.clone(), now);
            }
            Some(Behavior::Ignore) => {
                if self.group_has_key(&builder.config.layer_name, &key) {
                    tracing::trace!(target: "rig.admit", key = %key, "ignore_drop");
                    return Ok(());
                }
            }
            Some(Behavior::Extend) => {
                let hold = builder.config.hold_ms.unwrap_or(0.0);
                if let Some(group) = self.groups.get_mut(&builder.config.layer_name) {
                    if let Some(existing) = group
                        .builders
                        .iter_mut()
                        .find(|b| b.config.policy_key() == key)
                    {
                        existing.lifecycle.extend_hold(hold);
                        tracing::trace!(target: "rig.admit", key = %key, hold, "extend_applied");
                        self.ensure_ticking(now);
                        return Ok(());
                    }
                }
            }
            _ => {}
        }

        if matches!(builder.config.behavior, Some(Behavior::Replace)) {
            self.apply_replace(&mut builder)?;
        }

        let group = self
            .groups
            .get_mut(&builder.config.layer_name)
            .expect("group ensured above");

        if let Some(Behavior::Stack(Some(max))) = builder.config.behavior {
            if group.builders.len() >= max {
                tracing::trace!(target: "rig.admit", layer = %group.layer_name, max, "stack_cap_drop");
                return Ok(());
            }
        }

        if let Some(Behavior::Queue(cap)) = builder.config.behavior {
            if let Some(max) = cap {
                if group.queue_occupancy() >= max {
                    tracing::trace!(target: "rig.admit", layer = %group.layer_name, max, "queue_cap_drop");
                    return Ok(());
                }
            }
            if !group.builders.is_empty() || !group.pending_queue.is_empty() {
                group.pending_queue.push_back(builder);
                tracing::trace!(target: "rig.admit", layer = %group.layer_name, "queued");
                self.ensure_ticking(now);
                return Ok(());
            }
            group.is_queue_active = true;
        }

        if builder.config.input_kind == InputKind::Scroll {
            self.scroll_by_lines = builder.config.scroll_by_lines;
        }

        let instant_pos =
            builder.config.property == Property::Pos && builder.config.is_instant();
        tracing::debug!(
            target: "rig.admit",
            layer = %builder.config.layer_name,
            property = %builder.config.property,
            operator = %builder.config.operator,
            "builder_admitted"
        );
        group.add_builder(builder);

        if instant_pos {
            self.apply_instant_pos(now);
        } else {
            self.ensure_ticking(now);
        }
        Ok(())
    }

    fn group_has_key(&self, layer: &str, key: &str) -> bool {
        self.groups
            .get(layer)
            .is_some_and(|g| g.builders.iter().any(|b| b.config.policy_key() == key))
    }

    /// Capture base/target values and lower rate timings into durations.
    fn materialize(
        &mut self,
        mut config: BuilderConfig,
        now: Instant,
    ) -> Result<ActiveBuilder, RigError> {
        let base_value = self.capture_base(&config);
        let group_current = self.groups.get(&config.layer_name).map(LayerGroup::current_value);
        let target_value = compute_target(&config, base_value, group_current)?;
        lower_rates(&mut config, base_value, target_value);
        Ok(ActiveBuilder::new(config, base_value, target_value, now))
    }

    fn capture_base(&mut self, config: &BuilderConfig) -> Value {
        match (config.property, config.input_kind) {
            (Property::Pos, _) => {
                if config.movement_type == MovementType::Relative {
                    Value::Pair(Vec2::ZERO)
                } else if let Some(cur) = self.current_pos {
                    Value::Pair(cur)
                } else {
                    let read = self
                        .backends
                        .resolve(config.api_override.as_deref())
                        .read_position();
                    match read {
                        Ok((x, y)) => Value::Pair(Vec2::new(f64::from(x), f64::from(y))),
                        Err(e) => {
                            tracing::warn!(target: "rig.backend", error = %e, "position_read_failed");
                            Value::Pair(Vec2::ZERO)
                        }
                    }
                }
            }
            (Property::Speed, InputKind::Move) => Value::Scalar(self.base_speed),
            (Property::Direction, InputKind::Move) => Value::Pair(self.base_direction),
            (Property::Vector, InputKind::Move) => {
                Value::Pair(self.base_direction * self.base_speed)
            }
            (Property::Speed, InputKind::Scroll) => Value::Scalar(self.scroll_base_speed),
            (Property::Direction, InputKind::Scroll) => Value::Pair(self.scroll_base_direction),
            (Property::Vector, InputKind::Scroll) => {
                Value::Pair(self.scroll_base_direction * self.scroll_base_speed)
            }
        }
    }

    fn ensure_group(&mut self, config: &BuilderConfig, now: Instant) {
        if self.groups.contains_key(&config.layer_name) {
            return;
        }
        let mut group = LayerGroup::for_config(config, now);
        if let Some(order) = config.order {
            self.layer_orders.insert(config.layer_name.clone(), order);
        } else if !config.is_base_layer() && !self.layer_orders.contains_key(&config.layer_name) {
            self.layer_orders
                .insert(config.layer_name.clone(), self.next_auto_order);
            group.order = Some(self.next_auto_order);
            self.next_auto_order += 1;
        }
        self.groups.insert(config.layer_name.clone(), group);
    }

    /// Replace behavior: hand off from the group's current effective value
    /// so the takeover is continuous, then clear the incumbents.
    fn apply_replace(&mut self, builder: &mut ActiveBuilder) -> Result<(), RigError> {
        let Some(group) = self.groups.get_mut(&builder.config.layer_name) else {
            return Ok(());
        };
        let current = group.current_value();
        if builder.config.property == Property::Pos
            && builder.config.movement_type == MovementType::Relative
        {
            // Consolidate live displacement into committed and cap the total
            // at the new command's absolute displacement target.
            group.committed += current.as_pair();
            group.replace_target = Some(group.committed + builder.target_value.as_pair());
        } else {
            // The new builder animates the layer total from its current
            // effective value; the accumulator folds into that starting
            // point so nothing is counted twice.
            builder.base_value = current;
            builder.target_value =
                compute_target(&builder.config, builder.base_value, Some(current))?;
            builder.handoff = true;
            group.accumulated = None;
        }
        group.clear_builders();
        Ok(())
    }

    /// Commit-time application for position commands with no phases: emit
    /// once, bake, and skip the tick loop entirely.
    fn apply_instant_pos(&mut self, now: Instant) {
        // The builder was just pushed; find it as the newest pos builder.
        let Some((name, idx)) = self.newest_pos_builder() else {
            return;
        };
        let mut group = self.groups.remove(&name).expect("group exists");
        let builder = group.builders.remove(idx);
        let api = builder.config.api_override.as_deref();

        match builder.config.movement_type {
            MovementType::Absolute => {
                // Sync to wherever the cursor actually is first; the user may
                // have moved it since the last operation.
                if let Ok((cx, cy)) = self.backends.resolve(api).read_position() {
                    let p = Vec2::new(f64::from(cx), f64::from(cy));
                    if builder.config.mode == Some(Mode::Override) {
                        self.current_pos = Some(p);
                        self.base_pos = Some(p);
                    }
                }
                let start = self.current_pos.or(self.base_pos).unwrap_or(Vec2::ZERO);
                let new_pos = match builder.config.mode {
                    Some(Mode::Override) => builder.target_value.as_pair(),
                    other => modes::apply_position(other, builder.target_value, start),
                };
                self.current_pos = Some(new_pos);
                self.base_pos = Some(new_pos);
                let (x, y) = new_pos.round_i32();
                if let Err(e) = self.backends.resolve(api).move_absolute(x, y) {
                    tracing::warn!(target: "rig.backend", error = %e, "move_absolute_failed");
                }
                self.expected_mouse_pos = Some((x, y));
            }
            MovementType::Relative => {
                let (dx, dy) = builder.target_value.as_pair().round_i32();
                if dx != 0 || dy != 0 {
                    if let Err(e) = self.backends.resolve(api).move_relative(dx, dy) {
                        tracing::warn!(target: "rig.backend", error = %e, "move_relative_failed");
                    }
                    if let Some(cur) = self.current_pos {
                        self.current_pos = Some(cur + Vec2::new(f64::from(dx), f64::from(dy)));
                        self.base_pos = self.current_pos;
                    }
                    self.expected_mouse_pos = self.backends.resolve(api).read_position().ok();
                }
            }
        }

        // Bake and clean up like the sweep would; base position state was
        // already synchronized above.
        let _ = group.bake_builder(&builder);
        if group.should_persist() {
            self.groups.insert(name, group);
        } else {
            self.layer_orders.remove(&name);
        }
    }

    fn newest_pos_builder(&self) -> Option<(String, usize)> {
        let mut newest: Option<(String, usize, Instant)> = None;
        for (name, group) in &self.groups {
            if group.property != Property::Pos {
                continue;
            }
            for (i, b) in group.builders.iter().enumerate() {
                if b.config.is_instant()
                    && newest.as_ref().is_none_or(|(_, _, t)| b.creation_time >= *t)
                {
                    newest = Some((name.clone(), i, b.creation_time));
                }
            }
        }
        newest.map(|(n, i, _)| (n, i))
    }

    // ───────────────────────── composition ─────────────────────────

    /// Ordered group names for composition: base layers first, then
    /// modifiers ascending by order.
    fn composition_order(&self, input: InputKind) -> Vec<String> {
        let mut base = Vec::new();
        let mut modifiers = Vec::new();
        for (name, group) in &self.groups {
            if group.input_kind != input {
                continue;
            }
            if group.is_base() {
                base.push(name.clone());
            } else {
                let order = self.layer_orders.get(name).copied().unwrap_or(i32::MAX);
                modifiers.push((order, name.clone()));
            }
        }
        modifiers.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        base.extend(modifiers.into_iter().map(|(_, n)| n));
        base
    }

    /// Compose current state from base values plus every live group.
    pub fn compose(&self, input: InputKind) -> ComposedState {
        let (mut pos, mut speed, mut direction) = match input {
            InputKind::Move => (
                self.base_pos.unwrap_or(Vec2::ZERO),
                self.base_speed,
                self.base_direction,
            ),
            InputKind::Scroll => (Vec2::ZERO, self.scroll_base_speed, self.scroll_base_direction),
        };
        let mut pos_overridden = false;

        for name in self.composition_order(input) {
            let group = &self.groups[&name];
            let v = group.current_value();
            match group.property {
                Property::Speed => speed = modes::apply_scalar(group.mode, v.as_scalar(), speed),
                Property::Direction => direction = modes::apply_direction(group.mode, v, direction),
                Property::Vector => {
                    let (s, d) = modes::apply_vector(group.mode, v, speed, direction);
                    speed = s;
                    direction = d;
                }
                Property::Pos => {
                    pos = modes::apply_position(group.mode, v, pos);
                    pos_overridden |= group.mode == Some(Mode::Override);
                }
            }
        }

        ComposedState {
            pos,
            speed: speed.max(0.0),
            direction,
            pos_overridden,
        }
    }

    fn velocity(&self, input: InputKind) -> Vec2 {
        let state = self.compose(input);
        state.direction * state.speed
    }

    // ───────────────────────── tick ─────────────────────────

    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> TickOutcome {
        // (1) Delta time; the first frame only records.
        if self.last_frame_time.is_none() {
            self.last_frame_time = Some(now);
            return TickOutcome {
                callbacks: Vec::new(),
                ticking: self.should_tick(),
            };
        }
        self.last_frame_time = Some(now);

        // (2) Debounce wakes.
        let ready: Vec<String> = self
            .debounce_pending
            .iter()
            .filter(|(_, e)| now >= e.ready_at)
            .map(|(k, _)| k.clone())
            .collect();
        for key in ready {
            if let Some(entry) = self.debounce_pending.remove(&key) {
                tracing::trace!(target: "rig.tick", key = %key, "debounce_fired");
                if let Err(e) = self.admit_at(entry.config, now) {
                    tracing::warn!(target: "rig.admit", error = %e, "debounced_admission_failed");
                }
            }
        }

        // (3) Manual-movement detection.
        let suppress_movement = self.sync_manual(now);

        // (4) Advance every builder; collect then-callbacks by crossed phase.
        let mut phase_callbacks: Vec<PhaseCallback> = Vec::new();
        for group in self.groups.values_mut() {
            for (idx, phases) in group.advance_all(now) {
                for phase in phases {
                    phase_callbacks.extend(group.builders[idx].take_callbacks_for(phase));
                }
            }
        }

        if !suppress_movement {
            self.emit_movement(now);
        }

        // (8) Completion sweep: bake, remove, pop queues, drop dead groups.
        self.completion_sweep();

        // (10)/(5) Stop check; stop callbacks precede then-callbacks.
        let ticking = self.should_tick();
        let mut callbacks = Vec::new();
        if !ticking && self.tick_handle.is_some() {
            callbacks.extend(self.stop_ticking());
        }
        callbacks.extend(phase_callbacks);
        TickOutcome { callbacks, ticking }
    }

    /// Steps (5)–(7): velocity integration, position builders, composite
    /// emission, scroll emission.
    fn emit_movement(&mut self, _now: Instant) {
        let mut frame_delta = Vec2::ZERO;

        // (5) Velocity contribution through the subpixel accumulator.
        let vel = self.velocity(InputKind::Move);
        if !vel.is_zero() {
            let (ix, iy) = self.subpixel.adjust(vel.x, vel.y);
            frame_delta += Vec2::new(f64::from(ix), f64::from(iy));
        }

        // Scroll channel: integrate and emit independently of the pointer.
        let scroll_vel = self.velocity(InputKind::Scroll);
        if !scroll_vel.is_zero() {
            let (sx, sy) = self.scroll_subpixel.adjust(scroll_vel.x, scroll_vel.y);
            if sx != 0 || sy != 0 {
                let by_lines = self.scroll_by_lines;
                let api = self.live_api_override();
                if let Err(e) = self
                    .backends
                    .resolve(api.as_deref())
                    .scroll(sx, sy, by_lines)
                {
                    tracing::warn!(target: "rig.backend", error = %e, "scroll_failed");
                }
            }
        }

        // (6) Position builders: absolute target (last one wins) plus
        // relative integer deltas tracked per builder.
        let mut absolute_target: Option<Vec2> = None;
        for name in self.composition_order(InputKind::Move) {
            let group = self.groups.get_mut(&name).expect("ordered name exists");
            if group.property != Property::Pos || group.builders.is_empty() {
                continue;
            }
            match group.builders[0].config.movement_type {
                MovementType::Absolute => {
                    absolute_target = Some(group.current_value().as_pair());
                }
                MovementType::Relative => {
                    for builder in &mut group.builders {
                        let cur = builder.value().as_pair();
                        let target_int =
                            Vec2::new(cur.x.round(), cur.y.round());
                        let step = target_int - builder.total_emitted;
                        frame_delta += step;
                        builder.total_emitted = target_int;
                    }
                }
            }
        }

        // (7) Composite emission.
        let api = self.live_api_override();
        if let Some(target) = absolute_target {
            let final_pos = target + frame_delta;
            self.current_pos = Some(final_pos);
            let (nx, ny) = final_pos.round_i32();
            let backend = self.backends.resolve(api.as_deref());
            let changed = match backend.read_position() {
                Ok((cx, cy)) => (cx, cy) != (nx, ny),
                Err(_) => true,
            };
            if changed {
                if let Err(e) = backend.move_absolute(nx, ny) {
                    tracing::warn!(target: "rig.backend", error = %e, "move_absolute_failed");
                }
                self.expected_mouse_pos = Some((nx, ny));
            }
        } else if !frame_delta.is_zero() {
            let (dx, dy) = frame_delta.round_i32();
            let backend = self.backends.resolve(api.as_deref());
            if let Err(e) = backend.move_relative(dx, dy) {
                tracing::warn!(target: "rig.backend", error = %e, "move_relative_failed");
            }
            if let Some(cur) = self.current_pos {
                self.current_pos = Some(cur + Vec2::new(f64::from(dx), f64::from(dy)));
            }
            self.expected_mouse_pos = self
                .backends
                .resolve(api.as_deref())
                .read_position()
                .ok();
        }
    }

    fn completion_sweep(&mut self) {
        let names: Vec<String> = self.groups.keys().cloned().collect();
        let mut base_bakes: Vec<(Property, InputKind, Value)> = Vec::new();

        for name in names {
            let Some(mut group) = self.groups.remove(&name) else {
                continue;
            };
            let mut removed_any = false;
            let mut i = 0;
            while i < group.builders.len() {
                let remove = {
                    let b = &group.builders[i];
                    b.marked_for_removal || b.lifecycle.should_be_removed(b.is_user_named())
                };
                if remove {
                    let builder = group.builders.remove(i);
                    let outcome = group.bake_builder(&builder);
                    tracing::trace!(
                        target: "rig.tick",
                        layer = %group.layer_name,
                        outcome = ?outcome,
                        "builder_completed"
                    );
                    if outcome == BakeOutcome::BakeToBase {
                        base_bakes.push((group.property, group.input_kind, builder.value()));
                    }
                    removed_any = true;
                    if !group.pending_queue.is_empty() {
                        group.start_next_queued();
                    }
                } else {
                    i += 1;
                }
            }
            if removed_any {
                group.recalculate_final_target();
            }
            if group.should_persist() {
                self.groups.insert(name, group);
            } else {
                tracing::trace!(target: "rig.tick", layer = %name, "group_destroyed");
                self.layer_orders.remove(&name);
                self.clear_policy_state(&name);
            }
        }

        for (property, input, value) in base_bakes {
            self.bake_base_value(property, input, value);
        }
    }

    fn clear_policy_state(&mut self, layer: &str) {
        let prefix = format!("{layer}_");
        self.throttle_times.retain(|k, _| !k.starts_with(&prefix));
        let cache_prefix = format!("{layer}|");
        self.rate_cache.retain(|k, _| !k.starts_with(&cache_prefix));
    }

    fn bake_base_value(&mut self, property: Property, input: InputKind, value: Value) {
        match (property, input) {
            (Property::Speed, InputKind::Move) => self.base_speed = value.as_scalar().max(0.0),
            (Property::Direction, InputKind::Move) => {
                self.base_direction = value.as_pair().normalized();
            }
            (Property::Vector, InputKind::Move) => {
                let (s, d) = modes::decompose(value.as_pair(), self.base_direction);
                self.base_speed = s;
                self.base_direction = d;
            }
            (Property::Speed, InputKind::Scroll) => {
                self.scroll_base_speed = value.as_scalar().max(0.0);
            }
            (Property::Direction, InputKind::Scroll) => {
                self.scroll_base_direction = value.as_pair().normalized();
            }
            (Property::Vector, InputKind::Scroll) => {
                let (s, d) = modes::decompose(value.as_pair(), self.scroll_base_direction);
                self.scroll_base_speed = s;
                self.scroll_base_direction = d;
            }
            (Property::Pos, _) => {
                if self.base_speed != 0.0 && self.current_pos.is_some() {
                    // Velocity is live; snapping to the target would jump.
                    self.base_pos = self.current_pos;
                } else {
                    self.base_pos = Some(value.as_pair());
                    self.current_pos = self.base_pos;
                }
            }
        }
    }

    fn sync_manual(&mut self, now: Instant) -> bool {
        if !self.config.detect_manual_movement {
            return false;
        }
        if let Some(t) = self.manual_moved_at {
            let elapsed_ms = now.saturating_duration_since(t).as_secs_f64() * 1000.0;
            if elapsed_ms < self.config.manual_override_ms {
                return true;
            }
            self.manual_moved_at = None;
            self.expected_mouse_pos = None;
        }
        if let Some((ex, ey)) = self.expected_mouse_pos {
            if let Ok((cx, cy)) = self.backends.default_backend().read_position() {
                if (cx, cy) != (ex, ey) {
                    tracing::debug!(
                        target: "rig.tick",
                        expected = ?(ex, ey),
                        observed = ?(cx, cy),
                        "manual_movement_detected"
                    );
                    let p = Vec2::new(f64::from(cx), f64::from(cy));
                    if self.current_pos.is_some() {
                        self.current_pos = Some(p);
                        self.base_pos = Some(p);
                    }
                    self.manual_moved_at = Some(now);
                    self.expected_mouse_pos = None;
                    return true;
                }
            }
        }
        false
    }

    /// Most recently admitted live api override, if any (last one wins).
    fn live_api_override(&self) -> Option<String> {
        let mut best: Option<(Instant, &str)> = None;
        for group in self.groups.values() {
            for b in &group.builders {
                if let Some(api) = b.config.api_override.as_deref() {
                    if best.is_none_or(|(t, _)| b.creation_time >= t) {
                        best = Some((b.creation_time, api));
                    }
                }
            }
        }
        best.map(|(_, api)| api.to_string())
    }

    // ───────────────────────── tick lifecycle ─────────────────────────

    /// The loop must run while any lifecycle is incomplete, any velocity
    /// source exists, or deferred work is pending.
    pub fn should_tick(&self) -> bool {
        if self.base_speed != 0.0 || self.scroll_base_speed != 0.0 {
            return true;
        }
        if !self.debounce_pending.is_empty() {
            return true;
        }
        for group in self.groups.values() {
            if matches!(group.property, Property::Speed | Property::Vector) {
                return true;
            }
            if !group.pending_queue.is_empty() {
                return true;
            }
            if group.builders.iter().any(|b| !b.lifecycle.is_complete()) {
                return true;
            }
        }
        false
    }

    fn ensure_ticking(&mut self, _now: Instant) {
        if self.tick_handle.is_some() {
            return;
        }
        let interval = Duration::from_millis(self.config.tick_interval_ms);
        self.tick_handle = Some(self.scheduler.schedule(interval));
        self.last_frame_time = None;
        tracing::debug!(target: "rig.tick", ?interval, "tick_loop_started");

        // Absolute position work needs the tracker synced to reality.
        let has_absolute = self.groups.values().any(|g| {
            g.property == Property::Pos
                && g.builders
                    .iter()
                    .any(|b| b.config.movement_type == MovementType::Absolute)
        });
        if has_absolute {
            if let Ok((x, y)) = self.backends.default_backend().read_position() {
                let p = Vec2::new(f64::from(x), f64::from(y));
                if self.current_pos.is_none() {
                    self.current_pos = Some(p);
                    self.base_pos = Some(p);
                }
            }
        }
    }

    /// Cancel the loop and return the stop callbacks to fire.
    fn stop_ticking(&mut self) -> Vec<PhaseCallback> {
        if let Some(handle) = self.tick_handle.take() {
            self.scheduler.cancel(handle);
        }
        self.last_frame_time = None;
        self.subpixel.reset();
        self.scroll_subpixel.reset();
        self.expected_mouse_pos = None;
        tracing::debug!(target: "rig.tick", "tick_loop_stopped");

        // Re-sync to wherever the cursor physically ended up; beyond a small
        // tolerance the difference means the user moved it.
        if self.current_pos.is_some() {
            if let Ok((x, y)) = self.backends.default_backend().read_position() {
                let observed = Vec2::new(f64::from(x), f64::from(y));
                self.current_pos = Some(observed);
                if let Some(base) = self.base_pos {
                    let drift = (observed.x - base.x).abs() + (observed.y - base.y).abs();
                    if drift > STOP_SYNC_TOLERANCE_PX {
                        self.base_pos = Some(observed);
                    }
                }
            }
        }
        std::mem::take(&mut self.stop_callbacks)
    }

    pub fn is_ticking(&self) -> bool {
        self.tick_handle.is_some()
    }

    pub fn add_stop_callback(&mut self, callback: PhaseCallback) {
        self.stop_callbacks.push(callback);
    }

    // ───────────────────────── special operations ─────────────────────────

    /// Convert a layer's effective value into a self-decaying velocity
    /// contribution on a fresh transient layer; consumes the source.
    pub fn emit_layer(
        &mut self,
        name: &str,
        ms: f64,
        easing: Easing,
        now: Instant,
    ) -> Result<String, RigError> {
        let group = self
            .groups
            .get(name)
            .ok_or_else(|| AdmitError::UnknownLayer(name.to_string()))?;
        let valid = matches!(
            (group.property, group.mode),
            (Property::Vector, Some(Mode::Offset | Mode::Override))
                | (Property::Speed, Some(Mode::Offset))
        );
        if !valid {
            return Err(AdmitError::invalid_emit(name, group.property, group.mode).into());
        }

        let input = group.input_kind;
        let velocity = match group.property {
            Property::Vector => group.current_value().as_pair(),
            Property::Speed => {
                // Direction is sampled now, at emission, fully composed.
                let dir = self.compose(input).direction;
                dir * group.current_value().as_scalar()
            }
            _ => unreachable!("validated above"),
        };

        self.remove_layer(name, false);

        let emit_name = format!("emit.{name}.{}", self.next_unique());
        let mut config = BuilderConfig::new(Property::Vector, Operator::To, Value::Pair(velocity));
        config.layer_name = emit_name.clone();
        config.layer_kind = LayerKind::Emit;
        config.mode = Some(Mode::Offset);
        config.revert_ms = Some(ms);
        config.revert_easing = easing;
        config.input_kind = input;
        tracing::debug!(target: "rig.state", source = name, emit = %emit_name, "layer_emitted");
        self.admit_at(config, now)?;
        Ok(emit_name)
    }

    /// Duplicate a user-named layer under a new (or generated) name.
    pub fn copy_layer(
        &mut self,
        name: &str,
        new_name: Option<&str>,
        now: Instant,
    ) -> Result<String, RigError> {
        {
            let group = self
                .groups
                .get(name)
                .ok_or_else(|| AdmitError::UnknownLayer(name.to_string()))?;
            if group.kind != LayerKind::UserModifier {
                return Err(AdmitError::RequiresNamedLayer { op: "copy" }.into());
            }
        }
        let copy_name = match new_name {
            Some(n) => n.to_string(),
            None => format!("copy.{name}.{}", self.next_unique()),
        };
        let group = self
            .groups
            .get(name)
            .ok_or_else(|| AdmitError::UnknownLayer(name.to_string()))?;
        let copy = group.duplicate(&copy_name, now);
        if let Some(order) = copy.order {
            self.layer_orders.insert(copy_name.clone(), order);
        }
        self.groups.insert(copy_name.clone(), copy);
        Ok(copy_name)
    }

    /// Negate a direction or vector layer in place. A non-zero `ms` bridges
    /// the discontinuity: two copies of the old contribution are emitted as
    /// decaying momentum, so the net value crosses over smoothly.
    pub fn reverse_layer(
        &mut self,
        name: &str,
        ms: Option<f64>,
        easing: Easing,
        now: Instant,
    ) -> Result<(), RigError> {
        let group = self
            .groups
            .get(name)
            .ok_or_else(|| AdmitError::UnknownLayer(name.to_string()))?;
        if group.kind != LayerKind::UserModifier {
            return Err(AdmitError::RequiresNamedLayer { op: "reverse" }.into());
        }
        if !matches!(group.property, Property::Direction | Property::Vector) {
            return Err(AdmitError::InvalidLayerOp {
                op: "reverse",
                property: group.property,
            }
            .into());
        }
        let bridgeable = group.property == Property::Vector;

        if let Some(ms) = ms {
            if ms > 0.0 && bridgeable {
                for _ in 0..2 {
                    let copy = self.copy_layer(name, None, now)?;
                    self.emit_layer(&copy, ms, easing, now)?;
                }
            }
        }

        let group = self
            .groups
            .get_mut(name)
            .ok_or_else(|| AdmitError::UnknownLayer(name.to_string()))?;
        group.negate();
        self.ensure_ticking(now);
        Ok(())
    }

    /// Start the revert phase on every builder in a layer.
    pub fn revert_layer(
        &mut self,
        name: &str,
        ms: Option<f64>,
        easing: Easing,
        now: Instant,
    ) -> Result<(), RigError> {
        let group = self
            .groups
            .get_mut(name)
            .ok_or_else(|| AdmitError::UnknownLayer(name.to_string()))?;
        for builder in &mut group.builders {
            builder.lifecycle.trigger_revert(now, ms, easing);
        }
        self.ensure_ticking(now);
        Ok(())
    }

    /// Remove a layer group. With `bake`, its current effective value folds
    /// into base state first (base groups always write base).
    pub fn remove_layer(&mut self, name: &str, bake: bool) {
        let Some(group) = self.groups.remove(name) else {
            return;
        };
        if bake {
            let v = group.current_value();
            if group.is_base() {
                self.bake_base_value(group.property, group.input_kind, v);
            } else {
                self.fold_into_base(group.property, group.input_kind, v, group.mode);
            }
        }
        self.layer_orders.remove(name);
        self.clear_policy_state(name);
    }

    /// Fold a modifier value into global base through its mode.
    fn fold_into_base(
        &mut self,
        property: Property,
        input: InputKind,
        value: Value,
        mode: Option<Mode>,
    ) {
        match (property, input) {
            (Property::Speed, InputKind::Move) => {
                self.base_speed = modes::apply_scalar(mode, value.as_scalar(), self.base_speed).max(0.0);
            }
            (Property::Direction, InputKind::Move) => {
                self.base_direction = modes::apply_direction(mode, value, self.base_direction);
            }
            (Property::Vector, InputKind::Move) => {
                let (s, d) =
                    modes::apply_vector(mode, value, self.base_speed, self.base_direction);
                self.base_speed = s;
                self.base_direction = d;
            }
            (Property::Speed, InputKind::Scroll) => {
                self.scroll_base_speed =
                    modes::apply_scalar(mode, value.as_scalar(), self.scroll_base_speed).max(0.0);
            }
            (Property::Direction, InputKind::Scroll) => {
                self.scroll_base_direction =
                    modes::apply_direction(mode, value, self.scroll_base_direction);
            }
            (Property::Vector, InputKind::Scroll) => {
                let (s, d) = modes::apply_vector(
                    mode,
                    value,
                    self.scroll_base_speed,
                    self.scroll_base_direction,
                );
                self.scroll_base_speed = s;
                self.scroll_base_direction = d;
            }
            (Property::Pos, _) => {
                if let Some(base) = self.base_pos {
                    self.base_pos = Some(modes::apply_position(mode, value, base));
                    self.current_pos = self.base_pos;
                } else if mode == Some(Mode::Override) {
                    self.base_pos = Some(value.as_pair());
                    self.current_pos = self.base_pos;
                }
            }
        }
    }

    /// The `bake` operator: fold the named layer (or the property's computed
    /// value) into base immediately.
    pub fn bake_property(&mut self, property: Property, layer: Option<&str>, _now: Instant) {
        if let Some(layer) = layer {
            let matches_property = self
                .groups
                .get(layer)
                .is_some_and(|g| g.property == property);
            if matches_property {
                self.remove_layer(layer, true);
            }
            return;
        }
        let state = self.compose(InputKind::Move);
        match property {
            Property::Speed => self.base_speed = state.speed,
            Property::Direction => self.base_direction = state.direction.normalized(),
            Property::Vector => {
                let (s, d) = modes::decompose(state.direction * state.speed, self.base_direction);
                self.base_speed = s;
                self.base_direction = d;
            }
            Property::Pos => {
                self.base_pos = Some(state.pos);
                self.current_pos = self.base_pos;
            }
        }
        let to_remove: Vec<String> = self
            .groups
            .iter()
            .filter(|(_, g)| g.is_base() && g.property == property)
            .map(|(n, _)| n.clone())
            .collect();
        for name in to_remove {
            self.remove_layer(&name, false);
        }
    }

    /// Bake every live group into base state and remove it.
    pub fn bake_all(&mut self) {
        let names: Vec<String> = self.groups.keys().cloned().collect();
        for name in names {
            self.remove_layer(&name, true);
        }
    }

    /// Stop everything: bake base groups, clear all layers, decelerate to
    /// zero (optionally over `ms`). Returns callbacks to fire if the loop
    /// stopped immediately.
    pub fn stop(&mut self, ms: Option<f64>, easing: Easing, now: Instant) -> Vec<PhaseCallback> {
        let names: Vec<String> = self.groups.keys().cloned().collect();
        for name in &names {
            let is_base = self.groups.get(name).is_some_and(LayerGroup::is_base);
            if is_base {
                self.remove_layer(name, true);
            }
        }
        self.groups.clear();
        self.layer_orders.clear();
        self.throttle_times.clear();
        self.rate_cache.clear();
        self.debounce_pending.clear();

        match ms {
            Some(ms) if ms > 0.0 => {
                let mut config =
                    BuilderConfig::new(Property::Speed, Operator::To, Value::Scalar(0.0));
                config.over_ms = Some(ms);
                config.over_easing = easing;
                if let Err(e) = self.admit_at(config, now) {
                    tracing::warn!(target: "rig.state", error = %e, "stop_transition_failed");
                }
                Vec::new()
            }
            _ => {
                self.base_speed = 0.0;
                self.scroll_base_speed = 0.0;
                if !self.should_tick() && self.tick_handle.is_some() {
                    self.stop_ticking()
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Destroy all state, back to construction defaults. Fires nothing; the
    /// returned callbacks are the pending stop callbacks for the caller to
    /// decide over.
    pub fn reset(&mut self) -> Vec<PhaseCallback> {
        let callbacks = self.stop_ticking();
        self.groups.clear();
        self.layer_orders.clear();
        self.throttle_times.clear();
        self.rate_cache.clear();
        self.debounce_pending.clear();
        self.base_speed = 0.0;
        self.base_direction = Vec2::new(1.0, 0.0);
        self.scroll_base_speed = 0.0;
        self.scroll_base_direction = Vec2::new(0.0, 1.0);
        self.base_pos = None;
        self.current_pos = None;
        self.manual_moved_at = None;
        self.expected_mouse_pos = None;
        self.next_auto_order = 0;
        self.unique_counter = 0;
        tracing::info!(target: "rig.state", "rig_reset");
        callbacks
    }

    /// Clamp a layer's output magnitude.
    pub fn set_layer_limits(
        &mut self,
        name: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), RigError> {
        let group = self
            .groups
            .get_mut(name)
            .ok_or_else(|| AdmitError::UnknownLayer(name.to_string()))?;
        group.min_value = min;
        group.max_value = max;
        Ok(())
    }

    // ───────────────────────── reads ─────────────────────────

    pub fn pos(&self) -> Vec2 {
        self.compose(InputKind::Move).pos
    }

    pub fn speed(&self) -> f64 {
        self.compose(InputKind::Move).speed
    }

    pub fn direction(&self) -> Vec2 {
        self.compose(InputKind::Move).direction
    }

    pub fn vector(&self) -> Vec2 {
        self.velocity(InputKind::Move)
    }

    pub fn direction_cardinal(&self) -> Option<Cardinal> {
        Cardinal::from_direction(self.direction())
    }

    pub fn base_pos(&self) -> Option<Vec2> {
        self.base_pos
    }

    pub fn base_speed(&self) -> f64 {
        self.base_speed
    }

    pub fn base_direction(&self) -> Vec2 {
        self.base_direction
    }

    pub fn base_vector(&self) -> Vec2 {
        self.base_direction * self.base_speed
    }

    pub fn scroll_vector(&self) -> Vec2 {
        self.velocity(InputKind::Scroll)
    }

    /// Live non-base layer names.
    pub fn layers(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, g)| !g.is_base())
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn time_alive(&self, layer: &str, now: Instant) -> Option<f64> {
        let group = self.groups.get(layer)?;
        let builder = group.builders.first()?;
        Some(builder.time_alive(now))
    }

    pub fn layer_info(&self, name: &str, now: Instant) -> Option<LayerInfo> {
        let group = self.groups.get(name)?;
        let builder = group.builders.first();
        Some(LayerInfo {
            property: group.property,
            mode: group.mode,
            operator: builder.map(|b| b.config.operator),
            value: group.current_value(),
            target: group.final_target,
            time_alive: builder.map_or_else(
                || now.saturating_duration_since(group.creation_time).as_secs_f64(),
                |b| b.time_alive(now),
            ),
            time_left_ms: builder.map_or(0.0, |b| b.lifecycle.time_left_ms(now)),
            order: self.layer_orders.get(name).copied().or(group.order),
        })
    }

    #[cfg(test)]
    pub(crate) fn group(&self, name: &str) -> Option<&LayerGroup> {
        self.groups.get(name)
    }
}

// ───────────────────────── pure helpers ─────────────────────────

/// Cache key for rate-based coalescing: layer, property, operator, mode and
/// the normalized requested value.
fn rate_cache_key(config: &BuilderConfig) -> Option<String> {
    if config.over_rate.is_none() && config.revert_rate.is_none() {
        return None;
    }
    let value_part = match config.value {
        Value::Scalar(s) => format!("{:.3}", s),
        Value::Pair(v) => format!("{:.3},{:.3}", v.x, v.y),
    };
    Some(format!(
        "{}|{}|{}|{}|{}",
        config.layer_name,
        config.property,
        config.operator,
        config.mode.map_or("base", Mode::name),
        value_part
    ))
}

/// Commit-time lowering of the operator onto the captured base value.
///
/// What the target *means* depends on the mode: an absolute destination for
/// override, a contribution for offset, a factor for scale. `group_current`
/// feeds the offset-mode mul/div forms, which rescale the layer's current
/// effective contribution.
fn compute_target(
    config: &BuilderConfig,
    base: Value,
    group_current: Option<Value>,
) -> Result<Value, RigError> {
    let mode = config.mode.unwrap_or(Mode::Override);
    let op = config.operator;
    let v = config.value;

    let target = match mode {
        Mode::Override => match config.property {
            Property::Speed => Value::Scalar(scalar_op(op, base.as_scalar(), v.as_scalar())),
            Property::Direction => {
                let base_dir = base.as_pair();
                match op {
                    Operator::To => Value::Pair(v.as_pair().normalized()),
                    Operator::Add | Operator::Sub => {
                        let deg = if op == Operator::Sub {
                            -v.as_scalar()
                        } else {
                            v.as_scalar()
                        };
                        Value::Pair(base_dir.rotated_rad(deg.to_radians()))
                    }
                    Operator::Mul => {
                        Value::Pair(Vec2::from_angle_rad(base_dir.angle_rad() * v.as_scalar()))
                    }
                    Operator::Div => {
                        Value::Pair(Vec2::from_angle_rad(base_dir.angle_rad() / v.as_scalar()))
                    }
                    Operator::Bake => base,
                }
            }
            Property::Pos => match op {
                Operator::To => Value::Pair(v.as_pair()),
                Operator::Add => Value::Pair(base.as_pair() + v.as_pair()),
                _ => base,
            },
            Property::Vector => {
                let base_vel = base.as_pair();
                match op {
                    Operator::To => Value::Pair(v.as_pair()),
                    Operator::Add => Value::Pair(base_vel + v.as_pair()),
                    Operator::Sub => Value::Pair(base_vel - v.as_pair()),
                    Operator::Mul => Value::Pair(base_vel * v.as_scalar()),
                    Operator::Div => Value::Pair(base_vel / v.as_scalar()),
                    Operator::Bake => base,
                }
            }
        },
        Mode::Offset => {
            let current = group_current.unwrap_or(match v {
                Value::Scalar(_) => Value::Scalar(0.0),
                Value::Pair(_) => Value::ZERO_PAIR,
            });
            match op {
                Operator::To | Operator::Add => v,
                Operator::Sub => v.negated(),
                Operator::Mul => scale_contribution(current, v.as_scalar() - 1.0),
                Operator::Div => scale_contribution(current, 1.0 / v.as_scalar() - 1.0),
                Operator::Bake => v,
            }
        }
        Mode::Scale => {
            let f = v.as_scalar();
            Value::Scalar(match op {
                Operator::To | Operator::Mul => f,
                Operator::Div => 1.0 / f,
                Operator::Add => 1.0 + f,
                Operator::Sub => 1.0 - f,
                Operator::Bake => 1.0,
            })
        }
    };
    Ok(target)
}

fn scalar_op(op: Operator, base: f64, v: f64) -> f64 {
    match op {
        Operator::To => v,
        Operator::Add => base + v,
        Operator::Sub => base - v,
        Operator::Mul => base * v,
        Operator::Div => base / v,
        Operator::Bake => base,
    }
}

fn scale_contribution(current: Value, factor: f64) -> Value {
    match current {
        Value::Scalar(s) => Value::Scalar(s * factor),
        Value::Pair(p) => Value::Pair(p * factor),
    }
}

/// Lower rate parameters into concrete durations. The rate fields stay set
/// so the rate cache can still recognize the command; the chain guarantees
/// a user never supplies both forms on one phase.
fn lower_rates(config: &mut BuilderConfig, base: Value, target: Value) {
    if let Some(r) = config.over_rate {
        config.over_ms = Some(rate_for(config, base, target, r));
    }
    if let Some(r) = config.revert_rate {
        config.revert_ms = Some(rate_for(config, target, base, r));
    }
}

fn rate_for(config: &BuilderConfig, from: Value, to: Value, rate_per_s: f64) -> f64 {
    match config.property {
        Property::Speed => rate::speed_duration(from.as_scalar(), to.as_scalar(), rate_per_s),
        Property::Direction => match config.operator {
            Operator::Add | Operator::Sub => {
                rate::direction_by_duration(config.value.as_scalar(), rate_per_s)
            }
            _ => match (from, to) {
                (Value::Pair(a), Value::Pair(b)) => rate::direction_duration(a, b, rate_per_s),
                _ => rate::direction_by_duration(to.as_scalar() - from.as_scalar(), rate_per_s),
            },
        },
        Property::Pos => match config.operator {
            Operator::Add => rate::position_by_duration(config.value.as_pair(), rate_per_s),
            _ => rate::position_duration(from.as_pair(), to.as_pair(), rate_per_s),
        },
        Property::Vector => rate::vector_duration(from.as_pair(), to.as_pair(), rate_per_s),
    }
}

#[cfg(test)]
mod tests;
