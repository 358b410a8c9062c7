//! Layer group: the container for every builder sharing one layer name.
//!
//! A group aggregates its builders' contributions onto an accumulated value,
//! clamps the result against optional constraints, bakes completed builders
//! in, and runs the per-layer queue. Base groups are thinner: their own
//! accumulator stays neutral and completion bakes to global base state
//! instead (handled by the rig).

use std::collections::VecDeque;
use std::time::Instant;

use core_model::{
    BuilderConfig, EPSILON, InputKind, LayerKind, Mode, Phase, Property, Value, Vec2, value,
};

use crate::active::ActiveBuilder;

/// What happened when a completed builder was folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeOutcome {
    /// Base layer: the rig must bake the group's value into global state.
    BakeToBase,
    /// Modifier layer: the value landed in the group accumulator.
    BakedToGroup,
    /// The builder reverted; nothing permanent remains.
    Reverted,
}

pub struct LayerGroup {
    pub layer_name: String,
    pub property: Property,
    pub mode: Option<Mode>,
    pub kind: LayerKind,
    pub input_kind: InputKind,
    pub order: Option<i32>,
    pub is_emit: bool,
    pub creation_time: Instant,
    pub builders: Vec<ActiveBuilder>,
    /// Accumulated state persisting after builders complete. `None` until
    /// the first bake decides the shape (a direction-offset group may
    /// accumulate either angles or vectors).
    pub accumulated: Option<Value>,
    /// Physical movement already consolidated (pos only).
    pub committed: Vec2,
    /// Absolute displacement cap installed by a replace handoff (pos.offset).
    pub replace_target: Option<Vec2>,
    /// Cached value the accumulator will reach once all builders complete
    /// without reverting.
    pub final_target: Option<Value>,
    pub pending_queue: VecDeque<ActiveBuilder>,
    pub is_queue_active: bool,
    /// Output clamp: scalars clamp directly, pairs clamp magnitude.
    pub max_value: Option<f64>,
    pub min_value: Option<f64>,
}

impl LayerGroup {
    pub fn for_config(config: &BuilderConfig, now: Instant) -> Self {
        Self {
            layer_name: config.layer_name.clone(),
            property: config.property,
            mode: config.mode,
            kind: config.layer_kind,
            input_kind: config.input_kind,
            order: config.order,
            is_emit: config.layer_kind == LayerKind::Emit,
            creation_time: now,
            builders: Vec::new(),
            accumulated: None,
            committed: Vec2::ZERO,
            replace_target: None,
            final_target: None,
            pending_queue: VecDeque::new(),
            is_queue_active: false,
            max_value: None,
            min_value: None,
        }
    }

    pub fn is_base(&self) -> bool {
        self.kind == LayerKind::Base
    }

    pub fn add_builder(&mut self, builder: ActiveBuilder) {
        self.builders.push(builder);
        self.recalculate_final_target();
    }

    /// Drop all active builders (replace behavior).
    pub fn clear_builders(&mut self) {
        self.builders.clear();
        self.recalculate_final_target();
    }

    fn apply_constraints(&self, value: Value) -> Value {
        if self.max_value.is_none() && self.min_value.is_none() {
            return value;
        }
        match value {
            Value::Scalar(mut s) => {
                if let Some(max) = self.max_value {
                    s = s.min(max);
                }
                if let Some(min) = self.min_value {
                    s = s.max(min);
                }
                Value::Scalar(s)
            }
            Value::Pair(v) => {
                let mag = v.magnitude();
                if mag < EPSILON {
                    return Value::Pair(v);
                }
                if let Some(max) = self.max_value {
                    if mag > max {
                        return Value::Pair(v * (max / mag));
                    }
                }
                if let Some(min) = self.min_value {
                    if mag < min {
                        return Value::Pair(v * (min / mag));
                    }
                }
                Value::Pair(v)
            }
        }
    }

    /// Aggregated value: accumulator plus every active builder, constrained.
    ///
    /// Base groups ignore the accumulator and report the most recent
    /// builder's value directly — modes do not apply to a base layer's own
    /// accumulation.
    pub fn current_value(&self) -> Value {
        if self.is_base() {
            let last = self
                .builders
                .last()
                .map_or_else(|| self.property.neutral(), ActiveBuilder::value);
            return self.apply_constraints(last);
        }

        let mut result = self.accumulated;
        for builder in &self.builders {
            result = Some(value::combine(result, builder.value(), builder.config.mode));
        }
        let mut result = result.unwrap_or_else(|| self.neutral_accumulator());

        // Replace clamp (pos.offset): the total displacement, committed plus
        // live, never overshoots the handoff target on either axis.
        if let Some(target) = self.replace_target {
            if let Value::Pair(v) = result {
                let total = self.committed + v;
                let clamped = clamp_toward(self.committed, total, target);
                result = Value::Pair(clamped - self.committed);
            }
        }

        self.apply_constraints(result)
    }

    fn neutral_accumulator(&self) -> Value {
        match self.mode {
            Some(Mode::Scale) => Value::Scalar(1.0),
            _ => match self.property {
                Property::Speed => Value::Scalar(0.0),
                _ => Value::Pair(Vec2::ZERO),
            },
        }
    }

    /// Fold a completed builder into the accumulator.
    pub fn bake_builder(&mut self, builder: &ActiveBuilder) -> BakeOutcome {
        if builder.lifecycle.has_reverted() && !builder.config.bake_override {
            if self.is_base() {
                return BakeOutcome::BakeToBase;
            }
            // A reverted modifier leaves the accumulator exactly where the
            // revert landed it: nothing to fold.
            return BakeOutcome::Reverted;
        }

        if self.is_base() {
            return BakeOutcome::BakeToBase;
        }

        // Relative position work is physical movement that has already been
        // emitted; it consolidates into `committed` rather than the live
        // accumulator, so a drained queue leaves the group neutral.
        if self.property == Property::Pos
            && builder.config.movement_type == core_model::MovementType::Relative
        {
            let before = self.committed;
            self.committed = before + builder.value().as_pair();
            if let Some(target) = self.replace_target.take() {
                self.committed = clamp_toward(before, self.committed, target);
            }
            return BakeOutcome::BakedToGroup;
        }

        let folded = value::combine(self.accumulated, builder.value(), builder.config.mode);
        self.accumulated = Some(self.apply_constraints(folded));

        // Replace handoff consolidation (pos.offset): move the accumulated
        // displacement into committed, clamped toward the handoff target.
        if let Some(target) = self.replace_target.take() {
            if let Some(Value::Pair(v)) = self.accumulated {
                let total = self.committed + v;
                self.committed = clamp_toward(self.committed, total, target);
                self.accumulated = Some(Value::Pair(Vec2::ZERO));
            }
        }

        BakeOutcome::BakedToGroup
    }

    /// Recompute the cached post-completion value.
    pub fn recalculate_final_target(&mut self) {
        if self.builders.is_empty() {
            self.final_target = None;
            return;
        }
        if self.is_base() {
            self.final_target = self.builders.last().map(|b| b.target_value);
            return;
        }
        let mut result = self.accumulated;
        for builder in &self.builders {
            result = Some(value::combine(
                result,
                builder.target_value,
                builder.config.mode,
            ));
        }
        self.final_target = result;
    }

    /// Whether the group should stay alive: any live builder, or a modifier
    /// accumulator that is not neutral. Base groups die with their builders.
    pub fn should_persist(&self) -> bool {
        if !self.builders.is_empty() || !self.pending_queue.is_empty() {
            return true;
        }
        if self.is_base() {
            return false;
        }
        match self.accumulated {
            None => false,
            Some(v) => !v.is_neutral(self.mode),
        }
    }

    /// Advance all builders; returns `(builder_index, phases_crossed)` for
    /// callback collection.
    pub fn advance_all(&mut self, now: Instant) -> Vec<(usize, Vec<Phase>)> {
        let mut crossings = Vec::new();
        for (i, builder) in self.builders.iter_mut().enumerate() {
            let crossed = builder.advance(now);
            if !crossed.is_empty() {
                crossings.push((i, crossed));
            }
        }
        crossings
    }

    /// Pop the next queued builder into the active set, if any.
    pub fn start_next_queued(&mut self) -> bool {
        match self.pending_queue.pop_front() {
            Some(builder) => {
                self.is_queue_active = true;
                self.add_builder(builder);
                true
            }
            None => {
                self.is_queue_active = false;
                false
            }
        }
    }

    /// Total occupancy the queue cap is checked against.
    pub fn queue_occupancy(&self) -> usize {
        self.builders.len() + self.pending_queue.len()
    }

    /// Duplicate this group under a new name. Builders are cloned without
    /// their callbacks; accumulated state, constraints and the replace
    /// handoff all carry over.
    pub fn duplicate(&self, new_name: &str, now: Instant) -> Self {
        let mut builders: Vec<ActiveBuilder> = self
            .builders
            .iter()
            .map(ActiveBuilder::clone_detached)
            .collect();
        for b in &mut builders {
            b.config.layer_name = new_name.to_string();
        }
        Self {
            layer_name: new_name.to_string(),
            property: self.property,
            mode: self.mode,
            kind: LayerKind::UserModifier,
            input_kind: self.input_kind,
            order: self.order,
            is_emit: false,
            creation_time: now,
            builders,
            accumulated: self.accumulated,
            committed: self.committed,
            replace_target: self.replace_target,
            final_target: self.final_target,
            pending_queue: VecDeque::new(),
            is_queue_active: false,
            max_value: self.max_value,
            min_value: self.min_value,
        }
    }

    /// Negate accumulated value and every builder's endpoints (`reverse`).
    pub fn negate(&mut self) {
        if let Some(v) = self.accumulated {
            self.accumulated = Some(v.negated());
        }
        for builder in &mut self.builders {
            builder.negate();
        }
        self.recalculate_final_target();
    }
}

/// Clamp `total` so it never passes `target` on the far side of `from`,
/// per axis.
fn clamp_toward(from: Vec2, total: Vec2, target: Vec2) -> Vec2 {
    let clamp_axis = |from: f64, total: f64, target: f64| {
        if from < target {
            total.min(target)
        } else if from > target {
            total.max(target)
        } else {
            target
        }
    };
    Vec2::new(
        clamp_axis(from.x, total.x, target.x),
        clamp_axis(from.y, total.y, target.y),
    )
}
