//! The declarative record of one command.
//!
//! A fluent chain does nothing but fill in a `BuilderConfig`; the config is
//! the single artifact handed to admission. Everything here is data — the
//! enums, the operator×property validity table, and the config record with
//! its phase timings, behavior and callbacks.

use std::fmt;

use crate::easing::{Easing, Interpolation};
use crate::error::ChainError;
use crate::value::{Mode, Value};
use crate::vec2::Vec2;

macro_rules! fmt_via_name {
    () => {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    };
}

/// The four animatable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Pos,
    Speed,
    Direction,
    Vector,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pos => "pos",
            Self::Speed => "speed",
            Self::Direction => "direction",
            Self::Vector => "vector",
        }
    }

    /// Whether groups of this property feed the velocity integrator.
    pub fn affects_velocity(self) -> bool {
        matches!(self, Self::Speed | Self::Direction | Self::Vector)
    }

    /// The value a layer of this property contributes when nothing is active.
    pub fn neutral(self) -> Value {
        match self {
            Self::Speed => Value::Scalar(0.0),
            Self::Direction => Value::Pair(Vec2::new(1.0, 0.0)),
            Self::Pos | Self::Vector => Value::Pair(Vec2::ZERO),
        }
    }
}

impl fmt::Display for Property {
    fmt_via_name!();
}

/// Operators applicable to a property. `by` on the surface is an alias of
/// `Add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    To,
    Add,
    Sub,
    Mul,
    Div,
    Bake,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Self::To => "to",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Bake => "bake",
        }
    }

    /// The operator×property validity table.
    pub fn valid_for(self, property: Property) -> bool {
        match property {
            Property::Pos => matches!(self, Self::To | Self::Add | Self::Bake),
            Property::Direction => {
                matches!(self, Self::To | Self::Add | Self::Mul | Self::Div | Self::Bake)
            }
            Property::Speed | Property::Vector => true,
        }
    }
}

impl fmt::Display for Operator {
    fmt_via_name!();
}

/// What kind of layer a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// The per-property base layer (`base.<prop>`); bakes to global state.
    Base,
    /// Implicit `<prop>.<mode>` layer created by using a mode without a name.
    AutoModifier,
    /// Caller-named layer, optionally ordered.
    UserModifier,
    /// Transient decay layer spawned by `emit`.
    Emit,
}

/// Absolute commands drive `move_absolute`; relative commands emit deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementType {
    #[default]
    Absolute,
    Relative,
}

/// Which output channel a command feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputKind {
    #[default]
    Move,
    Scroll,
}

/// Lifecycle phases a command can configure and attach callbacks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Over,
    Hold,
    Revert,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Over => "over",
            Self::Hold => "hold",
            Self::Revert => "revert",
        }
    }
}

impl fmt::Display for Phase {
    fmt_via_name!();
}

/// Admission policy for repeated invocations on the same layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Unlimited by default; with a cap, reject past `max` live builders.
    Stack(Option<usize>),
    /// Hand off from the group's current value, clearing existing builders.
    Replace,
    /// Defer while the group is busy; optional queue-length cap.
    Queue(Option<usize>),
    /// Without ms: reject while any builder is live on the key. With ms:
    /// reject admissions within the window.
    Throttle(Option<f64>),
    /// Defer until the key has been quiet for the given window.
    Debounce(f64),
    /// Drop the command when any builder is live on the key.
    Ignore,
    /// Add this command's hold duration onto the in-flight builder's hold.
    Extend,
}

/// Callback attached via `then`; fired inline at the end of the tick that
/// crossed its phase boundary.
pub type PhaseCallback = Box<dyn FnMut() + 'static>;

/// Declarative record of one command. Filled by the fluent chain, consumed
/// by admission.
pub struct BuilderConfig {
    pub property: Property,
    pub operator: Operator,
    pub value: Value,
    pub layer_name: String,
    pub layer_kind: LayerKind,
    pub order: Option<i32>,
    pub mode: Option<Mode>,
    pub over_ms: Option<f64>,
    pub over_rate: Option<f64>,
    pub over_easing: Easing,
    pub over_interpolation: Interpolation,
    pub hold_ms: Option<f64>,
    pub revert_ms: Option<f64>,
    pub revert_rate: Option<f64>,
    pub revert_easing: Easing,
    pub revert_interpolation: Interpolation,
    pub then_callbacks: Vec<(Phase, PhaseCallback)>,
    pub behavior: Option<Behavior>,
    /// Force the completion bake even when a revert phase ran.
    pub bake_override: bool,
    pub movement_type: MovementType,
    pub api_override: Option<String>,
    pub input_kind: InputKind,
    /// Scroll channel unit: lines (default) or pixels.
    pub scroll_by_lines: bool,
}

impl BuilderConfig {
    pub fn new(property: Property, operator: Operator, value: Value) -> Self {
        Self {
            property,
            operator,
            value,
            layer_name: base_layer_name(property, InputKind::Move),
            layer_kind: LayerKind::Base,
            order: None,
            mode: None,
            over_ms: None,
            over_rate: None,
            over_easing: Easing::Linear,
            over_interpolation: Interpolation::Lerp,
            hold_ms: None,
            revert_ms: None,
            revert_rate: None,
            revert_easing: Easing::Linear,
            revert_interpolation: Interpolation::Lerp,
            then_callbacks: Vec::new(),
            behavior: None,
            bake_override: false,
            movement_type: MovementType::Absolute,
            api_override: None,
            input_kind: InputKind::Move,
            scroll_by_lines: true,
        }
    }

    pub fn is_base_layer(&self) -> bool {
        self.layer_kind == LayerKind::Base
    }

    pub fn is_user_named(&self) -> bool {
        self.layer_kind == LayerKind::UserModifier
    }

    /// True when no lifecycle phase was configured; such commands apply
    /// instantly at commit.
    pub fn is_instant(&self) -> bool {
        !phase_set(self.over_ms)
            && !phase_set(self.hold_ms)
            && self.revert_ms.is_none()
            && self.over_rate.is_none()
            && self.revert_rate.is_none()
    }

    /// The admission key shared by throttle, debounce, ignore and extend.
    pub fn policy_key(&self) -> String {
        format!("{}_{}_{}", self.layer_name, self.property, self.operator)
    }

    /// The phase the most recent timing call configured; `then` attaches
    /// callbacks here. Defaults to `over` when nothing was configured.
    pub fn last_configured_phase(&self) -> Phase {
        if self.revert_ms.is_some() || self.revert_rate.is_some() {
            Phase::Revert
        } else if self.hold_ms.is_some() {
            Phase::Hold
        } else {
            Phase::Over
        }
    }

    /// Validity checks that do not need rig state. The typed chain makes most
    /// of these unrepresentable; configs that arrive by other routes (debounce
    /// re-admission, tests, future serialization) pass through here too.
    pub fn validate(&self) -> Result<(), ChainError> {
        if !self.operator.valid_for(self.property) {
            return Err(ChainError::InvalidOperator {
                property: self.property,
                operator: self.operator,
            });
        }
        if self.over_ms.is_some() && self.over_rate.is_some() {
            return Err(ChainError::TimingConflict { phase: Phase::Over });
        }
        if self.revert_ms.is_some() && self.revert_rate.is_some() {
            return Err(ChainError::TimingConflict { phase: Phase::Revert });
        }
        if self.operator == Operator::Div && self.value.as_scalar().abs() < crate::vec2::EPSILON {
            return Err(ChainError::ZeroDivisor);
        }
        if let Some(Behavior::Debounce(ms)) = self.behavior {
            if !(ms.is_finite() && ms > 0.0) {
                return Err(ChainError::DebounceWithoutDuration);
            }
        }
        for (what, v) in [
            ("over", self.over_ms),
            ("hold", self.hold_ms),
            ("revert", self.revert_ms),
            ("over rate", self.over_rate),
            ("revert rate", self.revert_rate),
        ] {
            if let Some(v) = v {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(ChainError::InvalidTiming { what, value: v });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BuilderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderConfig")
            .field("layer", &self.layer_name)
            .field("property", &self.property)
            .field("operator", &self.operator)
            .field("value", &self.value)
            .field("mode", &self.mode)
            .field("over_ms", &self.over_ms)
            .field("hold_ms", &self.hold_ms)
            .field("revert_ms", &self.revert_ms)
            .field("behavior", &self.behavior)
            .field("callbacks", &self.then_callbacks.len())
            .finish_non_exhaustive()
    }
}

fn phase_set(ms: Option<f64>) -> bool {
    ms.is_some_and(|v| v > 0.0)
}

/// Derived name of the per-property base layer.
pub fn base_layer_name(property: Property, input: InputKind) -> String {
    match input {
        InputKind::Move => format!("base.{}", property.name()),
        InputKind::Scroll => format!("base.scroll.{}", property.name()),
    }
}

/// Derived name of an implicit `<prop>.<mode>` modifier layer.
pub fn auto_layer_name(property: Property, mode: Mode, input: InputKind) -> String {
    match input {
        InputKind::Move => format!("{}.{}", property.name(), mode.name()),
        InputKind::Scroll => format!("scroll.{}.{}", property.name(), mode.name()),
    }
}
