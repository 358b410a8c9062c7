//! The chainable command: entry points per property, mode selection, and
//! the shared combinator tail (timing, behavior, callbacks).
//!
//! Typed entry structs make the invalid chains unrepresentable — a position
//! chain simply has no `mul` — while the dynamic violations (ms and rate on
//! one phase, a zero divisor, an unknown easing name) are carried in the
//! command and surface at commit. A failed command is a reported no-op.

use core_model::{
    Behavior, BuilderConfig, ChainError, Easing, InputKind, Interpolation, LayerKind, Mode,
    MovementType, Operator, Phase, Property, RigError, Value, Vec2, auto_layer_name,
    base_layer_name,
};

use crate::rig::Rig;

/// Where a command's layer comes from.
#[derive(Debug, Clone)]
pub(crate) enum LayerSpec {
    Base,
    Auto,
    User { name: String, order: Option<i32> },
}

/// Shared state threaded through every typed entry struct.
#[derive(Clone)]
pub(crate) struct EntryCore {
    pub rig: Rig,
    pub layer: LayerSpec,
    pub mode: Option<Mode>,
    pub input: InputKind,
    pub by_lines: bool,
}

impl EntryCore {
    pub(crate) fn base(rig: Rig, input: InputKind) -> Self {
        Self {
            rig,
            layer: LayerSpec::Base,
            mode: None,
            input,
            by_lines: true,
        }
    }

    pub(crate) fn user(rig: Rig, name: String, order: Option<i32>, input: InputKind) -> Self {
        Self {
            rig,
            layer: LayerSpec::User { name, order },
            mode: None,
            input,
            by_lines: true,
        }
    }

    /// Selecting a mode on a base entry promotes it to the implicit
    /// `<prop>.<mode>` modifier layer.
    pub(crate) fn with_mode(mut self, mode: Mode) -> Self {
        if matches!(self.layer, LayerSpec::Base) {
            self.layer = LayerSpec::Auto;
        }
        self.mode = Some(mode);
        self
    }

    fn command(self, property: Property, operator: Operator, value: Value) -> Command {
        let mut config = BuilderConfig::new(property, operator, value);
        config.input_kind = self.input;
        config.scroll_by_lines = self.by_lines;
        config.mode = self.mode;
        match self.layer {
            LayerSpec::Base => {
                config.layer_name = base_layer_name(property, self.input);
                config.layer_kind = LayerKind::Base;
            }
            LayerSpec::Auto => {
                let mode = self.mode.unwrap_or(Mode::Offset);
                config.layer_name = auto_layer_name(property, mode, self.input);
                config.layer_kind = LayerKind::AutoModifier;
            }
            LayerSpec::User { name, order } => {
                config.layer_name = name;
                config.layer_kind = LayerKind::UserModifier;
                config.order = order;
            }
        }
        Command::new(self.rig, config)
    }
}

macro_rules! mode_methods {
    ($entry:ident) => {
        pub fn offset(self) -> $entry {
            $entry { core: self.core.with_mode(Mode::Offset) }
        }

        /// Override mode (`override` is reserved in Rust).
        pub fn override_(self) -> $entry {
            $entry { core: self.core.with_mode(Mode::Override) }
        }

        pub fn scale(self) -> $entry {
            $entry { core: self.core.with_mode(Mode::Scale) }
        }
    };
}

/// Position chains: `to` (absolute), `by`/`add` (relative), `bake`.
pub struct PosEntry {
    pub(crate) core: EntryCore,
}

impl PosEntry {
    /// Absolute move to screen coordinates.
    pub fn to(self, x: f64, y: f64) -> Command {
        let mut cmd = self
            .core
            .command(Property::Pos, Operator::To, Value::Pair(Vec2::new(x, y)));
        cmd.set_movement(MovementType::Absolute);
        cmd
    }

    /// Relative nudge by a pixel delta.
    pub fn by(self, dx: f64, dy: f64) -> Command {
        let mut cmd = self
            .core
            .command(Property::Pos, Operator::Add, Value::Pair(Vec2::new(dx, dy)));
        cmd.set_movement(MovementType::Relative);
        cmd
    }

    /// Synonym for [`PosEntry::by`].
    pub fn add(self, dx: f64, dy: f64) -> Command {
        self.by(dx, dy)
    }

    /// Bake the current computed position into base state.
    pub fn bake(self) -> Command {
        self.core.command(Property::Pos, Operator::Bake, Value::ZERO_PAIR)
    }

    mode_methods!(PosEntry);
}

/// Speed chains: the full arithmetic set plus `bake`.
pub struct SpeedEntry {
    pub(crate) core: EntryCore,
}

impl SpeedEntry {
    pub fn to(self, value: f64) -> Command {
        self.core.command(Property::Speed, Operator::To, Value::Scalar(value))
    }

    pub fn add(self, value: f64) -> Command {
        self.core.command(Property::Speed, Operator::Add, Value::Scalar(value))
    }

    /// Synonym for [`SpeedEntry::add`].
    pub fn by(self, value: f64) -> Command {
        self.add(value)
    }

    pub fn sub(self, value: f64) -> Command {
        self.core.command(Property::Speed, Operator::Sub, Value::Scalar(value))
    }

    pub fn mul(self, factor: f64) -> Command {
        self.core.command(Property::Speed, Operator::Mul, Value::Scalar(factor))
    }

    pub fn div(self, divisor: f64) -> Command {
        self.core.command(Property::Speed, Operator::Div, Value::Scalar(divisor))
    }

    pub fn bake(self) -> Command {
        self.core.command(Property::Speed, Operator::Bake, Value::Scalar(0.0))
    }

    mode_methods!(SpeedEntry);
}

/// Direction chains: `to` a heading, rotate `by` degrees, scale the heading
/// angle with `mul`/`div`.
pub struct DirectionEntry {
    pub(crate) core: EntryCore,
}

impl DirectionEntry {
    pub fn to(self, x: f64, y: f64) -> Command {
        self.core
            .command(Property::Direction, Operator::To, Value::Pair(Vec2::new(x, y)))
    }

    /// Rotate by degrees (positive rotates toward +y, screen-down).
    pub fn by(self, degrees: f64) -> Command {
        self.core
            .command(Property::Direction, Operator::Add, Value::Scalar(degrees))
    }

    /// Synonym for [`DirectionEntry::by`].
    pub fn add(self, degrees: f64) -> Command {
        self.by(degrees)
    }

    pub fn mul(self, factor: f64) -> Command {
        self.core
            .command(Property::Direction, Operator::Mul, Value::Scalar(factor))
    }

    pub fn div(self, divisor: f64) -> Command {
        self.core
            .command(Property::Direction, Operator::Div, Value::Scalar(divisor))
    }

    pub fn bake(self) -> Command {
        self.core
            .command(Property::Direction, Operator::Bake, Value::Scalar(0.0))
    }

    mode_methods!(DirectionEntry);
}

/// Velocity-vector chains.
pub struct VectorEntry {
    pub(crate) core: EntryCore,
}

impl VectorEntry {
    pub fn to(self, x: f64, y: f64) -> Command {
        self.core
            .command(Property::Vector, Operator::To, Value::Pair(Vec2::new(x, y)))
    }

    pub fn add(self, x: f64, y: f64) -> Command {
        self.core
            .command(Property::Vector, Operator::Add, Value::Pair(Vec2::new(x, y)))
    }

    /// Synonym for [`VectorEntry::add`].
    pub fn by(self, x: f64, y: f64) -> Command {
        self.add(x, y)
    }

    pub fn sub(self, x: f64, y: f64) -> Command {
        self.core
            .command(Property::Vector, Operator::Sub, Value::Pair(Vec2::new(x, y)))
    }

    pub fn mul(self, factor: f64) -> Command {
        self.core.command(Property::Vector, Operator::Mul, Value::Scalar(factor))
    }

    pub fn div(self, divisor: f64) -> Command {
        self.core.command(Property::Vector, Operator::Div, Value::Scalar(divisor))
    }

    pub fn bake(self) -> Command {
        self.core.command(Property::Vector, Operator::Bake, Value::ZERO_PAIR)
    }

    mode_methods!(VectorEntry);
}

/// Scroll channel entry: same properties, routed to the scroll output.
pub struct ScrollEntry {
    pub(crate) core: EntryCore,
}

impl ScrollEntry {
    pub fn by_lines(mut self) -> Self {
        self.core.by_lines = true;
        self
    }

    pub fn by_pixels(mut self) -> Self {
        self.core.by_lines = false;
        self
    }

    pub fn speed(self) -> SpeedEntry {
        SpeedEntry { core: self.core }
    }

    pub fn direction(self) -> DirectionEntry {
        DirectionEntry { core: self.core }
    }

    pub fn vector(self) -> VectorEntry {
        VectorEntry { core: self.core }
    }
}

/// One chain-built command. Commits when dropped; `commit()` surfaces the
/// validation outcome instead of logging it.
pub struct Command {
    rig: Rig,
    config: Option<BuilderConfig>,
    error: Option<RigError>,
    committed: bool,
}

impl Command {
    pub(crate) fn new(rig: Rig, config: BuilderConfig) -> Self {
        Self {
            rig,
            config: Some(config),
            error: None,
            committed: false,
        }
    }

    fn fail(&mut self, error: ChainError) {
        if self.error.is_none() {
            self.error = Some(RigError::Chain(error));
        }
    }

    fn with_config(mut self, f: impl FnOnce(&mut BuilderConfig) -> Result<(), ChainError>) -> Self {
        if self.error.is_none() {
            if let Some(config) = self.config.as_mut() {
                if let Err(e) = f(config) {
                    self.fail(e);
                }
            }
        }
        self
    }

    pub(crate) fn set_movement(&mut self, movement: MovementType) {
        if let Some(config) = self.config.as_mut() {
            config.movement_type = movement;
        }
    }

    // ── timing ──

    /// Transition toward the target over `ms` with linear easing.
    pub fn over(self, ms: f64) -> Self {
        self.over_eased(ms, "linear")
    }

    pub fn over_eased(self, ms: f64, easing: &str) -> Self {
        self.with_config(|c| {
            if c.over_rate.is_some() {
                return Err(ChainError::TimingConflict { phase: Phase::Over });
            }
            if c.over_ms.is_some() {
                return Err(ChainError::DuplicatePhase { phase: Phase::Over });
            }
            c.over_ms = Some(ms);
            c.over_easing = Easing::from_name(easing)?;
            Ok(())
        })
    }

    /// Rate-based transition; the duration is derived at commit from the
    /// size of the change (units/s, °/s, or px/s by property).
    pub fn over_rate(self, rate: f64) -> Self {
        self.over_rate_eased(rate, "linear")
    }

    pub fn over_rate_eased(self, rate: f64, easing: &str) -> Self {
        self.with_config(|c| {
            if c.over_ms.is_some() || c.over_rate.is_some() {
                return Err(ChainError::TimingConflict { phase: Phase::Over });
            }
            c.over_rate = Some(rate);
            c.over_easing = Easing::from_name(easing)?;
            Ok(())
        })
    }

    /// Sustain the target for `ms` after the transition.
    pub fn hold(self, ms: f64) -> Self {
        self.with_config(|c| {
            if c.hold_ms.is_some() {
                return Err(ChainError::DuplicatePhase { phase: Phase::Hold });
            }
            c.hold_ms = Some(ms);
            Ok(())
        })
    }

    /// Unwind back out over `ms`; a reverted command never bakes.
    pub fn revert(self, ms: f64) -> Self {
        self.revert_eased(ms, "linear")
    }

    pub fn revert_eased(self, ms: f64, easing: &str) -> Self {
        self.with_config(|c| {
            if c.revert_rate.is_some() {
                return Err(ChainError::TimingConflict { phase: Phase::Revert });
            }
            if c.revert_ms.is_some() {
                return Err(ChainError::DuplicatePhase { phase: Phase::Revert });
            }
            c.revert_ms = Some(ms);
            c.revert_easing = Easing::from_name(easing)?;
            Ok(())
        })
    }

    pub fn revert_rate(self, rate: f64) -> Self {
        self.revert_rate_eased(rate, "linear")
    }

    pub fn revert_rate_eased(self, rate: f64, easing: &str) -> Self {
        self.with_config(|c| {
            if c.revert_ms.is_some() || c.revert_rate.is_some() {
                return Err(ChainError::TimingConflict { phase: Phase::Revert });
            }
            c.revert_rate = Some(rate);
            c.revert_easing = Easing::from_name(easing)?;
            Ok(())
        })
    }

    /// Set the interpolation for the phase configured most recently
    /// (`lerp`, `slerp`, or `linear`).
    pub fn interpolate(self, name: &str) -> Self {
        self.with_config(|c| {
            let interp = Interpolation::from_name(name)?;
            match c.last_configured_phase() {
                Phase::Revert => c.revert_interpolation = interp,
                _ => c.over_interpolation = interp,
            }
            Ok(())
        })
    }

    // ── behaviors ──

    fn behavior(self, behavior: Behavior) -> Self {
        self.with_config(|c| {
            c.behavior = Some(behavior);
            Ok(())
        })
    }

    /// Unlimited stacking (the default, stated explicitly).
    pub fn stack(self) -> Self {
        self.behavior(Behavior::Stack(None))
    }

    pub fn stack_max(self, max: usize) -> Self {
        self.behavior(Behavior::Stack(Some(max)))
    }

    pub fn replace(self) -> Self {
        self.behavior(Behavior::Replace)
    }

    pub fn queue(self) -> Self {
        self.behavior(Behavior::Queue(None))
    }

    pub fn queue_max(self, max: usize) -> Self {
        self.behavior(Behavior::Queue(Some(max)))
    }

    /// Reject while a command on the same key is in flight.
    pub fn throttle(self) -> Self {
        self.behavior(Behavior::Throttle(None))
    }

    /// Reject admissions within `ms` of the previous one.
    pub fn throttle_ms(self, ms: f64) -> Self {
        self.behavior(Behavior::Throttle(Some(ms)))
    }

    /// Defer until the key has been quiet for `ms`.
    pub fn debounce(self, ms: f64) -> Self {
        self.behavior(Behavior::Debounce(ms))
    }

    /// Drop this command if one is already active on the key.
    pub fn ignore(self) -> Self {
        self.behavior(Behavior::Ignore)
    }

    /// Stretch the in-flight command's hold instead of admitting this one.
    pub fn extend(self) -> Self {
        self.behavior(Behavior::Extend)
    }

    // ── misc ──

    /// Route this command's emissions through a named back-end.
    pub fn api(self, name: &str) -> Self {
        let name = name.to_string();
        self.with_config(move |c| {
            c.api_override = Some(name);
            Ok(())
        })
    }

    /// Bake on completion even when a revert phase ran.
    pub fn bake_always(self) -> Self {
        self.with_config(|c| {
            c.bake_override = true;
            Ok(())
        })
    }

    /// Run `callback` when the most recently configured phase completes.
    /// Callbacks fire at the end of the tick that crossed the boundary, in
    /// insertion order.
    pub fn then(self, callback: impl FnMut() + 'static) -> Self {
        self.with_config(move |c| {
            let phase = c.last_configured_phase();
            c.then_callbacks.push((phase, Box::new(callback)));
            Ok(())
        })
    }

    /// Commit now, surfacing any chain or admission error. Idempotent; after
    /// this the command is inert.
    pub fn commit(mut self) -> Result<(), RigError> {
        self.do_commit()
    }

    fn do_commit(&mut self) -> Result<(), RigError> {
        if self.committed {
            return Ok(());
        }
        self.committed = true;
        if let Some(error) = self.error.take() {
            self.config = None;
            return Err(error);
        }
        match self.config.take() {
            Some(config) => self.rig.admit(config),
            None => Ok(()),
        }
    }
}

impl Drop for Command {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(error) = self.do_commit() {
                tracing::warn!(target: "rig.chain", %error, "command_rejected");
            }
        }
    }
}
