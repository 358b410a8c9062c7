//! The rig handle: shared, cloneable, single-threaded access to the engine.
//!
//! `Rig` wraps the engine state in `Rc<RefCell<..>>`, which makes the handle
//! cheap to clone into callbacks and `!Send` by construction — the
//! commit-and-tick-on-one-thread contract is enforced by the type system.
//! Callbacks returned by a tick are fired here, after the borrow is
//! released, so a callback can freely issue new commands on its own handle.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::time::Instant;

use core_backend::{BackendRegistry, CursorBackend};
use core_config::RigConfig;
use core_events::TickScheduler;
use core_model::{BuilderConfig, Cardinal, Easing, InputKind, PhaseCallback, RigError, Vec2};
use core_state::{LayerInfo, RigState};

use crate::chain::{
    DirectionEntry, EntryCore, PosEntry, ScrollEntry, SpeedEntry, VectorEntry,
};

#[derive(Clone)]
pub struct Rig {
    inner: Rc<RefCell<RigState>>,
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

impl Rig {
    /// A rig over an in-memory virtual cursor and a manual scheduler.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RigState::default())),
        }
    }

    /// A fully wired rig: real back-end registry, scheduler, and config.
    pub fn with_parts(
        backends: BackendRegistry,
        scheduler: Box<dyn TickScheduler>,
        config: RigConfig,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RigState::new(backends, scheduler, config))),
        }
    }

    /// Register an additional named back-end for `api` overrides.
    pub fn register_backend(&self, name: &str, backend: Box<dyn CursorBackend>) {
        self.inner.borrow_mut().backends_mut().register(name, backend);
    }

    // ── command entry points ──

    pub fn pos(&self) -> PosEntry {
        PosEntry { core: EntryCore::base(self.clone(), InputKind::Move) }
    }

    pub fn speed(&self) -> SpeedEntry {
        SpeedEntry { core: EntryCore::base(self.clone(), InputKind::Move) }
    }

    pub fn direction(&self) -> DirectionEntry {
        DirectionEntry { core: EntryCore::base(self.clone(), InputKind::Move) }
    }

    pub fn vector(&self) -> VectorEntry {
        VectorEntry { core: EntryCore::base(self.clone(), InputKind::Move) }
    }

    pub fn scroll(&self) -> ScrollEntry {
        ScrollEntry { core: EntryCore::base(self.clone(), InputKind::Scroll) }
    }

    /// A named modifier layer.
    pub fn layer(&self, name: &str) -> LayerRef {
        LayerRef {
            rig: self.clone(),
            name: name.to_string(),
            order: None,
        }
    }

    /// A named modifier layer with an explicit composition order.
    pub fn layer_ordered(&self, name: &str, order: i32) -> LayerRef {
        LayerRef {
            rig: self.clone(),
            name: name.to_string(),
            order: Some(order),
        }
    }

    // ── engine control ──

    pub(crate) fn admit(&self, config: BuilderConfig) -> Result<(), RigError> {
        self.inner.borrow_mut().admit(config)
    }

    /// Advance one frame at wall-clock now. Returns whether the loop is
    /// still live.
    pub fn tick(&self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Advance one frame at an explicit instant (tests, custom drivers).
    pub fn tick_at(&self, now: Instant) -> bool {
        let outcome = self.inner.borrow_mut().tick_at(now);
        fire(outcome.callbacks);
        outcome.ticking
    }

    /// Bake current state to base, clear every layer, halt.
    pub fn stop(&self) {
        self.stop_at(Instant::now());
    }

    /// [`Rig::stop`] at an explicit instant (tests, custom drivers).
    pub fn stop_at(&self, now: Instant) {
        let callbacks = self.inner.borrow_mut().stop(None, Easing::Linear, now);
        fire(callbacks);
    }

    /// Like [`Rig::stop`] but decelerating speed to zero over `ms`.
    pub fn stop_over(&self, ms: f64, easing: &str) -> Result<(), RigError> {
        self.stop_over_at(ms, easing, Instant::now())
    }

    /// [`Rig::stop_over`] at an explicit instant.
    pub fn stop_over_at(&self, ms: f64, easing: &str, now: Instant) -> Result<(), RigError> {
        let easing = Easing::from_name(easing)?;
        let callbacks = self.inner.borrow_mut().stop(Some(ms), easing, now);
        fire(callbacks);
        Ok(())
    }

    /// Destroy all state, back to defaults.
    pub fn reset(&self) {
        let callbacks = self.inner.borrow_mut().reset();
        fire(callbacks);
    }

    /// Fold every live layer into base state immediately.
    pub fn bake_all(&self) {
        self.inner.borrow_mut().bake_all();
    }

    /// Run `callback` when the tick loop actually stops.
    pub fn on_stop(&self, callback: impl FnMut() + 'static) {
        self.inner.borrow_mut().add_stop_callback(Box::new(callback));
    }

    pub fn is_ticking(&self) -> bool {
        self.inner.borrow().is_ticking()
    }

    pub fn wants_tick(&self) -> bool {
        self.inner.borrow().should_tick()
    }

    /// Read-only view of computed and base state.
    pub fn state(&self) -> StateView {
        StateView { rig: self.clone() }
    }
}

fn fire(callbacks: Vec<PhaseCallback>) {
    for mut callback in callbacks {
        // A panicking callback must not take the tick loop down or starve
        // the callbacks behind it.
        let result = catch_unwind(AssertUnwindSafe(|| callback()));
        if result.is_err() {
            tracing::error!(target: "rig.tick", "callback panicked");
        }
    }
}

/// Reference to a named layer: typed chain entries (mode is mandatory
/// before an operator on user layers) plus the special operators.
pub struct LayerRef {
    rig: Rig,
    name: String,
    order: Option<i32>,
}

impl std::fmt::Debug for LayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRef")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish()
    }
}

impl LayerRef {
    fn core(&self, input: InputKind) -> EntryCore {
        EntryCore::user(self.rig.clone(), self.name.clone(), self.order, input)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pos(&self) -> LayerProp<PosEntry> {
        LayerProp { core: self.core(InputKind::Move), build: |core| PosEntry { core } }
    }

    pub fn speed(&self) -> LayerProp<SpeedEntry> {
        LayerProp { core: self.core(InputKind::Move), build: |core| SpeedEntry { core } }
    }

    pub fn direction(&self) -> LayerProp<DirectionEntry> {
        LayerProp { core: self.core(InputKind::Move), build: |core| DirectionEntry { core } }
    }

    pub fn vector(&self) -> LayerProp<VectorEntry> {
        LayerProp { core: self.core(InputKind::Move), build: |core| VectorEntry { core } }
    }

    /// Scroll-channel properties on this layer.
    pub fn scroll(&self) -> LayerScroll {
        LayerScroll { core: self.core(InputKind::Scroll) }
    }

    // ── special operators ──

    /// Convert this layer's effective value into a decaying velocity
    /// contribution; consumes the layer. Returns the transient layer's ref.
    pub fn emit(&self, ms: f64, easing: &str) -> Result<LayerRef, RigError> {
        self.emit_at(ms, easing, Instant::now())
    }

    /// [`LayerRef::emit`] at an explicit instant.
    pub fn emit_at(&self, ms: f64, easing: &str, now: Instant) -> Result<LayerRef, RigError> {
        let easing = Easing::from_name(easing)?;
        let name = self
            .rig
            .inner
            .borrow_mut()
            .emit_layer(&self.name, ms, easing, now)?;
        Ok(LayerRef { rig: self.rig.clone(), name, order: None })
    }

    /// Duplicate under an auto-generated name.
    pub fn copy(&self) -> Result<LayerRef, RigError> {
        self.copy_at(Instant::now())
    }

    /// [`LayerRef::copy`] at an explicit instant.
    pub fn copy_at(&self, now: Instant) -> Result<LayerRef, RigError> {
        let name = self
            .rig
            .inner
            .borrow_mut()
            .copy_layer(&self.name, None, now)?;
        Ok(LayerRef { rig: self.rig.clone(), name, order: None })
    }

    /// Duplicate under an explicit name.
    pub fn copy_named(&self, new_name: &str) -> Result<LayerRef, RigError> {
        self.copy_named_at(new_name, Instant::now())
    }

    /// [`LayerRef::copy_named`] at an explicit instant.
    pub fn copy_named_at(&self, new_name: &str, now: Instant) -> Result<LayerRef, RigError> {
        let name = self
            .rig
            .inner
            .borrow_mut()
            .copy_layer(&self.name, Some(new_name), now)?;
        Ok(LayerRef { rig: self.rig.clone(), name, order: None })
    }

    /// Negate this direction/vector layer instantly.
    pub fn reverse(&self) -> Result<(), RigError> {
        self.reverse_at(Instant::now())
    }

    /// [`LayerRef::reverse`] at an explicit instant.
    pub fn reverse_at(&self, now: Instant) -> Result<(), RigError> {
        self.rig
            .inner
            .borrow_mut()
            .reverse_layer(&self.name, None, Easing::Linear, now)
    }

    /// Negate gradually: bridges the discontinuity with decaying momentum.
    pub fn reverse_over(&self, ms: f64, easing: &str) -> Result<(), RigError> {
        self.reverse_over_at(ms, easing, Instant::now())
    }

    /// [`LayerRef::reverse_over`] at an explicit instant.
    pub fn reverse_over_at(&self, ms: f64, easing: &str, now: Instant) -> Result<(), RigError> {
        let easing = Easing::from_name(easing)?;
        self.rig
            .inner
            .borrow_mut()
            .reverse_layer(&self.name, Some(ms), easing, now)
    }

    /// Unwind every builder on this layer through its revert phase now.
    pub fn revert(&self) -> Result<(), RigError> {
        self.revert_at(Instant::now())
    }

    /// [`LayerRef::revert`] at an explicit instant.
    pub fn revert_at(&self, now: Instant) -> Result<(), RigError> {
        self.rig
            .inner
            .borrow_mut()
            .revert_layer(&self.name, None, Easing::Linear, now)
    }

    pub fn revert_over(&self, ms: f64, easing: &str) -> Result<(), RigError> {
        self.revert_over_at(ms, easing, Instant::now())
    }

    /// [`LayerRef::revert_over`] at an explicit instant.
    pub fn revert_over_at(&self, ms: f64, easing: &str, now: Instant) -> Result<(), RigError> {
        let easing = Easing::from_name(easing)?;
        self.rig
            .inner
            .borrow_mut()
            .revert_layer(&self.name, Some(ms), easing, now)
    }

    /// Remove this layer. With `bake`, fold its value into base first.
    pub fn remove(&self, bake: bool) {
        self.rig.inner.borrow_mut().remove_layer(&self.name, bake);
    }

    /// Clamp the layer's output (scalar value or vector magnitude).
    pub fn limit(&self, min: Option<f64>, max: Option<f64>) -> Result<(), RigError> {
        self.rig
            .inner
            .borrow_mut()
            .set_layer_limits(&self.name, min, max)
    }

    pub fn exists(&self) -> bool {
        self.rig.inner.borrow().has_layer(&self.name)
    }

    pub fn info(&self) -> Option<LayerInfo> {
        self.info_at(Instant::now())
    }

    /// [`LayerRef::info`] at an explicit instant.
    pub fn info_at(&self, now: Instant) -> Option<LayerInfo> {
        self.rig.inner.borrow().layer_info(&self.name, now)
    }
}

/// A property on a user layer: a mode must be chosen before any operator.
pub struct LayerProp<E> {
    core: EntryCore,
    build: fn(EntryCore) -> E,
}

impl<E> LayerProp<E> {
    pub fn offset(self) -> E {
        (self.build)(self.core.with_mode(core_model::Mode::Offset))
    }

    /// Override mode (`override` is reserved in Rust).
    pub fn override_(self) -> E {
        (self.build)(self.core.with_mode(core_model::Mode::Override))
    }

    pub fn scale(self) -> E {
        (self.build)(self.core.with_mode(core_model::Mode::Scale))
    }
}

/// Scroll-channel properties on a user layer.
pub struct LayerScroll {
    core: EntryCore,
}

impl LayerScroll {
    pub fn speed(self) -> LayerProp<SpeedEntry> {
        LayerProp { core: self.core, build: |core| SpeedEntry { core } }
    }

    pub fn direction(self) -> LayerProp<DirectionEntry> {
        LayerProp { core: self.core, build: |core| DirectionEntry { core } }
    }

    pub fn vector(self) -> LayerProp<VectorEntry> {
        LayerProp { core: self.core, build: |core| VectorEntry { core } }
    }
}

/// Computed current values; consistent as of the last completed frame.
pub struct StateView {
    rig: Rig,
}

impl StateView {
    pub fn pos(&self) -> Vec2 {
        self.rig.inner.borrow().pos()
    }

    pub fn speed(&self) -> f64 {
        self.rig.inner.borrow().speed()
    }

    pub fn direction(&self) -> Vec2 {
        self.rig.inner.borrow().direction()
    }

    pub fn vector(&self) -> Vec2 {
        self.rig.inner.borrow().vector()
    }

    pub fn scroll_vector(&self) -> Vec2 {
        self.rig.inner.borrow().scroll_vector()
    }

    pub fn direction_cardinal(&self) -> Option<Cardinal> {
        self.rig.inner.borrow().direction_cardinal()
    }

    pub fn is_moving(&self) -> bool {
        self.rig.inner.borrow().should_tick()
    }

    pub fn layers(&self) -> Vec<String> {
        self.rig.inner.borrow().layers()
    }

    pub fn layer(&self, name: &str) -> Option<LayerInfo> {
        self.layer_at(name, Instant::now())
    }

    /// [`StateView::layer`] at an explicit instant.
    pub fn layer_at(&self, name: &str, now: Instant) -> Option<LayerInfo> {
        self.rig.inner.borrow().layer_info(name, now)
    }

    pub fn time_alive(&self, layer: &str) -> Option<f64> {
        self.time_alive_at(layer, Instant::now())
    }

    /// [`StateView::time_alive`] at an explicit instant.
    pub fn time_alive_at(&self, layer: &str, now: Instant) -> Option<f64> {
        self.rig.inner.borrow().time_alive(layer, now)
    }

    /// Base (baked) values.
    pub fn base(&self) -> BaseView {
        BaseView { rig: self.rig.clone() }
    }
}

/// Base (baked) values, post every completed bake.
pub struct BaseView {
    rig: Rig,
}

impl BaseView {
    pub fn pos(&self) -> Option<Vec2> {
        self.rig.inner.borrow().base_pos()
    }

    pub fn speed(&self) -> f64 {
        self.rig.inner.borrow().base_speed()
    }

    pub fn direction(&self) -> Vec2 {
        self.rig.inner.borrow().base_direction()
    }

    pub fn vector(&self) -> Vec2 {
        self.rig.inner.borrow().base_vector()
    }
}
