//! Fluent command surface for the veer cursor-motion engine.
//!
//! Callers describe motion as chains — property, operator, timing, behavior,
//! callbacks — and the chain commits when the [`chain::Command`] value drops
//! (or explicitly via `commit`, which also surfaces validation errors).
//!
//! ```no_run
//! use core_actions::Rig;
//!
//! let rig = Rig::new();
//! rig.pos().to(500.0, 300.0).over(1000.0);
//! rig.layer("boost").speed().offset().add(10.0).over(200.0).hold(500.0).revert(200.0);
//! ```
//!
//! The rig handle is a cheap clone over shared state and is deliberately
//! `!Send`: commits and ticks must happen on one thread.

pub mod chain;
pub mod global;
pub mod rig;

pub use chain::Command;
pub use rig::{BaseView, LayerRef, Rig, StateView};

pub use core_model::{Cardinal, Mode, RigError, Value, Vec2};
pub use core_state::LayerInfo;
