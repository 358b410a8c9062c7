//! Core data model for the veer cursor-motion engine.
//!
//! Everything in this crate is pure and deterministic: 2D vector math, the
//! easing/interpolation registries, the value sum type layers accumulate,
//! the declarative command record (`BuilderConfig`), mode operations, the
//! rate calculator, and the subpixel accumulator. Engine state and anything
//! that touches a clock or a back-end lives in `core-state`.

pub mod cardinal;
pub mod command;
pub mod easing;
pub mod error;
pub mod modes;
pub mod rate;
pub mod subpixel;
pub mod value;
pub mod vec2;

pub use cardinal::Cardinal;
pub use command::{
    Behavior, BuilderConfig, InputKind, LayerKind, MovementType, Operator, Phase, PhaseCallback,
    Property, auto_layer_name, base_layer_name,
};
pub use easing::{Easing, Interpolation};
pub use error::{AdmitError, ChainError, RigError};
pub use subpixel::SubpixelAccumulator;
pub use value::{Mode, Value};
pub use vec2::{EPSILON, Vec2};
