//! Engine state: active builders, layer groups, admission policies, and the
//! per-frame evaluator.
//!
//! Ownership is a strict tree: [`RigState`] owns every [`LayerGroup`], each
//! group owns its [`ActiveBuilder`]s. Builders are reached only through
//! their group, so the back-reference the original design called for is the
//! group map key, never an owning handle.

pub mod active;
pub mod group;
pub mod rig;

pub use active::ActiveBuilder;
pub use group::{BakeOutcome, LayerGroup};
pub use rig::{ComposedState, LayerInfo, RigState, TickOutcome};
