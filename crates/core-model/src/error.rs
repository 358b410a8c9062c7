//! Structured errors surfaced by the command surface.
//!
//! Errors are fatal to the command, never to the engine: a command that fails
//! validation is a reported no-op and rig state is left unchanged.

use thiserror::Error;

use crate::command::{Operator, Phase, Property};
use crate::value::Mode;

/// Violations detectable while the chain is being built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("unknown easing `{0}`")]
    UnknownEasing(String),
    #[error("unknown interpolation `{0}`")]
    UnknownInterpolation(String),
    #[error("operator `{operator}` is not valid for property `{property}`")]
    InvalidOperator {
        property: Property,
        operator: Operator,
    },
    #[error("both `ms` and `rate` were set on the {phase} phase; they are mutually exclusive")]
    TimingConflict { phase: Phase },
    #[error("the {phase} phase was configured twice on one command")]
    DuplicatePhase { phase: Phase },
    #[error("debounce requires a duration in milliseconds")]
    DebounceWithoutDuration,
    #[error("division by zero in `div`")]
    ZeroDivisor,
    #[error("timing value {value} for `{what}` must be finite and non-negative")]
    InvalidTiming { what: &'static str, value: f64 },
}

/// Violations detectable only at commit, against live rig state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmitError {
    #[error("layer `{0}` does not exist")]
    UnknownLayer(String),
    #[error(
        "emit is not valid for {property}.{mode} (layer `{layer}`); \
         valid sources are vector.offset, vector.override and speed.offset"
    )]
    InvalidEmitSource {
        layer: String,
        property: Property,
        mode: &'static str,
    },
    #[error("{op} requires a user-named layer")]
    RequiresNamedLayer { op: &'static str },
    #[error("{op} is not valid for a {property} layer")]
    InvalidLayerOp {
        op: &'static str,
        property: Property,
    },
}

/// Top-level error type returned by `commit` and the special operators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Admit(#[from] AdmitError),
}

impl AdmitError {
    pub fn invalid_emit(layer: &str, property: Property, mode: Option<Mode>) -> Self {
        Self::InvalidEmitSource {
            layer: layer.to_string(),
            property,
            mode: mode.map_or("base", Mode::name),
        }
    }
}
