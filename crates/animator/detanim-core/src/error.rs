//! Bake-time asset validation errors.
//!
//! Runtime configuration problems never surface as `Err`; they degrade to
//! safe no-ops and are reported through `log`. This enum exists for the
//! build/bake boundary, where a malformed graph should be rejected before
//! any instance is created.

use thiserror::Error;

use crate::ids::StateId;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("layer `{layer}` has no states")]
    EmptyLayer { layer: String },

    #[error("layer `{layer}` has no default state")]
    MissingDefaultState { layer: String },

    #[error("layer `{layer}` has more than one default state")]
    MultipleDefaultStates { layer: String },

    #[error("layer `{layer}` has no Any state")]
    MissingAnyState { layer: String },

    #[error("state `{state}` has a zero id")]
    ZeroStateId { state: String },

    #[error("duplicate state id {id:?} (state `{state}`)")]
    DuplicateStateId { state: String, id: StateId },

    #[error("state `{state}` must play but has no motion")]
    MissingMotion { state: String },

    #[error("blend tree `{motion}` has no baked weight table")]
    UnbakedWeightTable { motion: String },

    #[error("blend tree `{motion}` weight table holds {got} entries, expected {expected}")]
    WeightTableShape {
        motion: String,
        expected: usize,
        got: usize,
    },

    #[error("blend tree `{motion}` references variable index {index}, bank holds {count}")]
    BlendParameterOutOfRange {
        motion: String,
        index: usize,
        count: usize,
    },

    #[error("variable `{name}` has index {got}, expected dense index {expected}")]
    VariableIndexNotDense {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("transition `{transition}` condition references variable index {index}, bank holds {count}")]
    ConditionVariableOutOfRange {
        transition: String,
        index: usize,
        count: usize,
    },
}
