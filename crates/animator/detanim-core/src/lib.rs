//! Detanim core (engine-agnostic).
//!
//! A deterministic, fixed-point animation state-machine engine: layers of
//! states advance per tick, transitions cross-fade between motions, blend
//! trees weight child clips through baked lookup tables, and root-motion
//! deltas accumulate, all in Q48.16 fixed point so independent simulation
//! replicas stay bit-identical. The crate owns no rendering, assets on
//! disk, or ECS storage; hosts feed it delta time and variables and consume
//! playback heads, blend lists, and events.

pub mod behaviour;
pub mod clip;
pub mod error;
pub mod graph;
pub mod ids;
pub mod instance;
pub mod layer;
pub mod math;
pub mod motion;
pub mod outputs;
pub mod state;
pub mod transition;
pub mod variable;

// Re-exports for consumers (adapters)
pub use behaviour::{StateBehaviour, StateRole, TraceStateBehaviour};
pub use clip::{ClipData, ClipEvent, MotionFrame};
pub use error::GraphError;
pub use graph::{FadeRequest, Graph};
pub use ids::{state_id, StateId};
pub use instance::{AnimatorInstance, InstanceArena, InstanceHandle, LayerData};
pub use layer::Layer;
pub use math::{clamp01, Fp, FpQuat, FpVec2, FpVec3};
pub use motion::{BlendKind, BlendTree, ClipMotion, Motion, TableResolution};
pub use outputs::{BlendEntry, GraphEvent, LayerPlayback, Outputs, RootMotion};
pub use state::{State, ANY_STATE_NAME};
pub use transition::{Condition, ConditionMode, Transition};
pub use variable::{VariableBank, VariableDecl, VariableType, VariableValue};
