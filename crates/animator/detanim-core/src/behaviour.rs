//! External state behaviour hooks.
//!
//! Behaviours are registered on states at bake time and treated as
//! read-only data afterwards: the graph asset is shared across threads, so
//! implementations must be `Send + Sync` and must not mutate themselves.
//! Handlers run in registration order; the first one returning `true`
//! short-circuits the rest.

use crate::math::Fp;
use crate::state::State;

/// Which playback head a `on_state_update` call is reporting on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StateRole {
    Current,
    From,
    To,
}

pub trait StateBehaviour: Send + Sync {
    fn on_state_enter(&self, state: &State, time: Fp) -> bool {
        let _ = (state, time);
        false
    }

    fn on_state_update(&self, state: &State, time: Fp, role: StateRole) -> bool {
        let _ = (state, time, role);
        false
    }

    fn on_state_exit(&self, state: &State, time: Fp) -> bool {
        let _ = (state, time);
        false
    }
}

/// Behaviour that traces every callback through `log`. Handy while wiring
/// up a new graph; never marks callbacks as handled.
#[derive(Default)]
pub struct TraceStateBehaviour;

impl StateBehaviour for TraceStateBehaviour {
    fn on_state_enter(&self, state: &State, time: Fp) -> bool {
        log::trace!("enter {} at {time}", state.name);
        false
    }

    fn on_state_update(&self, state: &State, time: Fp, role: StateRole) -> bool {
        log::trace!("update {} ({role:?}) at {time}", state.name);
        false
    }

    fn on_state_exit(&self, state: &State, time: Fp) -> bool {
        log::trace!("exit {} at {time}", state.name);
        false
    }
}
