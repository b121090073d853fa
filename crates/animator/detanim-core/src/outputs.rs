//! Per-tick outputs produced by the core for playback/view collaborators.

use serde::{Deserialize, Serialize};

use crate::clip::MotionFrame;
use crate::ids::StateId;
use crate::math::Fp;

/// One weighted motion contribution for pose composition.
///
/// `animation_index` addresses the motion within its state's tree (see
/// `State::get_motion`); order in the generated list follows layer and
/// declaration order and is therefore reproducible.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendEntry {
    pub state_id: StateId,
    pub animation_index: u32,
    pub weight: Fp,
    pub current_time: Fp,
    pub last_time: Fp,
}

/// Root-motion pair emitted once per tick when enabled: the delta since the
/// previous tick and the absolute frame at the current time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootMotion {
    pub delta: MotionFrame,
    pub current: MotionFrame,
}

/// Resolved playback heads for one layer, enough for an external player to
/// cross-fade or hard-switch a host animation engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPlayback {
    pub current_state_id: StateId,
    pub current_time: Fp,
    pub to_state_id: StateId,
    pub to_time: Fp,
    pub transition_progress: Fp,
}

/// Discrete signals emitted during stepping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum GraphEvent {
    StateEntered {
        state: StateId,
        time: Fp,
    },
    StateExited {
        state: StateId,
        time: Fp,
    },
    TransitionStarted {
        from: StateId,
        to: StateId,
        duration: Fp,
    },
    TransitionCompleted {
        state: StateId,
    },
    /// A clip event crossed by the current head this tick.
    Clip {
        state: StateId,
        name: String,
        time: Fp,
    },
}

/// Outputs buffered on the instance; cleared at the top of `Graph::update`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub events: Vec<GraphEvent>,
    #[serde(default)]
    pub root_motion: Option<RootMotion>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
        self.root_motion = None;
    }

    #[inline]
    pub fn push_event(&mut self, event: GraphEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.root_motion.is_none()
    }
}
