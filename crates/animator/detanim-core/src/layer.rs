//! Layers: independently updating sub-state-machines of a graph.

use serde::{Deserialize, Serialize};

use crate::behaviour::StateRole;
use crate::graph::Graph;
use crate::ids::StateId;
use crate::instance::LayerData;
use crate::math::Fp;
use crate::outputs::{BlendEntry, GraphEvent, Outputs};
use crate::state::State;
use crate::variable::VariableBank;

#[derive(Debug, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub id: u32,
    /// Declared states plus exactly one synthetic Any state.
    pub states: Vec<State>,
}

impl Layer {
    pub fn new(name: &str, id: u32) -> Self {
        Self {
            name: name.to_string(),
            id,
            states: Vec::new(),
        }
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn default_state(&self) -> Option<&State> {
        self.states.iter().find(|s| s.is_default)
    }

    pub fn any_state(&self) -> Option<&State> {
        self.states.iter().find(|s| s.is_any)
    }

    /// One tick: enter the default state if the layer is fresh, advance the
    /// cross-fade clock, then update every state (Any included).
    pub(crate) fn update(
        &self,
        graph: &Graph,
        layer_data: &mut LayerData,
        bank: &mut VariableBank,
        outputs: &mut Outputs,
        dt: Fp,
    ) {
        if layer_data.current_state_id.is_none() {
            match self.default_state() {
                Some(default) => {
                    layer_data.current_state_id = default.id;
                    layer_data.time = Fp::ZERO;
                    layer_data.last_time = Fp::ZERO;
                    layer_data.normalized_time = Fp::ZERO;
                    layer_data.length = Fp::ZERO;
                    default.fire_enter(outputs, Fp::ZERO);
                }
                None => {
                    log::warn!("layer `{}` has no default state to enter", self.name);
                    return;
                }
            }
        }

        if layer_data.to_state_id.is_some() {
            layer_data.transition_time = layer_data.transition_time.saturating_add(dt);
            if layer_data.transition_time >= layer_data.transition_duration {
                self.complete_transition(layer_data, outputs);
            }
        }

        for state in &self.states {
            state.update(graph, self, layer_data, bank, outputs, dt);
        }
    }

    /// Promote To into Current and clear the fade.
    fn complete_transition(&self, layer_data: &mut LayerData, outputs: &mut Outputs) {
        let completed = layer_data.to_state_id;
        layer_data.current_state_id = completed;
        layer_data.time = layer_data.to_state_time;
        layer_data.last_time = layer_data.to_state_last_time;
        layer_data.normalized_time = layer_data.to_state_normalized_time;
        layer_data.length = layer_data.to_length;

        layer_data.from_state_id = StateId::NONE;
        layer_data.from_state_time = Fp::ZERO;
        layer_data.from_state_last_time = Fp::ZERO;
        layer_data.from_state_normalized_time = Fp::ZERO;
        layer_data.from_length = Fp::ZERO;

        layer_data.to_state_id = StateId::NONE;
        layer_data.to_state_time = Fp::ZERO;
        layer_data.to_state_last_time = Fp::ZERO;
        layer_data.to_state_normalized_time = Fp::ZERO;
        layer_data.to_length = Fp::ZERO;

        layer_data.transition_time = Fp::ZERO;
        layer_data.transition_duration = Fp::ZERO;
        layer_data.transition_index = 0;
        // A fade-scoped transition freeze ends with the fade.
        layer_data.ignore_transitions = false;

        outputs.push_event(GraphEvent::TransitionCompleted { state: completed });
    }

    /// Append this layer's weighted contributions: From and To scaled by
    /// the cross-fade progress while a transition runs, Current alone
    /// otherwise.
    pub fn generate_blend_list(
        &self,
        layer_data: &mut LayerData,
        bank: &VariableBank,
        out: &mut Vec<BlendEntry>,
    ) {
        if layer_data.to_state_id.is_some() {
            let progress = layer_data.transition_progress();
            self.contribute(
                layer_data.from_state_id,
                StateRole::From,
                Fp::ONE - progress,
                layer_data,
                bank,
                out,
            );
            self.contribute(
                layer_data.to_state_id,
                StateRole::To,
                progress,
                layer_data,
                bank,
                out,
            );
        } else {
            self.contribute(
                layer_data.current_state_id,
                StateRole::Current,
                Fp::ONE,
                layer_data,
                bank,
                out,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn contribute(
        &self,
        id: StateId,
        role: StateRole,
        weight_scale: Fp,
        layer_data: &mut LayerData,
        bank: &VariableBank,
        out: &mut Vec<BlendEntry>,
    ) {
        if id.is_none() || weight_scale <= Fp::ZERO {
            return;
        }
        let Some(state) = self.state(id) else {
            return;
        };
        if state.is_any {
            return;
        }
        let Some(motion) = state.motion.as_ref().filter(|m| !m.is_empty()) else {
            return;
        };

        state.refresh_weights(bank, layer_data);
        let length = motion.calculate_length(bank, layer_data.weights_for(id), Fp::ONE);
        if length == Fp::ZERO {
            return;
        }

        let (current_time, last_time) = match role {
            StateRole::Current => (layer_data.time, layer_data.last_time),
            StateRole::From => (
                layer_data.from_state_time,
                layer_data.from_state_last_time,
            ),
            StateRole::To => (layer_data.to_state_time, layer_data.to_state_last_time),
        };
        motion.generate_blend_list(
            bank,
            layer_data.weights_for(id),
            id,
            current_time,
            last_time,
            weight_scale,
            out,
        );
    }
}
