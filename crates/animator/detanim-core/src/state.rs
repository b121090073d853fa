//! States: nodes of the layer graph.
//!
//! Each tick a state advances whichever playback heads (current/from/to)
//! point at it and fires its behaviour hooks. If it is the layer's active
//! endpoint (or the Any state) it then scans its transitions in declared
//! order, first match wins.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::behaviour::{StateBehaviour, StateRole};
use crate::graph::Graph;
use crate::ids::{state_id, StateId};
use crate::instance::LayerData;
use crate::layer::Layer;
use crate::math::{clamp01, Fp};
use crate::motion::Motion;
use crate::outputs::{GraphEvent, Outputs};
use crate::transition::Transition;
use crate::variable::VariableBank;

pub const ANY_STATE_NAME: &str = "Any State";

#[derive(Serialize, Deserialize)]
pub struct State {
    pub name: String,
    pub id: StateId,
    pub is_any: bool,
    pub is_default: bool,
    pub cycle_offset: Fp,
    pub speed: Fp,
    pub motion: Option<Motion>,
    pub transitions: Vec<Transition>,
    /// Hook objects registered at bake time; read-only afterwards.
    #[serde(skip)]
    pub behaviours: Vec<Box<dyn StateBehaviour>>,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("is_any", &self.is_any)
            .field("is_default", &self.is_default)
            .field("cycle_offset", &self.cycle_offset)
            .field("speed", &self.speed)
            .field("motion", &self.motion)
            .field("transitions", &self.transitions)
            .field("behaviours", &self.behaviours.len())
            .finish()
    }
}

impl State {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: state_id(name),
            is_any: false,
            is_default: false,
            cycle_offset: Fp::ZERO,
            speed: Fp::ONE,
            motion: None,
            transitions: Vec::new(),
            behaviours: Vec::new(),
        }
    }

    /// The synthetic pseudo-state whose transitions are checked every tick.
    pub fn any_state() -> Self {
        let mut state = Self::new(ANY_STATE_NAME);
        state.is_any = true;
        state
    }

    /// Attach a motion, assigning tree indices the way the bake does.
    pub fn with_motion(mut self, mut motion: Motion) -> Self {
        let mut next = 0;
        motion.assign_tree_indices(&mut next);
        self.motion = Some(motion);
        self
    }

    pub fn with_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Walk the motion tree for the motion carrying `tree_index`.
    pub fn get_motion(&self, tree_index: u32) -> Option<&Motion> {
        let mut queue: Vec<&Motion> = Vec::new();
        if let Some(motion) = &self.motion {
            queue.push(motion);
        }
        while !queue.is_empty() {
            let current = queue.remove(0);
            if current.tree_index() == tree_index {
                return Some(current);
            }
            if let Motion::BlendTree(tree) = current {
                queue.extend(tree.motions.iter());
            }
        }
        None
    }

    /// Effective motion length with the currently stored weights.
    pub fn get_length(&self, bank: &VariableBank, layer_data: &LayerData) -> Fp {
        match &self.motion {
            Some(motion) if !motion.is_empty() => {
                motion.calculate_length(bank, layer_data.weights_for(self.id), Fp::ONE)
            }
            _ => Fp::ZERO,
        }
    }

    /// Recompute this state's stored blend-tree weight vector.
    pub(crate) fn refresh_weights(&self, bank: &VariableBank, layer_data: &mut LayerData) {
        if let Some(motion) = &self.motion {
            if let Some(weights) = layer_data.weights_for_mut(self.id) {
                motion.calculate_weights(bank, weights);
            }
        }
    }

    pub(crate) fn fire_enter(&self, outputs: &mut Outputs, time: Fp) {
        outputs.push_event(GraphEvent::StateEntered {
            state: self.id,
            time,
        });
        for behaviour in &self.behaviours {
            if behaviour.on_state_enter(self, time) {
                break;
            }
        }
    }

    pub(crate) fn fire_exit(&self, outputs: &mut Outputs, time: Fp) {
        outputs.push_event(GraphEvent::StateExited {
            state: self.id,
            time,
        });
        for behaviour in &self.behaviours {
            if behaviour.on_state_exit(self, time) {
                break;
            }
        }
    }

    fn fire_update(&self, time: Fp, role: StateRole) {
        for behaviour in &self.behaviours {
            if behaviour.on_state_update(self, time, role) {
                break;
            }
        }
    }

    /// Progress this state by one tick.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn update(
        &self,
        graph: &Graph,
        layer: &Layer,
        layer_data: &mut LayerData,
        bank: &mut VariableBank,
        outputs: &mut Outputs,
        dt: Fp,
    ) {
        if !self.is_any {
            let motion_usable = self.motion.as_ref().is_some_and(|m| !m.is_empty());
            if !motion_usable && !self.is_default {
                // Invalid-motion guard: evict the state if it is live.
                if layer_data.current_state_id == self.id
                    || layer_data.from_state_id == self.id
                    || layer_data.to_state_id == self.id
                {
                    layer_data.current_state_id = StateId::NONE;
                    layer_data.from_state_id = StateId::NONE;
                    layer_data.to_state_id = StateId::NONE;
                }
                return;
            }

            if let Some(motion) = self.motion.as_ref().filter(|m| !m.is_empty()) {
                self.refresh_weights(bank, layer_data);
                let motion_speed = motion.calculate_speed(bank, self.speed).unwrap_or(self.speed);
                let dts = dt * motion_speed;

                // Advance time: current state. The current head is parked
                // while a transition is in flight; From/To advance instead.
                if layer_data.current_state_id == self.id && layer_data.to_state_id.is_none() {
                    let length =
                        motion.calculate_length(bank, layer_data.weights_for(self.id), Fp::ONE);
                    if length == Fp::ZERO {
                        return;
                    }

                    // Resync from normalized time so a length change (blend
                    // weights moved) keeps the playback phase. Saturating:
                    // non-clamp graphs accumulate raw time.
                    let sample_time = layer_data.normalized_time.saturating_mul(length);
                    let mut current_time = sample_time.saturating_add(dts);
                    let mut last_time = layer_data.time;

                    if graph.clamp_time {
                        if !motion.loop_time() && length + dts < current_time {
                            current_time = length;
                            if length < last_time {
                                last_time = current_time - dts;
                            }
                        }
                        if motion.loop_time() && length + dts < current_time {
                            current_time %= length;
                            // May go momentarily negative across the wrap;
                            // playback consumes it as a wrap discontinuity.
                            last_time = current_time - dts;
                        }
                    }

                    let mut normalized = current_time / length;
                    if graph.clamp_time {
                        if motion.loop_time() {
                            if normalized > Fp::ONE {
                                current_time %= length;
                            }
                            normalized %= Fp::ONE;
                        } else {
                            normalized = clamp01(normalized);
                        }
                    }

                    layer_data.time = current_time;
                    layer_data.last_time = last_time;
                    layer_data.normalized_time = normalized;
                    layer_data.length = length;

                    motion.process_events(
                        bank,
                        layer_data.weights_for(self.id),
                        self.id,
                        last_time,
                        current_time,
                        outputs,
                    );
                    self.fire_update(layer_data.time, StateRole::Current);
                }

                // Advance time: from state.
                if layer_data.from_state_id == self.id {
                    let length =
                        motion.calculate_length(bank, layer_data.weights_for(self.id), Fp::ONE);
                    if length == Fp::ZERO {
                        return;
                    }

                    let sample_time = layer_data.from_state_normalized_time.saturating_mul(length);
                    let mut last_time = sample_time;
                    let mut current_time = sample_time.saturating_add(dts);

                    if graph.clamp_time {
                        if !motion.loop_time() && length + dts < current_time {
                            current_time = length;
                            if length < last_time {
                                last_time = current_time - dts;
                            }
                        }
                        if motion.loop_time() && length + dts < current_time {
                            current_time %= length;
                            last_time = current_time - dts;
                        }
                    }

                    let mut normalized = current_time / length;
                    if graph.clamp_time {
                        if motion.loop_time() {
                            normalized %= Fp::ONE;
                        } else {
                            normalized = clamp01(normalized);
                        }
                    }

                    layer_data.from_state_time = current_time;
                    layer_data.from_state_last_time = last_time;
                    layer_data.from_state_normalized_time = normalized;
                    layer_data.from_length = length;

                    self.fire_update(layer_data.from_state_time, StateRole::From);
                }

                // Advance time: to state.
                if layer_data.to_state_id == self.id {
                    let length =
                        motion.calculate_length(bank, layer_data.weights_for(self.id), Fp::ONE);
                    if length == Fp::ZERO {
                        return;
                    }

                    let sample_time = layer_data.to_state_normalized_time.saturating_mul(length);
                    let mut last_time = sample_time;
                    let mut current_time = sample_time.saturating_add(dts);

                    if graph.clamp_time {
                        if !motion.loop_time() && length + dts < current_time {
                            current_time = length;
                            if length < last_time {
                                last_time = current_time - dts;
                            }
                        }
                        if motion.loop_time() && length + dts < current_time {
                            current_time %= length;
                            last_time = current_time - dts;
                        }
                    }

                    let mut normalized = current_time / length;
                    if graph.clamp_time {
                        if motion.loop_time() {
                            normalized %= Fp::ONE;
                        } else {
                            normalized = clamp01(normalized);
                        }
                    }

                    layer_data.to_state_time = current_time;
                    layer_data.to_state_last_time = last_time;
                    layer_data.to_state_normalized_time = normalized;
                    layer_data.to_length = length;

                    self.fire_update(layer_data.to_state_time, StateRole::To);
                }
            }
        }

        if layer_data.ignore_transitions {
            return;
        }
        if !self.may_evaluate_transitions(graph, layer_data) {
            return;
        }

        let source_normalized = if layer_data.to_state_id == self.id {
            layer_data.to_state_normalized_time
        } else {
            layer_data.normalized_time
        };
        for transition in &self.transitions {
            // First satisfied transition wins; the rest are skipped.
            if transition.update(
                graph,
                layer,
                layer_data,
                bank,
                outputs,
                source_normalized,
                dt,
            ) {
                break;
            }
        }
    }

    /// Only the layer's active endpoint scans transitions: To while a fade
    /// is in flight (plus Current when interruption is allowed), otherwise
    /// Current. The Any state always scans.
    fn may_evaluate_transitions(&self, graph: &Graph, layer_data: &LayerData) -> bool {
        if self.is_any {
            return true;
        }
        if layer_data.to_state_id.is_none() {
            return layer_data.current_state_id == self.id;
        }
        if layer_data.to_state_id == self.id {
            return true;
        }
        graph.allow_transition_interruption && layer_data.current_state_id == self.id
    }
}
