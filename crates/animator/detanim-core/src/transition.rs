//! Transitions: directed edges between states.
//!
//! A transition fires when all of its conditions hold and, if an exit time
//! is required, the source head's normalized time has reached it. Firing
//! promotes the exiting endpoint into the From slot and seeds the To slot
//! at the authored offset; the layer's cross-fade clock then drives the
//! blend until completion.

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::ids::{state_id, StateId};
use crate::instance::LayerData;
use crate::layer::Layer;
use crate::math::{clamp01, Fp};
use crate::outputs::{GraphEvent, Outputs};
use crate::state::State;
use crate::variable::{VariableBank, VariableType, VariableValue};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConditionMode {
    If,
    IfNot,
    Greater,
    Less,
    Equals,
    NotEqual,
}

/// One boolean/numeric predicate over a bank variable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Condition {
    pub variable_name: String,
    pub variable_index: usize,
    pub mode: ConditionMode,
    pub threshold_fp: Fp,
    pub threshold_int: i32,
}

impl Condition {
    pub fn boolean(name: &str, index: usize, mode: ConditionMode) -> Self {
        Self {
            variable_name: name.to_string(),
            variable_index: index,
            mode,
            threshold_fp: Fp::ZERO,
            threshold_int: 0,
        }
    }

    pub fn fixed_point(name: &str, index: usize, mode: ConditionMode, threshold: Fp) -> Self {
        Self {
            variable_name: name.to_string(),
            variable_index: index,
            mode,
            threshold_fp: threshold,
            threshold_int: 0,
        }
    }

    pub fn integer(name: &str, index: usize, mode: ConditionMode, threshold: i32) -> Self {
        Self {
            variable_name: name.to_string(),
            variable_index: index,
            mode,
            threshold_fp: Fp::ZERO,
            threshold_int: threshold,
        }
    }

    fn evaluate(&self, bank: &VariableBank) -> bool {
        match bank.value(self.variable_index) {
            VariableValue::Bool(b) => match self.mode {
                ConditionMode::If => b,
                ConditionMode::IfNot => !b,
                _ => {
                    log::warn!("condition on `{}` uses {:?} against a bool", self.variable_name, self.mode);
                    false
                }
            },
            VariableValue::Fp(v) => match self.mode {
                ConditionMode::Greater => v > self.threshold_fp,
                ConditionMode::Less => v < self.threshold_fp,
                _ => {
                    log::warn!("condition on `{}` uses {:?} against an fp", self.variable_name, self.mode);
                    false
                }
            },
            VariableValue::Int(v) => match self.mode {
                ConditionMode::Greater => v > self.threshold_int,
                ConditionMode::Less => v < self.threshold_int,
                ConditionMode::Equals => v == self.threshold_int,
                ConditionMode::NotEqual => v != self.threshold_int,
                _ => {
                    log::warn!("condition on `{}` uses {:?} against an int", self.variable_name, self.mode);
                    false
                }
            },
        }
    }
}

/// Directed edge to a destination state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transition {
    pub index: u32,
    pub name: String,
    pub duration: Fp,
    pub offset: Fp,
    pub has_exit_time: bool,
    pub exit_time: Fp,
    pub destination_state_id: StateId,
    pub destination_state_name: String,
    /// Only Any-state transitions may re-enter the active endpoint.
    pub can_transition_to_self: bool,
    pub conditions: Vec<Condition>,
}

impl Transition {
    pub fn new(index: u32, source_name: &str, destination_name: &str) -> Self {
        Self {
            index,
            name: format!("{source_name} to {destination_name}"),
            duration: Fp::ZERO,
            offset: Fp::ZERO,
            has_exit_time: false,
            exit_time: Fp::ZERO,
            destination_state_id: state_id(destination_name),
            destination_state_name: destination_name.to_string(),
            can_transition_to_self: false,
            conditions: Vec::new(),
        }
    }

    /// Evaluate against the current bank and head time; fire on success.
    /// Returns true when the transition fired (the caller stops scanning).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn update(
        &self,
        graph: &Graph,
        layer: &Layer,
        layer_data: &mut LayerData,
        bank: &mut VariableBank,
        outputs: &mut Outputs,
        source_normalized_time: Fp,
        dt: Fp,
    ) -> bool {
        let Some(destination) = layer.state(self.destination_state_id) else {
            log::warn!(
                "transition `{}` targets unknown state `{}`",
                self.name,
                self.destination_state_name
            );
            return false;
        };

        if self.has_exit_time && source_normalized_time < self.exit_time {
            return false;
        }
        if !self.can_transition_to_self && destination.id == layer_data.active_endpoint() {
            return false;
        }
        for condition in &self.conditions {
            if !condition.evaluate(bank) {
                return false;
            }
        }

        // Consume triggers only once the whole condition set has passed, so
        // an unmet sibling condition never eats a trigger.
        for condition in &self.conditions {
            if condition.mode == ConditionMode::If {
                if let Some(decl) = graph.variables.get(condition.variable_index) {
                    if decl.ty == VariableType::Trigger {
                        bank.reset_trigger(condition.variable_index);
                    }
                }
            }
        }

        self.fire(graph, layer, layer_data, bank, outputs, destination, dt);
        true
    }

    /// Slot promotion and To-slot seeding shared with `Graph::fade_to`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn fire(
        &self,
        graph: &Graph,
        layer: &Layer,
        layer_data: &mut LayerData,
        bank: &VariableBank,
        outputs: &mut Outputs,
        destination: &State,
        dt: Fp,
    ) {
        // Exit fires before the slots are overwritten, with the
        // pre-promotion endpoint still addressable.
        if layer_data.to_state_id.is_some() {
            if let Some(exiting) = layer.state(layer_data.to_state_id) {
                exiting.fire_exit(outputs, layer_data.to_state_time);
            }
            layer_data.from_state_id = layer_data.to_state_id;
            layer_data.from_state_time = layer_data.to_state_time;
            layer_data.from_state_last_time = layer_data.to_state_last_time;
            layer_data.from_state_normalized_time = layer_data.to_state_normalized_time;
            layer_data.from_length = layer_data.to_length;
        } else {
            if let Some(exiting) = layer.state(layer_data.current_state_id) {
                exiting.fire_exit(outputs, layer_data.time);
            }
            layer_data.from_state_id = layer_data.current_state_id;
            layer_data.from_state_time = layer_data.time;
            layer_data.from_state_last_time = layer_data.last_time;
            layer_data.from_state_normalized_time = layer_data.normalized_time;
            layer_data.from_length = layer_data.length;
        }

        layer_data.transition_time = Fp::ZERO;
        layer_data.transition_duration = self.duration;
        layer_data.transition_index = self.index;
        layer_data.to_state_id = destination.id;

        // The destination's weights may never have been computed; without
        // them a blend tree reports zero length.
        if destination.get_length(bank, layer_data) == Fp::ZERO {
            destination.refresh_weights(bank, layer_data);
        }
        let to_length = destination.get_length(bank, layer_data);
        let to_time = self.offset + destination.cycle_offset * to_length;

        layer_data.to_state_time = to_time;
        layer_data.to_state_last_time = (to_time - dt).max(Fp::ZERO);
        layer_data.to_length = to_length;
        layer_data.to_state_normalized_time = if to_length <= Fp::ZERO {
            Fp::ZERO
        } else if graph.clamp_time {
            clamp01(to_time / to_length)
        } else {
            to_time / to_length
        };

        outputs.push_event(GraphEvent::TransitionStarted {
            from: layer_data.from_state_id,
            to: destination.id,
            duration: self.duration,
        });
        destination.fire_enter(outputs, to_time);
    }
}
