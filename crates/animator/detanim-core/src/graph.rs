//! The animation graph asset: layers, variable declarations, global flags,
//! and the asset-level orchestration entry points.
//!
//! A `Graph` is baked once, validated, then shared read-only by every
//! entity instance; the core receives it by reference and never consults a
//! registry. All per-tick mutation happens on the `AnimatorInstance`.

use serde::{Deserialize, Serialize};

use crate::clip::MotionFrame;
use crate::error::GraphError;
use crate::ids::StateId;
use crate::instance::{AnimatorInstance, LayerData};
use crate::layer::Layer;
use crate::math::Fp;
use crate::motion::{Motion, TableResolution};
use crate::outputs::{BlendEntry, Outputs, RootMotion};
use crate::state::State;
use crate::transition::Transition;
use crate::variable::{VariableBank, VariableDecl};

#[derive(Debug, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub weight_table_resolution: TableResolution,
    pub layers: Vec<Layer>,
    pub variables: Vec<VariableDecl>,
    /// Gate for `fade_to`/`try_fade_to`; disabled fades warn and no-op.
    pub allow_fade_to_transitions: bool,
    /// Emit the root-motion frame pair from `update`.
    pub root_motion: bool,
    /// Clamp/wrap normalized time into [0, 1]. Disable when exit times
    /// beyond 1 are needed; time then accumulates raw (saturating).
    pub clamp_time: bool,
    /// Allow the Current state to start a new transition mid-fade.
    pub allow_transition_interruption: bool,
}

impl Graph {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            weight_table_resolution: TableResolution::default(),
            layers: Vec::new(),
            variables: Vec::new(),
            allow_fade_to_transitions: true,
            root_motion: false,
            clamp_time: true,
            allow_transition_interruption: false,
        }
    }

    /// Parse a baked graph asset from its JSON form. Behaviour hooks are
    /// runtime-registered and come back empty.
    pub fn from_json(json: &str) -> Result<Graph, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the asset to JSON (hooks are skipped).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Bake every blend tree's lookup tables at the graph's resolution.
    /// Part of the bake step; tables are immutable afterwards.
    pub fn bake_blend_tables(&mut self) {
        let resolution = self.weight_table_resolution;
        for layer in &mut self.layers {
            for state in &mut layer.states {
                if let Some(motion) = &mut state.motion {
                    bake_motion_tables(motion, resolution);
                }
            }
        }
    }

    /// Check the asset invariants a bake must deliver. Runtime code assumes
    /// a validated graph.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (expected, decl) in self.variables.iter().enumerate() {
            if decl.index != expected {
                return Err(GraphError::VariableIndexNotDense {
                    name: decl.name.clone(),
                    expected,
                    got: decl.index,
                });
            }
        }

        let mut seen = Vec::new();
        for layer in &self.layers {
            if layer.states.iter().all(|s| s.is_any) {
                return Err(GraphError::EmptyLayer {
                    layer: layer.name.clone(),
                });
            }
            let defaults = layer.states.iter().filter(|s| s.is_default).count();
            if defaults == 0 {
                return Err(GraphError::MissingDefaultState {
                    layer: layer.name.clone(),
                });
            }
            if defaults > 1 {
                return Err(GraphError::MultipleDefaultStates {
                    layer: layer.name.clone(),
                });
            }
            if layer.any_state().is_none() {
                return Err(GraphError::MissingAnyState {
                    layer: layer.name.clone(),
                });
            }

            for state in &layer.states {
                if state.id.is_none() {
                    return Err(GraphError::ZeroStateId {
                        state: state.name.clone(),
                    });
                }
                // The synthetic Any state shares its name (and id) across
                // layers; uniqueness applies to the declared states.
                if !state.is_any {
                    if seen.contains(&state.id) {
                        return Err(GraphError::DuplicateStateId {
                            state: state.name.clone(),
                            id: state.id,
                        });
                    }
                    seen.push(state.id);
                    if state.motion.is_none() && !state.is_default {
                        return Err(GraphError::MissingMotion {
                            state: state.name.clone(),
                        });
                    }
                }
                if let Some(motion) = &state.motion {
                    motion.validate()?;
                    self.check_motion_parameters(motion)?;
                }
                for transition in &state.transitions {
                    for condition in &transition.conditions {
                        if condition.variable_index >= self.variables.len() {
                            return Err(GraphError::ConditionVariableOutOfRange {
                                transition: transition.name.clone(),
                                index: condition.variable_index,
                                count: self.variables.len(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn check_motion_parameters(&self, motion: &Motion) -> Result<(), GraphError> {
        if let Motion::BlendTree(tree) = motion {
            let count = self.variables.len();
            let worst = tree.blend_parameter.max(tree.blend_parameter_y);
            if worst >= count {
                return Err(GraphError::BlendParameterOutOfRange {
                    motion: tree.name.clone(),
                    index: worst,
                    count,
                });
            }
            for child in &tree.motions {
                self.check_motion_parameters(child)?;
            }
        }
        Ok(())
    }

    /// Allocate the per-entity runtime record: the variable bank at its
    /// declared defaults and one `LayerData` per layer, with a zeroed
    /// weight vector sized to each state's blend-tree child count.
    pub fn initialise(&self) -> AnimatorInstance {
        let variables = VariableBank::from_declarations(&self.variables);
        let mut layers = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let mut data = LayerData::default();
            for state in &layer.states {
                let children = match &state.motion {
                    Some(Motion::BlendTree(tree)) => tree.child_count(),
                    _ => 0,
                };
                data.insert_weights(state.id, vec![Fp::ZERO; children]);
            }
            layers.push(data);
        }
        AnimatorInstance {
            variables,
            layers,
            outputs: Outputs::default(),
            scratch_blend: Vec::new(),
        }
    }

    /// Advance one layer by `dt` (already scaled by the layer speed).
    pub fn update_graph_state(&self, instance: &mut AnimatorInstance, layer_index: usize, dt: Fp) {
        assert!(layer_index < self.layers.len(), "layer index out of range");
        assert_eq!(
            instance.layers.len(),
            self.layers.len(),
            "instance was initialised for a different graph"
        );
        let AnimatorInstance {
            variables,
            layers,
            outputs,
            ..
        } = instance;
        self.layers[layer_index].update(self, &mut layers[layer_index], variables, outputs, dt);
    }

    /// Whole-instance tick: clear outputs, update every non-frozen layer at
    /// its own speed, then emit root motion when the graph enables it.
    pub fn update(&self, instance: &mut AnimatorInstance, dt: Fp) {
        instance.outputs.clear();
        for layer_index in 0..self.layers.len() {
            let layer_data = &instance.layers[layer_index];
            if layer_data.freeze {
                continue;
            }
            let scaled = dt * layer_data.speed;
            self.update_graph_state(instance, layer_index, scaled);
        }
        if self.root_motion {
            let mut blend_list = core::mem::take(&mut instance.scratch_blend);
            let root = self.calculate_root_motion(instance, &mut blend_list);
            instance.scratch_blend = blend_list;
            instance.outputs.root_motion = Some(root);
        }
    }

    /// Flat weighted blend list across all layers, in layer order.
    pub fn generate_blend_list(&self, instance: &mut AnimatorInstance, out: &mut Vec<BlendEntry>) {
        assert_eq!(
            instance.layers.len(),
            self.layers.len(),
            "instance was initialised for a different graph"
        );
        let AnimatorInstance {
            variables, layers, ..
        } = instance;
        for (layer_index, layer) in self.layers.iter().enumerate() {
            layer.generate_blend_list(&mut layers[layer_index], variables, out);
        }
    }

    /// Accumulate root motion over the blend list, in declaration order so
    /// fixed-point rounding stays bit-reproducible.
    pub fn calculate_root_motion(
        &self,
        instance: &mut AnimatorInstance,
        blend_list: &mut Vec<BlendEntry>,
    ) -> RootMotion {
        blend_list.clear();
        self.generate_blend_list(instance, blend_list);

        let mut delta = MotionFrame::default();
        let mut current = MotionFrame::default();
        for entry in blend_list.iter() {
            if entry.state_id.is_none() {
                continue;
            }
            let Some(state) = self.get_state(entry.state_id) else {
                continue;
            };
            let Some(Motion::Clip(clip)) = state.get_motion(entry.animation_index) else {
                continue;
            };
            if clip.data.disable_root_motion {
                continue;
            }
            delta = delta + clip.data.calculate_delta(entry.last_time, entry.current_time) * entry.weight;
            current = current + clip.data.frame_at_time(entry.current_time) * entry.weight;
        }
        RootMotion { delta, current }
    }

    /// Search all layers for the state with this id.
    pub fn get_state(&self, id: StateId) -> Option<&State> {
        for layer in &self.layers {
            if let Some(state) = layer.state(id) {
                return Some(state);
            }
        }
        None
    }

    /// Search all layers for a state by name, returning its layer index.
    pub fn get_state_by_name(&self, name: &str) -> Option<(&State, usize)> {
        for (layer_index, layer) in self.layers.iter().enumerate() {
            if let Some(state) = layer.states.iter().find(|s| s.name == name) {
                return Some((state, layer_index));
            }
        }
        log::warn!("no state with the name `{name}` found in `{}`", self.name);
        None
    }

    /// Dense index of a declared variable, by linear scan.
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables
            .iter()
            .position(|decl| decl.name == name)
    }

    /// Re-apply declared variable defaults on an instance.
    pub fn reset_variables(&self, instance: &mut AnimatorInstance) {
        instance.variables.reset(&self.variables);
    }

    /// Hard transition to a named state, bypassing the condition system.
    /// Gated by `allow_fade_to_transitions` (warn + no-op when disabled).
    pub fn fade_to(&self, instance: &mut AnimatorInstance, state_name: &str, request: FadeRequest) {
        let Some((_, layer_index)) = self.get_state_by_name(state_name) else {
            return;
        };
        self.fade_to_layer(instance, layer_index, state_name, request);
    }

    /// `fade_to` that refuses when the target is already current or already
    /// being faded to. Returns whether the fade started.
    pub fn try_fade_to(
        &self,
        instance: &mut AnimatorInstance,
        state_name: &str,
        request: FadeRequest,
    ) -> bool {
        let Some((target, layer_index)) = self.get_state_by_name(state_name) else {
            return false;
        };
        let layer_data = &instance.layers[layer_index];
        if layer_data.current_state_id == target.id && layer_data.to_state_id.is_none() {
            return false;
        }
        if layer_data.to_state_id == target.id {
            return false;
        }
        self.fade_to_layer(instance, layer_index, state_name, request);
        true
    }

    fn fade_to_layer(
        &self,
        instance: &mut AnimatorInstance,
        layer_index: usize,
        state_name: &str,
        request: FadeRequest,
    ) {
        if !self.allow_fade_to_transitions {
            log::warn!(
                "cannot fade to `{state_name}`: enable allow_fade_to_transitions on `{}`",
                self.name
            );
            return;
        }
        let layer = &self.layers[layer_index];
        let Some(destination) = layer.states.iter().find(|s| s.name == state_name) else {
            return;
        };

        let AnimatorInstance {
            variables,
            layers,
            outputs,
            ..
        } = instance;
        let layer_data = &mut layers[layer_index];
        layer_data.ignore_transitions = request.set_ignore_transitions;

        if request.reset_variables {
            variables.reset(&self.variables);
        }

        // Same slot-promotion logic as a condition-driven fire.
        let synthetic = Transition {
            index: 0,
            name: format!("fade to {state_name}"),
            duration: request.duration,
            offset: request.offset,
            has_exit_time: false,
            exit_time: Fp::ZERO,
            destination_state_id: destination.id,
            destination_state_name: destination.name.clone(),
            can_transition_to_self: true,
            conditions: Vec::new(),
        };
        synthetic.fire(
            self,
            layer,
            layer_data,
            variables,
            outputs,
            destination,
            request.delta_time,
        );
    }
}

fn bake_motion_tables(motion: &mut Motion, resolution: TableResolution) {
    if let Motion::BlendTree(tree) = motion {
        for child in &mut tree.motions {
            bake_motion_tables(child, resolution);
        }
        tree.bake_tables(resolution);
    }
}

/// Options for `Graph::fade_to`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct FadeRequest {
    pub duration: Fp,
    /// Start time of the destination state, in seconds.
    pub offset: Fp,
    /// Tick delta used to back-date the destination's last time.
    pub delta_time: Fp,
    pub reset_variables: bool,
    /// Freeze condition-driven transitions for the fade's duration.
    pub set_ignore_transitions: bool,
}

impl Default for FadeRequest {
    fn default() -> Self {
        Self {
            duration: Fp::from_num(0.1),
            offset: Fp::ZERO,
            delta_time: Fp::ZERO,
            reset_variables: false,
            set_ignore_transitions: false,
        }
    }
}
