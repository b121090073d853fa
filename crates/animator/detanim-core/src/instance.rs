//! Per-entity runtime records.
//!
//! Everything in here is mutable per-instance state: the variable bank, one
//! `LayerData` per graph layer, the per-tick output buffer, and a reusable
//! blend-list scratch. Instances are created by `Graph::initialise`, owned
//! by the entity's animator component, and dropped with it. The arena gives
//! component storage a stable integer handle instead of a raw address.

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::ids::StateId;
use crate::math::{clamp01, Fp};
use crate::outputs::{BlendEntry, LayerPlayback, Outputs};
use crate::variable::VariableBank;

/// Mutable per-layer playback record: the three heads (current/from/to),
/// the cross-fade clock, and the per-state blend-tree weight vectors.
///
/// `to_state_id == StateId::NONE` means no transition is in flight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerData {
    pub current_state_id: StateId,
    pub time: Fp,
    pub last_time: Fp,
    pub normalized_time: Fp,
    pub length: Fp,

    pub from_state_id: StateId,
    pub from_state_time: Fp,
    pub from_state_last_time: Fp,
    pub from_state_normalized_time: Fp,
    pub from_length: Fp,

    pub to_state_id: StateId,
    pub to_state_time: Fp,
    pub to_state_last_time: Fp,
    pub to_state_normalized_time: Fp,
    pub to_length: Fp,

    pub transition_time: Fp,
    pub transition_duration: Fp,
    pub transition_index: u32,

    pub speed: Fp,
    pub ignore_transitions: bool,
    pub freeze: bool,

    /// Per-state blend-tree weight vectors, in state declaration order.
    /// Linear scan keeps iteration order stable (never a hash map here).
    blend_tree_weights: Vec<(StateId, Vec<Fp>)>,
}

impl Default for LayerData {
    fn default() -> Self {
        Self {
            current_state_id: StateId::NONE,
            time: Fp::ZERO,
            last_time: Fp::ZERO,
            normalized_time: Fp::ZERO,
            length: Fp::ZERO,
            from_state_id: StateId::NONE,
            from_state_time: Fp::ZERO,
            from_state_last_time: Fp::ZERO,
            from_state_normalized_time: Fp::ZERO,
            from_length: Fp::ZERO,
            to_state_id: StateId::NONE,
            to_state_time: Fp::ZERO,
            to_state_last_time: Fp::ZERO,
            to_state_normalized_time: Fp::ZERO,
            to_length: Fp::ZERO,
            transition_time: Fp::ZERO,
            transition_duration: Fp::ZERO,
            transition_index: 0,
            speed: Fp::ONE,
            ignore_transitions: false,
            freeze: false,
            blend_tree_weights: Vec::new(),
        }
    }
}

const NO_WEIGHTS: &[Fp] = &[];

impl LayerData {
    pub(crate) fn insert_weights(&mut self, state: StateId, weights: Vec<Fp>) {
        if !self.blend_tree_weights.iter().any(|(id, _)| *id == state) {
            self.blend_tree_weights.push((state, weights));
        }
    }

    /// Current weight vector for a state; empty for clips and unknown ids.
    pub fn weights_for(&self, state: StateId) -> &[Fp] {
        self.blend_tree_weights
            .iter()
            .find_map(|(id, w)| if *id == state { Some(w.as_slice()) } else { None })
            .unwrap_or(NO_WEIGHTS)
    }

    pub(crate) fn weights_for_mut(&mut self, state: StateId) -> Option<&mut Vec<Fp>> {
        self.blend_tree_weights
            .iter_mut()
            .find_map(|(id, w)| if *id == state { Some(w) } else { None })
    }

    /// The state currently driving the layer: To while a transition is in
    /// flight, otherwise Current.
    #[inline]
    pub fn active_endpoint(&self) -> StateId {
        if self.to_state_id.is_some() {
            self.to_state_id
        } else {
            self.current_state_id
        }
    }

    /// Cross-fade progress in [0, 1]; 1 when no fade is running.
    pub fn transition_progress(&self) -> Fp {
        if self.to_state_id.is_none() {
            return Fp::ONE;
        }
        if self.transition_duration <= Fp::ZERO {
            return Fp::ONE;
        }
        clamp01(self.transition_time / self.transition_duration)
    }

    /// Snapshot of the playback heads for an external player.
    pub fn playback(&self) -> LayerPlayback {
        LayerPlayback {
            current_state_id: self.current_state_id,
            current_time: self.time,
            to_state_id: self.to_state_id,
            to_time: self.to_state_time,
            transition_progress: self.transition_progress(),
        }
    }
}

/// All mutable state for one entity's animator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnimatorInstance {
    pub variables: VariableBank,
    pub layers: Vec<LayerData>,
    pub outputs: Outputs,
    #[serde(skip)]
    pub(crate) scratch_blend: Vec<BlendEntry>,
}

impl AnimatorInstance {
    pub fn playback(&self, layer_index: usize) -> LayerPlayback {
        assert!(layer_index < self.layers.len(), "layer index out of range");
        self.layers[layer_index].playback()
    }

    fn resolve(&self, graph: &Graph, name: &str) -> Option<usize> {
        let index = graph.variable_index(name);
        if index.is_none() {
            log::warn!("no variable named `{name}` in graph `{}`", graph.name);
        }
        index
    }

    pub fn set_fixed_point(&mut self, graph: &Graph, name: &str, value: Fp) {
        if let Some(index) = self.resolve(graph, name) {
            self.variables.set_fp(index, value);
        }
    }

    pub fn get_fixed_point(&self, graph: &Graph, name: &str) -> Fp {
        match self.resolve(graph, name) {
            Some(index) => self.variables.get_fp(index),
            None => Fp::ZERO,
        }
    }

    pub fn set_integer(&mut self, graph: &Graph, name: &str, value: i32) {
        if let Some(index) = self.resolve(graph, name) {
            self.variables.set_int(index, value);
        }
    }

    pub fn get_integer(&self, graph: &Graph, name: &str) -> i32 {
        match self.resolve(graph, name) {
            Some(index) => self.variables.get_int(index),
            None => 0,
        }
    }

    pub fn set_boolean(&mut self, graph: &Graph, name: &str, value: bool) {
        if let Some(index) = self.resolve(graph, name) {
            self.variables.set_bool(index, value);
        }
    }

    pub fn get_boolean(&self, graph: &Graph, name: &str) -> bool {
        match self.resolve(graph, name) {
            Some(index) => self.variables.get_bool(index),
            None => false,
        }
    }

    pub fn set_trigger(&mut self, graph: &Graph, name: &str) {
        self.set_boolean(graph, name, true);
    }

    pub fn reset_trigger(&mut self, graph: &Graph, name: &str) {
        self.set_boolean(graph, name, false);
    }

    pub fn is_trigger_active(&self, graph: &Graph, name: &str) -> bool {
        self.get_boolean(graph, name)
    }
}

/// Stable integer handle into an `InstanceArena`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct InstanceHandle(u32);

/// Growable table of animator instances.
///
/// Handles stay valid across table growth; freed slots are recycled in LIFO
/// order. Access is by index only, never by address, so component storage
/// may relocate the arena freely.
#[derive(Default, Debug)]
pub struct InstanceArena {
    slots: Vec<Option<AnimatorInstance>>,
    free: Vec<u32>,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: AnimatorInstance) -> InstanceHandle {
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(instance);
            InstanceHandle(slot)
        } else {
            self.slots.push(Some(instance));
            InstanceHandle((self.slots.len() - 1) as u32)
        }
    }

    pub fn get(&self, handle: InstanceHandle) -> Option<&AnimatorInstance> {
        self.slots.get(handle.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: InstanceHandle) -> Option<&mut AnimatorInstance> {
        self.slots.get_mut(handle.0 as usize)?.as_mut()
    }

    pub fn remove(&mut self, handle: InstanceHandle) -> Option<AnimatorInstance> {
        let slot = self.slots.get_mut(handle.0 as usize)?;
        let instance = slot.take();
        if instance.is_some() {
            self.free.push(handle.0);
        }
        instance
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_recycles_slots() {
        let mut arena = InstanceArena::new();
        let a = arena.insert(AnimatorInstance::default());
        let b = arena.insert(AnimatorInstance::default());
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert!(arena.remove(a).is_some());
        assert!(arena.get(a).is_none());
        let c = arena.insert(AnimatorInstance::default());
        assert_eq!(a, c);
        assert_eq!(arena.len(), 2);
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn double_remove_is_none() {
        let mut arena = InstanceArena::new();
        let a = arena.insert(AnimatorInstance::default());
        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());
    }

    #[test]
    fn transition_progress_clamps() {
        let mut layer = LayerData {
            to_state_id: StateId(7),
            transition_duration: Fp::from_num(0.25),
            transition_time: Fp::from_num(0.5),
            ..Default::default()
        };
        assert_eq!(layer.transition_progress(), Fp::ONE);
        layer.transition_time = Fp::from_num(0.125);
        assert_eq!(layer.transition_progress(), Fp::from_num(0.5));
    }
}
