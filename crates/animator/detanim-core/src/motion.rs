//! Motions: single clips and blend trees.
//!
//! `Motion` is a closed tagged variant dispatched by `match`; there is no
//! trait-object dispatch anywhere in the evaluation path. Blend trees carry
//! weight tables baked at a fixed resolution; the runtime only quantizes,
//! looks up, and linearly interpolates between buckets, all in fixed point.

use serde::{Deserialize, Serialize};

use crate::clip::ClipData;
use crate::error::GraphError;
use crate::ids::StateId;
use crate::math::{clamp01, lerp, Fp, FpVec2};
use crate::outputs::{BlendEntry, GraphEvent, Outputs};
use crate::variable::VariableBank;

/// Samples per table axis, fixed at bake time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TableResolution {
    R8,
    R16,
    #[default]
    R32,
    R64,
}

impl TableResolution {
    #[inline]
    pub fn samples(self) -> usize {
        match self {
            TableResolution::R8 => 8,
            TableResolution::R16 => 16,
            TableResolution::R32 => 32,
            TableResolution::R64 => 64,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BlendKind {
    /// One parameter, children placed at thresholds along `position.x`.
    Simple1D,
    /// Two parameters, children placed freely; gradient-band weights.
    Freeform2D,
}

/// A single baked clip wrapped as a motion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClipMotion {
    pub name: String,
    pub tree_index: u32,
    pub data: ClipData,
}

impl ClipMotion {
    pub fn new(name: &str, data: ClipData) -> Self {
        Self {
            name: name.to_string(),
            tree_index: 0,
            data,
        }
    }
}

/// Parametric blend over child motions.
///
/// `positions` and `times_scale` run parallel to `motions`. The weight
/// table (and, for 1D, the time-scale table) must be baked before the tree
/// reaches a runtime instance; `Graph::validate` enforces it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlendTree {
    pub name: String,
    pub tree_index: u32,
    pub kind: BlendKind,
    pub loop_time: bool,
    /// Index of the driving variable in the graph's variable bank.
    pub blend_parameter: usize,
    /// Second axis for 2D trees; mirrors `blend_parameter` for 1D.
    pub blend_parameter_y: usize,
    pub motions: Vec<Motion>,
    pub positions: Vec<FpVec2>,
    pub times_scale: Vec<Fp>,
    pub resolution: TableResolution,
    #[serde(default)]
    pub weight_table: Vec<Fp>,
    #[serde(default)]
    pub time_scale_table: Vec<Fp>,
    #[serde(default)]
    pub min_position: FpVec2,
    #[serde(default)]
    pub max_position: FpVec2,
}

impl BlendTree {
    pub fn new(name: &str, kind: BlendKind, blend_parameter: usize) -> Self {
        Self {
            name: name.to_string(),
            tree_index: 0,
            kind,
            loop_time: true,
            blend_parameter,
            blend_parameter_y: blend_parameter,
            motions: Vec::new(),
            positions: Vec::new(),
            times_scale: Vec::new(),
            resolution: TableResolution::default(),
            weight_table: Vec::new(),
            time_scale_table: Vec::new(),
            min_position: FpVec2::ZERO,
            max_position: FpVec2::ZERO,
        }
    }

    /// Append a child motion at a blend-space position.
    pub fn push_child(&mut self, motion: Motion, position: FpVec2, time_scale: Fp) {
        self.motions.push(motion);
        self.positions.push(position);
        self.times_scale.push(time_scale);
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.motions.len()
    }

    fn expected_table_len(&self) -> usize {
        let res = self.resolution.samples();
        let buckets = match self.kind {
            BlendKind::Simple1D => res,
            BlendKind::Freeform2D => res * res,
        };
        buckets * self.child_count()
    }

    pub(crate) fn validate_tables(&self) -> Result<(), GraphError> {
        if self.weight_table.is_empty() {
            return Err(GraphError::UnbakedWeightTable {
                motion: self.name.clone(),
            });
        }
        if self.weight_table.len() != self.expected_table_len() {
            return Err(GraphError::WeightTableShape {
                motion: self.name.clone(),
                expected: self.expected_table_len(),
                got: self.weight_table.len(),
            });
        }
        Ok(())
    }

    /// Direct (table-free) weight evaluation at a blend-space point.
    /// Used by the bake; runtime lookups go through the table.
    pub fn weights_at(&self, point: FpVec2, out: &mut [Fp]) {
        let n = self.child_count();
        for w in out.iter_mut() {
            *w = Fp::ZERO;
        }
        if n == 0 {
            return;
        }
        if n == 1 {
            out[0] = Fp::ONE;
            return;
        }
        match self.kind {
            BlendKind::Simple1D => self.weights_1d(point.x, out),
            BlendKind::Freeform2D => self.weights_2d(point, out),
        }
    }

    /// 1D threshold interpolation between the two neighboring children.
    fn weights_1d(&self, x: Fp, out: &mut [Fp]) {
        let n = self.child_count();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| self.positions[*a].x.cmp(&self.positions[*b].x));

        if x <= self.positions[order[0]].x {
            out[order[0]] = Fp::ONE;
            return;
        }
        if x >= self.positions[order[n - 1]].x {
            out[order[n - 1]] = Fp::ONE;
            return;
        }
        for k in 0..n - 1 {
            let a = order[k];
            let b = order[k + 1];
            let ta = self.positions[a].x;
            let tb = self.positions[b].x;
            if x >= ta && x <= tb {
                let span = tb - ta;
                if span <= Fp::ZERO {
                    out[b] = Fp::ONE;
                } else {
                    let wb = (x - ta) / span;
                    out[a] = Fp::ONE - wb;
                    out[b] = wb;
                }
                return;
            }
        }
    }

    /// Gradient-band interpolation over freely placed children.
    fn weights_2d(&self, point: FpVec2, out: &mut [Fp]) {
        let n = self.child_count();
        let mut total = Fp::ZERO;
        for i in 0..n {
            let pi = self.positions[i];
            let mut influence = Fp::ONE;
            for j in 0..n {
                if j == i {
                    continue;
                }
                let edge = self.positions[j] - pi;
                let denom = edge.length_squared();
                if denom <= Fp::ZERO {
                    continue;
                }
                let t = (point - pi).dot(edge) / denom;
                let band = clamp01(Fp::ONE - t);
                if band < influence {
                    influence = band;
                }
            }
            out[i] = influence;
            total += influence;
        }
        if total > Fp::ZERO {
            for w in out.iter_mut() {
                *w /= total;
            }
        } else {
            // Point is outside every band: snap to the nearest child.
            let mut best = 0;
            let mut best_dist = (point - self.positions[0]).length_squared();
            for (i, p) in self.positions.iter().enumerate().skip(1) {
                let d = (point - *p).length_squared();
                if d < best_dist {
                    best = i;
                    best_dist = d;
                }
            }
            out[best] = Fp::ONE;
        }
    }

    /// Bake the weight table (and, for 1D trees, the time-scale table) at
    /// the given resolution. Resolution and tables are immutable afterwards.
    pub fn bake_tables(&mut self, resolution: TableResolution) {
        self.resolution = resolution;
        let res = resolution.samples();
        let n = self.child_count();

        self.min_position = FpVec2::new(Fp::MAX, Fp::MAX);
        self.max_position = FpVec2::new(Fp::MIN, Fp::MIN);
        for p in &self.positions {
            self.min_position.x = self.min_position.x.min(p.x);
            self.min_position.y = self.min_position.y.min(p.y);
            self.max_position.x = self.max_position.x.max(p.x);
            self.max_position.y = self.max_position.y.max(p.y);
        }
        if self.positions.is_empty() {
            self.min_position = FpVec2::ZERO;
            self.max_position = FpVec2::ZERO;
        }

        self.weight_table = vec![Fp::ZERO; self.expected_table_len()];
        let mut weights = vec![Fp::ZERO; n];
        match self.kind {
            BlendKind::Simple1D => {
                for bucket in 0..res {
                    let x = bucket_param(self.min_position.x, self.max_position.x, bucket, res);
                    self.weights_at(FpVec2::new(x, Fp::ZERO), &mut weights);
                    self.weight_table[bucket * n..(bucket + 1) * n].copy_from_slice(&weights);
                }
            }
            BlendKind::Freeform2D => {
                for by in 0..res {
                    let y = bucket_param(self.min_position.y, self.max_position.y, by, res);
                    for bx in 0..res {
                        let x = bucket_param(self.min_position.x, self.max_position.x, bx, res);
                        self.weights_at(FpVec2::new(x, y), &mut weights);
                        let row = (by * res + bx) * n;
                        self.weight_table[row..row + n].copy_from_slice(&weights);
                    }
                }
            }
        }

        self.time_scale_table.clear();
        if self.kind == BlendKind::Simple1D && self.times_scale.len() == n {
            for bucket in 0..res {
                let x = bucket_param(self.min_position.x, self.max_position.x, bucket, res);
                self.weights_at(FpVec2::new(x, Fp::ZERO), &mut weights);
                let mut scale = Fp::ZERO;
                for (w, ts) in weights.iter().zip(self.times_scale.iter()) {
                    let ts = if *ts <= Fp::ZERO { Fp::ONE } else { *ts };
                    scale += *w * ts;
                }
                self.time_scale_table.push(scale);
            }
        }
    }

    /// Table lookup at the current parameter value(s), linearly blended
    /// between the nearest buckets (bilinear for 2D). Out-of-domain
    /// parameters clamp to the boundary buckets.
    pub fn sample_weights(&self, bank: &VariableBank, out: &mut Vec<Fp>) {
        let n = self.child_count();
        if out.len() != n {
            out.resize(n, Fp::ZERO);
        }
        if n == 0 {
            return;
        }
        if self.weight_table.len() != self.expected_table_len() {
            log::warn!("blend tree `{}` has no baked weight table", self.name);
            let point = FpVec2::new(
                bank.get_fp(self.blend_parameter),
                bank.get_fp(self.blend_parameter_y),
            );
            self.weights_at(point, out);
            return;
        }
        let res = self.resolution.samples();
        let x = bank.get_fp(self.blend_parameter);
        match self.kind {
            BlendKind::Simple1D => {
                let (i0, i1, frac) =
                    bucket_index(self.min_position.x, self.max_position.x, x, res);
                for c in 0..n {
                    out[c] = lerp(
                        self.weight_table[i0 * n + c],
                        self.weight_table[i1 * n + c],
                        frac,
                    );
                }
            }
            BlendKind::Freeform2D => {
                let y = bank.get_fp(self.blend_parameter_y);
                let (ix0, ix1, fx) =
                    bucket_index(self.min_position.x, self.max_position.x, x, res);
                let (iy0, iy1, fy) =
                    bucket_index(self.min_position.y, self.max_position.y, y, res);
                for c in 0..n {
                    let w00 = self.weight_table[(iy0 * res + ix0) * n + c];
                    let w10 = self.weight_table[(iy0 * res + ix1) * n + c];
                    let w01 = self.weight_table[(iy1 * res + ix0) * n + c];
                    let w11 = self.weight_table[(iy1 * res + ix1) * n + c];
                    out[c] = lerp(lerp(w00, w10, fx), lerp(w01, w11, fx), fy);
                }
            }
        }
    }

    /// Effective playback-speed multiplier from the 1D time-scale table,
    /// or `None` when the tree carries no usable table.
    pub fn sample_time_scale(&self, bank: &VariableBank) -> Option<Fp> {
        let res = self.resolution.samples();
        if self.time_scale_table.len() != res {
            return None;
        }
        let x = bank.get_fp(self.blend_parameter);
        let (i0, i1, frac) = bucket_index(self.min_position.x, self.max_position.x, x, res);
        let scale = lerp(self.time_scale_table[i0], self.time_scale_table[i1], frac);
        if scale <= Fp::ZERO {
            None
        } else {
            Some(scale)
        }
    }
}

fn bucket_param(min: Fp, max: Fp, bucket: usize, res: usize) -> Fp {
    min + ((max - min) * Fp::from_num(bucket as i64)) / Fp::from_num((res - 1) as i64)
}

fn bucket_index(min: Fp, max: Fp, value: Fp, res: usize) -> (usize, usize, Fp) {
    let span = max - min;
    if span <= Fp::ZERO {
        return (0, 0, Fp::ZERO);
    }
    let u = clamp01((value - min) / span) * Fp::from_num((res - 1) as i64);
    let i0 = u.int().to_num::<usize>().min(res - 1);
    let i1 = (i0 + 1).min(res - 1);
    (i0, i1, u.frac())
}

/// Polymorphic unit of animation owned by a state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Motion {
    Clip(ClipMotion),
    BlendTree(BlendTree),
}

impl Motion {
    pub fn name(&self) -> &str {
        match self {
            Motion::Clip(c) => &c.name,
            Motion::BlendTree(t) => &t.name,
        }
    }

    pub fn tree_index(&self) -> u32 {
        match self {
            Motion::Clip(c) => c.tree_index,
            Motion::BlendTree(t) => t.tree_index,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Motion::Clip(c) => c.data.is_empty(),
            Motion::BlendTree(t) => t.motions.is_empty(),
        }
    }

    pub fn loop_time(&self) -> bool {
        match self {
            Motion::Clip(c) => c.data.loop_time,
            Motion::BlendTree(t) => t.loop_time,
        }
    }

    /// Assign depth-first tree indices; the bake runs this once per state so
    /// blend-list entries can address any nested motion.
    pub fn assign_tree_indices(&mut self, next: &mut u32) {
        match self {
            Motion::Clip(c) => {
                c.tree_index = *next;
                *next += 1;
            }
            Motion::BlendTree(t) => {
                t.tree_index = *next;
                *next += 1;
                for child in &mut t.motions {
                    child.assign_tree_indices(next);
                }
            }
        }
    }

    /// Recompute the child weight vector from current variable values.
    /// Clips have no children; their vector stays empty.
    pub fn calculate_weights(&self, bank: &VariableBank, out: &mut Vec<Fp>) {
        match self {
            Motion::Clip(_) => out.clear(),
            Motion::BlendTree(t) => t.sample_weights(bank, out),
        }
    }

    /// Effective motion duration; 0 signals "lengthless" and callers must
    /// early-return before dividing.
    pub fn calculate_length(&self, bank: &VariableBank, weights: &[Fp], weight_mul: Fp) -> Fp {
        match self {
            Motion::Clip(c) => c.data.length * weight_mul,
            Motion::BlendTree(t) => {
                let mut total = Fp::ZERO;
                for (i, child) in t.motions.iter().enumerate() {
                    let w = weights.get(i).copied().unwrap_or(Fp::ZERO);
                    if w <= Fp::ZERO {
                        continue;
                    }
                    let child_len = match child {
                        Motion::Clip(c) => c.data.length,
                        Motion::BlendTree(_) => {
                            let mut child_weights = Vec::new();
                            child.calculate_weights(bank, &mut child_weights);
                            child.calculate_length(bank, &child_weights, Fp::ONE)
                        }
                    };
                    total += child_len * w;
                }
                total * weight_mul
            }
        }
    }

    /// Motion-authored speed override; `None` means "use the state speed".
    pub fn calculate_speed(&self, bank: &VariableBank, state_speed: Fp) -> Option<Fp> {
        match self {
            Motion::Clip(_) => None,
            Motion::BlendTree(t) => match t.kind {
                BlendKind::Simple1D => t
                    .sample_time_scale(bank)
                    .map(|scale| state_speed * scale),
                BlendKind::Freeform2D => None,
            },
        }
    }

    /// Append weighted entries for every contributing clip, in declaration
    /// order, scaled by `weight_mul`.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_blend_list(
        &self,
        bank: &VariableBank,
        weights: &[Fp],
        state_id: StateId,
        current_time: Fp,
        last_time: Fp,
        weight_mul: Fp,
        out: &mut Vec<BlendEntry>,
    ) {
        match self {
            Motion::Clip(c) => {
                if weight_mul > Fp::ZERO {
                    out.push(BlendEntry {
                        state_id,
                        animation_index: c.tree_index,
                        weight: weight_mul,
                        current_time,
                        last_time,
                    });
                }
            }
            Motion::BlendTree(t) => {
                for (i, child) in t.motions.iter().enumerate() {
                    let w = weights.get(i).copied().unwrap_or(Fp::ZERO) * weight_mul;
                    if w <= Fp::ZERO {
                        continue;
                    }
                    match child {
                        Motion::Clip(_) => child.generate_blend_list(
                            bank,
                            &[],
                            state_id,
                            current_time,
                            last_time,
                            w,
                            out,
                        ),
                        Motion::BlendTree(_) => {
                            let mut child_weights = Vec::new();
                            child.calculate_weights(bank, &mut child_weights);
                            child.generate_blend_list(
                                bank,
                                &child_weights,
                                state_id,
                                current_time,
                                last_time,
                                w,
                                out,
                            );
                        }
                    }
                }
            }
        }
    }

    /// Fire clip events crossed by the window `(last, current]` into the
    /// output buffer.
    pub fn process_events(
        &self,
        bank: &VariableBank,
        weights: &[Fp],
        state_id: StateId,
        last: Fp,
        current: Fp,
        outputs: &mut Outputs,
    ) {
        match self {
            Motion::Clip(c) => {
                c.data.events_in_window(last, current, |event| {
                    outputs.push_event(GraphEvent::Clip {
                        state: state_id,
                        name: event.name.clone(),
                        time: event.time,
                    });
                });
            }
            Motion::BlendTree(t) => {
                for (i, child) in t.motions.iter().enumerate() {
                    let w = weights.get(i).copied().unwrap_or(Fp::ZERO);
                    if w <= Fp::ZERO {
                        continue;
                    }
                    match child {
                        Motion::Clip(_) => {
                            child.process_events(bank, &[], state_id, last, current, outputs)
                        }
                        Motion::BlendTree(_) => {
                            let mut child_weights = Vec::new();
                            child.calculate_weights(bank, &mut child_weights);
                            child.process_events(
                                bank,
                                &child_weights,
                                state_id,
                                last,
                                current,
                                outputs,
                            );
                        }
                    }
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), GraphError> {
        if let Motion::BlendTree(t) = self {
            t.validate_tables()?;
            for child in &t.motions {
                child.validate()?;
            }
        }
        Ok(())
    }
}
