//! Sampled clip data and root-motion frame arithmetic.
//!
//! A clip is a uniform table of `MotionFrame`s baked from the authoring
//! tool's root curves: position, rotation, extracted yaw, and the frame's
//! custom time. The runtime only ever samples and differences this table;
//! it never evaluates curves.

use serde::{Deserialize, Serialize};

use crate::math::{lerp, Fp, FpQuat, FpVec3};

/// One sampled root-motion frame.
///
/// Arithmetic semantics (all exact fixed-point mul/add):
/// - `+` composes: positions/yaw/time add, rotations multiply.
/// - `-` differences: positions/yaw/time subtract, rotation becomes the
///   relative rotation `self * conj(rhs)`.
/// - `* Fp` weights a contribution: position/yaw/time scale linearly, the
///   rotation is lerped from identity (unnormalized; hosts renormalize).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionFrame {
    pub time: Fp,
    pub position: FpVec3,
    pub rotation: FpQuat,
    pub rotation_y: Fp,
}

impl MotionFrame {
    pub fn lerp(a: MotionFrame, b: MotionFrame, t: Fp) -> MotionFrame {
        MotionFrame {
            time: lerp(a.time, b.time, t),
            position: FpVec3::new(
                lerp(a.position.x, b.position.x, t),
                lerp(a.position.y, b.position.y, t),
                lerp(a.position.z, b.position.z, t),
            ),
            rotation: a.rotation.lerp(b.rotation, t),
            rotation_y: lerp(a.rotation_y, b.rotation_y, t),
        }
    }
}

impl core::ops::Add for MotionFrame {
    type Output = MotionFrame;
    fn add(self, rhs: MotionFrame) -> MotionFrame {
        MotionFrame {
            time: self.time + rhs.time,
            position: self.position + rhs.position,
            rotation: self.rotation.product(rhs.rotation),
            rotation_y: self.rotation_y + rhs.rotation_y,
        }
    }
}

impl core::ops::Sub for MotionFrame {
    type Output = MotionFrame;
    fn sub(self, rhs: MotionFrame) -> MotionFrame {
        MotionFrame {
            time: self.time - rhs.time,
            position: self.position - rhs.position,
            rotation: self.rotation.product(rhs.rotation.conjugate()),
            rotation_y: self.rotation_y - rhs.rotation_y,
        }
    }
}

impl core::ops::Mul<Fp> for MotionFrame {
    type Output = MotionFrame;
    fn mul(self, rhs: Fp) -> MotionFrame {
        MotionFrame {
            time: self.time * rhs,
            position: self.position * rhs,
            rotation: self.rotation.weighted(rhs),
            rotation_y: self.rotation_y * rhs,
        }
    }
}

/// An event authored on a clip timeline, fired when playback crosses its
/// time stamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipEvent {
    pub time: Fp,
    pub name: String,
}

/// Baked clip asset: uniform frame table plus playback flags.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClipData {
    pub clip_name: String,
    pub frame_rate: u32,
    pub length: Fp,
    pub frames: Vec<MotionFrame>,
    pub loop_time: bool,
    pub mirror: bool,
    pub disable_root_motion: bool,
    pub events: Vec<ClipEvent>,
}

impl ClipData {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() || self.length <= Fp::ZERO
    }

    /// Sample the frame table at an absolute clip time.
    ///
    /// Times are clamped into [0, length]; the table spans the clip
    /// uniformly with the last frame pinned at `length`.
    pub fn frame_at_time(&self, time: Fp) -> MotionFrame {
        let n = self.frames.len();
        if n == 0 {
            return MotionFrame::default();
        }
        if n == 1 || self.length <= Fp::ZERO {
            return self.frames[0];
        }
        let t = time.clamp(Fp::ZERO, self.length);
        let pos = (t / self.length) * Fp::from_num((n - 1) as i64);
        let i0 = pos.int().to_num::<usize>().min(n - 1);
        if i0 >= n - 1 {
            return self.frames[n - 1];
        }
        MotionFrame::lerp(self.frames[i0], self.frames[i0 + 1], pos.frac())
    }

    /// Root-motion difference between two sample times.
    ///
    /// A wrapped window (`current < last`) runs to the end of the clip and
    /// back in from its start, so looping playback accumulates the full
    /// distance traveled.
    pub fn calculate_delta(&self, last: Fp, current: Fp) -> MotionFrame {
        if self.is_empty() {
            return MotionFrame::default();
        }
        if current >= last {
            self.frame_at_time(current) - self.frame_at_time(last)
        } else {
            (self.frame_at_time(self.length) - self.frame_at_time(last))
                + (self.frame_at_time(current) - self.frame_at_time(Fp::ZERO))
        }
    }

    /// Visit events whose stamp falls in the half-open window
    /// `(last, current]`, wrap-aware.
    pub fn events_in_window(&self, last: Fp, current: Fp, mut visit: impl FnMut(&ClipEvent)) {
        if last <= current {
            for event in &self.events {
                if event.time > last && event.time <= current {
                    visit(event);
                }
            }
        } else {
            for event in &self.events {
                if event.time > last || event.time <= current {
                    visit(event);
                }
            }
        }
    }
}
