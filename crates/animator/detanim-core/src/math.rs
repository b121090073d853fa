//! Fixed-point math facade.
//!
//! All simulation arithmetic goes through `Fp` (Q48.16: 48 integer bits,
//! 16 fractional bits), so identical inputs produce bit-identical outputs
//! on every machine. Float conversion (`Fp::from_num`)
//! is reserved for bake/fixture construction and must never appear on a
//! per-tick path. Non-clamped time accumulation uses `saturating_add`; a
//! runaway timeline saturates at `Fp::MAX` instead of wrapping sign.

use serde::{Deserialize, Serialize};

/// Deterministic fixed-point scalar: 48 integer bits, 16 fractional bits.
pub type Fp = fixed::types::I48F16;

/// Clamp into [0, 1].
#[inline]
pub fn clamp01(x: Fp) -> Fp {
    x.clamp(Fp::ZERO, Fp::ONE)
}

/// Linear interpolation `a*(1-t) + b*t`.
///
/// The convex form keeps truncation from pushing the result past either
/// endpoint, which the blend-table lookup relies on.
#[inline]
pub fn lerp(a: Fp, b: Fp, t: Fp) -> Fp {
    a * (Fp::ONE - t) + b * t
}

/// 2D fixed-point vector (blend-space positions, table parameters).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpVec2 {
    pub x: Fp,
    pub y: Fp,
}

impl FpVec2 {
    pub const ZERO: FpVec2 = FpVec2 {
        x: Fp::ZERO,
        y: Fp::ZERO,
    };

    #[inline]
    pub fn new(x: Fp, y: Fp) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, other: FpVec2) -> Fp {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn length_squared(self) -> Fp {
        self.dot(self)
    }
}

impl core::ops::Add for FpVec2 {
    type Output = FpVec2;
    #[inline]
    fn add(self, rhs: FpVec2) -> FpVec2 {
        FpVec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl core::ops::Sub for FpVec2 {
    type Output = FpVec2;
    #[inline]
    fn sub(self, rhs: FpVec2) -> FpVec2 {
        FpVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl core::ops::Mul<Fp> for FpVec2 {
    type Output = FpVec2;
    #[inline]
    fn mul(self, rhs: Fp) -> FpVec2 {
        FpVec2::new(self.x * rhs, self.y * rhs)
    }
}

/// 3D fixed-point vector (root-motion positions).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpVec3 {
    pub x: Fp,
    pub y: Fp,
    pub z: Fp,
}

impl FpVec3 {
    pub const ZERO: FpVec3 = FpVec3 {
        x: Fp::ZERO,
        y: Fp::ZERO,
        z: Fp::ZERO,
    };

    #[inline]
    pub fn new(x: Fp, y: Fp, z: Fp) -> Self {
        Self { x, y, z }
    }
}

impl core::ops::Add for FpVec3 {
    type Output = FpVec3;
    #[inline]
    fn add(self, rhs: FpVec3) -> FpVec3 {
        FpVec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl core::ops::Sub for FpVec3 {
    type Output = FpVec3;
    #[inline]
    fn sub(self, rhs: FpVec3) -> FpVec3 {
        FpVec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl core::ops::Mul<Fp> for FpVec3 {
    type Output = FpVec3;
    #[inline]
    fn mul(self, rhs: Fp) -> FpVec3 {
        FpVec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Fixed-point quaternion (root-motion rotations).
///
/// Only multiply/add/conjugate are provided; all of them are exact in fixed
/// point. There is deliberately no `normalize`: blended quaternions leave
/// the core approximately unit-length and hosts renormalize view-side, which
/// keeps sqrt out of the deterministic path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpQuat {
    pub x: Fp,
    pub y: Fp,
    pub z: Fp,
    pub w: Fp,
}

impl FpQuat {
    pub const IDENTITY: FpQuat = FpQuat {
        x: Fp::ZERO,
        y: Fp::ZERO,
        z: Fp::ZERO,
        w: Fp::ONE,
    };

    #[inline]
    pub fn new(x: Fp, y: Fp, z: Fp, w: Fp) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    pub fn conjugate(self) -> FpQuat {
        FpQuat::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Hamilton product (rotation composition).
    pub fn product(self, rhs: FpQuat) -> FpQuat {
        FpQuat::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }

    /// Component-wise lerp between two quaternions (unnormalized).
    pub fn lerp(self, rhs: FpQuat, t: Fp) -> FpQuat {
        FpQuat::new(
            lerp(self.x, rhs.x, t),
            lerp(self.y, rhs.y, t),
            lerp(self.z, rhs.z, t),
            lerp(self.w, rhs.w, t),
        )
    }

    /// Weight the rotation toward identity: `lerp(identity, self, weight)`.
    #[inline]
    pub fn weighted(self, weight: Fp) -> FpQuat {
        FpQuat::IDENTITY.lerp(self, weight)
    }
}

impl Default for FpQuat {
    fn default() -> Self {
        FpQuat::IDENTITY
    }
}
