use glam::DVec3;
use serde::{Deserialize, Serialize};

// We use DVec3 (double precision) because JS numbers are f64.
// This minimizes conversion errors between TS and Rust.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct SimVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SimVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_glam(self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    pub fn from_glam(v: DVec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Threshold below which a vector is treated as degenerate.
/// Normalizing anything shorter yields a zero vector (forces) or
/// leaves prior state untouched (orientation) instead of producing NaN.
pub const EPSILON: f64 = 1.0e-6;
