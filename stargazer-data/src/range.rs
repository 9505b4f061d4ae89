#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive software limit of one servo axis, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        AngleRange { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, angle: f64) -> bool {
        self.min <= angle && angle <= self.max
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        angle.clamp(self.min, self.max)
    }

    /// Linear interpolation from `min` (`t = 0`) to `max` (`t = 1`).
    pub fn lerp(&self, t: f64) -> f64 {
        self.min + t * self.span()
    }

    /// Number of grid positions visited when stepping from `min` by `step`
    /// without exceeding `max`.
    pub fn n_steps(&self, step: f64) -> usize {
        (f64::floor(self.span() / step + 1e-9) as usize).saturating_add(1)
    }
}
