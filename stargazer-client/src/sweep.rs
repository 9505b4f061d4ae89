use stargazer_data::AngleRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Moved,
    /// The last grid position has been visited.
    Complete,
}

/// Raster position over the pan/tilt grid, pan-major.
///
/// Angles are derived from integer indices, so repeated fractional steps do
/// not accumulate rounding error and always stay inside their range.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepCursor {
    pan: AngleRange,
    tilt: AngleRange,
    pan_step: f64,
    tilt_step: f64,
    n_pan: usize,
    n_tilt: usize,
    pan_index: usize,
    tilt_index: usize,
}

impl SweepCursor {
    pub fn new(pan: AngleRange, tilt: AngleRange, pan_step: f64, tilt_step: f64) -> Self {
        SweepCursor {
            pan,
            tilt,
            pan_step,
            tilt_step,
            n_pan: pan.n_steps(pan_step),
            n_tilt: tilt.n_steps(tilt_step),
            pan_index: 0,
            tilt_index: 0,
        }
    }

    pub fn pan_angle(&self) -> f64 {
        self.pan
            .clamp(self.pan.min + (self.pan_index as f64) * self.pan_step)
    }

    pub fn tilt_angle(&self) -> f64 {
        self.tilt
            .clamp(self.tilt.min + (self.tilt_index as f64) * self.tilt_step)
    }

    pub fn pan_range(&self) -> AngleRange {
        self.pan
    }

    pub fn tilt_range(&self) -> AngleRange {
        self.tilt
    }

    /// Number of grid positions in a full sweep.
    pub fn n_positions(&self) -> usize {
        self.n_pan.saturating_mul(self.n_tilt)
    }

    /// Steps tilt, wrapping onto the next pan column past the tilt maximum.
    /// On completion the cursor stays on the last position.
    pub fn advance(&mut self) -> Advance {
        if self.tilt_index + 1 < self.n_tilt {
            self.tilt_index += 1;
            return Advance::Moved;
        }
        if self.pan_index + 1 < self.n_pan {
            self.tilt_index = 0;
            self.pan_index += 1;
            return Advance::Moved;
        }
        Advance::Complete
    }

    pub fn rewind(&mut self) {
        self.pan_index = 0;
        self.tilt_index = 0;
    }
}
