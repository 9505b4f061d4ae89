use crate::calibration::calibrate;
use crate::geometry::to_cartesian;
#[cfg(feature = "serde")]
use serde::Serialize;

/// A position in the scanner frame, in the unit of the calibrated distance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian3 {
    pub const ORIGIN: Cartesian3 = Cartesian3 {
        x: 0.,
        y: 0.,
        z: 0.,
    };

    pub fn norm(&self) -> f64 {
        f64::sqrt(self.x * self.x + self.y * self.y + self.z * self.z)
    }
}

/// One accepted sample of a sweep.
///
/// Fields are private so that `position` can only ever be the projection of
/// `(pan, tilt, distance)`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScanPoint {
    pan: f64,
    tilt: f64,
    distance: f64,
    raw: f64,
    position: Cartesian3,
}

impl ScanPoint {
    /// Builds a point from the gimbal pose (degrees) and the raw sensor reading.
    pub fn from_reading(pan: f64, tilt: f64, raw: f64) -> Self {
        let distance = calibrate(raw);
        ScanPoint {
            pan,
            tilt,
            distance,
            raw,
            position: to_cartesian(pan, tilt, distance),
        }
    }

    /// Pan angle in degrees.
    pub fn pan(&self) -> f64 {
        self.pan
    }

    /// Tilt angle in degrees.
    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    /// Calibrated distance.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Raw sensor reading the distance was calibrated from.
    pub fn raw(&self) -> f64 {
        self.raw
    }

    pub fn position(&self) -> Cartesian3 {
        self.position
    }
}
