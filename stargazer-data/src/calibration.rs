/// Gain of the fitted inverse-power curve of the IR distance sensor.
pub const CALIBRATION_GAIN: f64 = 51267.;
/// Exponent of the fitted inverse-power curve of the IR distance sensor.
pub const CALIBRATION_EXPONENT: f64 = -0.976;

/// Converts a raw sensor reading into a distance in centimetres.
///
/// A reading of exactly zero maps to zero: the fitted curve is singular there
/// and would otherwise produce infinity.
pub fn calibrate(reading: f64) -> f64 {
    if reading == 0. {
        return 0.;
    }
    CALIBRATION_GAIN * reading.powf(CALIBRATION_EXPONENT)
}
