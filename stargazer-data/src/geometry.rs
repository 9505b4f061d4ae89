use crate::point::Cartesian3;

pub(crate) fn degree_to_radian(degree: f64) -> f64 {
    degree * std::f64::consts::PI / 180.
}

/// Projects a gimbal pose and a measured distance into Cartesian space.
///
/// # Arguments
///
/// * `pan` - Pan angle in degrees.
/// * `tilt` - Tilt angle in degrees.
/// * `distance` - Calibrated distance along the sensor axis.
///
/// The pan angle is the polar angle and the tilt angle the azimuth:
/// `x = d cos(tilt) sin(pan)`, `y = d sin(tilt) sin(pan)`, `z = d cos(pan)`.
pub fn to_cartesian(pan: f64, tilt: f64, distance: f64) -> Cartesian3 {
    if distance == 0. {
        return Cartesian3::ORIGIN;
    }
    let pan = degree_to_radian(pan);
    let tilt = degree_to_radian(tilt);
    Cartesian3 {
        x: distance * f64::cos(tilt) * f64::sin(pan),
        y: distance * f64::sin(tilt) * f64::sin(pan),
        z: distance * f64::cos(pan),
    }
}
