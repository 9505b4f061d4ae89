use stargazer_data::AngleRange;

/// Maps a pointer position in a view to a gimbal pose.
///
/// Horizontal position spans the pan range left to right. Vertical position
/// spans the tilt range inverted, so the top edge is `tilt.max`. Positions
/// outside the view are clamped to the limits. A degenerate view maps to
/// nothing.
pub fn map_pointer(
    x: f64,
    y: f64,
    view_width: f64,
    view_height: f64,
    pan: AngleRange,
    tilt: AngleRange,
) -> Option<(f64, f64)> {
    if !(view_width > 0. && view_height > 0.) || !(x.is_finite() && y.is_finite()) {
        return None;
    }
    let u = (x / view_width).clamp(0., 1.);
    let v = (y / view_height).clamp(0., 1.);
    let pan_angle = pan.clamp(pan.lerp(u));
    let tilt_angle = tilt.clamp(tilt.max - v * tilt.span());
    Some((pan_angle, tilt_angle))
}
