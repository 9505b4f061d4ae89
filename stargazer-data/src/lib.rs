pub mod calibration;
pub mod geometry;
pub mod point;
pub mod range;

pub use calibration::calibrate;
pub use geometry::to_cartesian;
pub use point::{Cartesian3, ScanPoint};
pub use range::AngleRange;
