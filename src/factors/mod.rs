//! Factor exposure computation.

mod exposure;

pub use exposure::ExposureCalculator;
