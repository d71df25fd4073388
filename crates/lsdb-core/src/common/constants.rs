//! Physical and numerical constants shared by the line-shape engine.

/// Doppler width coefficient: `sigma = DOPPLER_SIGMA_COEFFICIENT * E0 * sqrt(T / M)`
/// with `T` in eV and the radiator mass `M` in amu. `sigma` carries the units of `E0`.
pub const DOPPLER_SIGMA_COEFFICIENT: f64 = 3.265e-5;

/// Default number of samples on interpolated and morphed output grids.
pub const DEFAULT_POINTS: usize = 2001;

pub const EV_TO_INV_CM: f64 = 8_065.543_94_f64;
pub const AU_TO_EV: f64 = 27.211_386_2_f64;
