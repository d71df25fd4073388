//! Centering and rescaling of curves before morphing.
//!
//! Two profiles that differ mostly by position and width morph more cleanly
//! once each is expressed in its own natural coordinate. The weights are the
//! squared intensities, which keeps the estimate dominated by the line core
//! rather than by long flat wings.

use super::{MorphError, stable_sum};
use crate::domain::{Curve, CurveError};

/// Affine coordinate change `x' = (x - shift) / scale`, `y' = y * scale`.
///
/// The transform preserves the area under the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regularization {
    pub shift: f64,
    pub scale: f64,
}

impl Default for Regularization {
    fn default() -> Self {
        Self::identity()
    }
}

impl Regularization {
    pub const fn identity() -> Self {
        Self {
            shift: 0.0,
            scale: 1.0,
        }
    }

    /// Linear blend used for the intermediate frame at fraction `t`.
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        Self {
            shift: (1.0 - t) * self.shift + t * other.shift,
            scale: (1.0 - t) * self.scale + t * other.scale,
        }
    }

    pub fn apply(&self, curve: &Curve) -> Result<Curve, CurveError> {
        let x = curve.x().iter().map(|x| (x - self.shift) / self.scale).collect();
        let y = curve.y().iter().map(|y| y * self.scale).collect();
        Curve::new(x, y)
    }

    /// Maps a curve in regularized coordinates back to physical ones.
    pub fn restore(&self, curve: &Curve) -> Result<Curve, CurveError> {
        let x = curve.x().iter().map(|x| x * self.scale + self.shift).collect();
        let y = curve.y().iter().map(|y| y / self.scale).collect();
        Curve::new(x, y)
    }
}

/// Computes the squared-intensity weighted center and spread of `curve` and
/// returns the curve expressed in those units.
pub fn regularize(curve: &Curve) -> Result<(Curve, Regularization), MorphError> {
    let weights: Vec<f64> = curve.y().iter().map(|y| y * y).collect();
    let total = stable_sum(&weights);
    if !(total > 0.0) {
        return Err(MorphError::ZeroMass {
            curve: "regularized",
            norm: total,
        });
    }

    let moments: Vec<f64> = curve.x().iter().zip(&weights).map(|(x, w)| x * w).collect();
    let shift = stable_sum(&moments) / total;

    let spread: Vec<f64> = curve
        .x()
        .iter()
        .zip(&weights)
        .map(|(x, w)| (x - shift).powi(2) * w)
        .collect();
    let scale = (stable_sum(&spread) / total).sqrt();
    if !(scale > 0.0) || !scale.is_finite() {
        return Err(MorphError::ZeroSpread { center: shift });
    }

    let transform = Regularization { shift, scale };
    let regularized = transform
        .apply(curve)
        .map_err(|_| MorphError::ZeroSpread { center: shift })?;
    Ok((regularized, transform))
}
