//! Displacement interpolation between two non-negative sampled curves.
//!
//! Both curves are restricted to the intersection of their domains and
//! turned into normalized cumulative distributions `F` and `G`. The quantile
//! map `M(x) = F^-1(G(x))` carries each position to the position where `f`
//! accumulates the same probability that `g` has accumulated at `x`. The
//! intermediate shape at fraction `t` is the pull-back of `f` under the
//! displaced coordinate `T(x) = (1 - t) x + t M(x)`.

use super::{Interpolant, InterpolantError, try_linear_grid, try_zeroed};
use crate::domain::{Curve, ErrorKind};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MorphError {
    #[error("morph domains do not overlap: [{min}, {max}] is empty")]
    EmptyDomain { min: f64, max: f64 },
    #[error("morph grid requires at least 2 points, got {actual}")]
    InsufficientGrid { actual: usize },
    #[error("{curve} curve carries no intensity over the common domain (integral {norm})")]
    ZeroMass { curve: &'static str, norm: f64 },
    #[error("curve has zero weighted spread about {center} and cannot be regularized")]
    ZeroSpread { center: f64 },
    #[error("morph fraction must lie in [0, 1], got {value}")]
    InvalidFraction { value: f64 },
    #[error("failed to allocate morph buffers for {requested} grid points")]
    AllocationFailure { requested: usize },
    #[error(transparent)]
    Interpolant(#[from] InterpolantError),
}

impl MorphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyDomain { .. } => ErrorKind::EmptyDomain,
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            Self::Interpolant(error) => error.kind(),
            _ => ErrorKind::DegenerateInput,
        }
    }
}

/// Prepared quantile map between two curves; build once, evaluate many times.
#[derive(Debug, Clone)]
pub struct Morph {
    f: Interpolant,
    quantile_map: Interpolant,
    xmin: f64,
    xmax: f64,
    norm_f: f64,
    norm_g: f64,
}

impl Morph {
    /// Builds the morph from `f` towards `g` on a uniform grid of `np` points.
    pub fn build(f: &Curve, g: &Curve, np: usize) -> Result<Self, MorphError> {
        Self::build_from_samples(f.x(), f.y(), g.x(), g.y(), np)
    }

    pub fn build_from_samples(
        xf: &[f64],
        yf: &[f64],
        xg: &[f64],
        yg: &[f64],
        np: usize,
    ) -> Result<Self, MorphError> {
        if np < 2 {
            return Err(MorphError::InsufficientGrid { actual: np });
        }

        let f = Interpolant::fit(xf, yf)?;
        let g = Interpolant::fit(xg, yg)?;

        let (f_min, f_max) = f.domain();
        let (g_min, g_max) = g.domain();
        let xmin = f_min.max(g_min);
        let xmax = f_max.min(g_max);
        if !(xmax > xmin) {
            return Err(MorphError::EmptyDomain {
                min: xmin,
                max: xmax,
            });
        }

        let allocation_failure = |_| MorphError::AllocationFailure { requested: np };
        let grid = try_linear_grid(xmin, xmax, np).map_err(allocation_failure)?;
        let mut cdf_f = try_zeroed(np).map_err(allocation_failure)?;
        let mut cdf_g = try_zeroed(np).map_err(allocation_failure)?;

        for (index, &x) in grid.iter().enumerate() {
            cdf_f[index] = f.eval_integral(xmin, x)?;
            cdf_g[index] = g.eval_integral(xmin, x)?;
        }

        let norm_f = cdf_f[np - 1];
        let norm_g = cdf_g[np - 1];
        if !(norm_f > 0.0) {
            return Err(MorphError::ZeroMass {
                curve: "initial",
                norm: norm_f,
            });
        }
        if !(norm_g > 0.0) {
            return Err(MorphError::ZeroMass {
                curve: "final",
                norm: norm_g,
            });
        }

        for value in &mut cdf_f {
            *value /= norm_f;
        }
        for value in &mut cdf_g {
            *value = (*value / norm_g).clamp(0.0, 1.0);
        }

        let (probabilities, positions) =
            strictly_increasing_cdf(&cdf_f, &grid).map_err(allocation_failure)?;
        let inverse_f = Interpolant::fit(&probabilities, &positions)?;

        let mut mapped = try_zeroed(np).map_err(allocation_failure)?;
        for (target, &probability) in mapped.iter_mut().zip(&cdf_g) {
            *target = inverse_f.eval_clamped(probability);
        }
        let quantile_map = Interpolant::fit(&grid, &mapped)?;

        debug!(
            xmin,
            xmax, norm_f, norm_g, np, "prepared quantile map between curves"
        );

        Ok(Self {
            f,
            quantile_map,
            xmin,
            xmax,
            norm_f,
            norm_g,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xmin, self.xmax)
    }

    /// Integrals of the initial and final curves over the common domain.
    pub fn norms(&self) -> (f64, f64) {
        (self.norm_f, self.norm_g)
    }

    /// Intermediate intensity at fraction `t` and position `x`.
    ///
    /// Positions outside the common domain carry zero intensity. With
    /// `normalize` the result integrates to one for every `t`; otherwise its
    /// integral moves linearly from `norm_f` to `norm_g`.
    pub fn eval(&self, t: f64, x: f64, normalize: bool) -> f64 {
        if !(x >= self.xmin && x <= self.xmax) {
            return 0.0;
        }

        let mapped = self.quantile_map.eval_clamped(x);
        let mapped_slope = self.quantile_map.derivative_clamped(x);

        let displaced = (1.0 - t) * x + t * mapped;
        let jacobian = (1.0 - t) + t * mapped_slope;
        let nfactor = if normalize {
            1.0 / self.norm_f
        } else {
            (1.0 - t) + t * (self.norm_g / self.norm_f)
        };

        // `displaced` is a convex combination of two in-domain points; clamping
        // only absorbs rounding.
        let displaced = displaced.clamp(self.xmin, self.xmax);
        nfactor * jacobian.abs() * self.f.eval_clamped(displaced)
    }

    /// Samples the intermediate curve at fraction `t` on `npoints` evenly
    /// spaced points spanning the common domain.
    pub fn sample(&self, t: f64, npoints: usize, normalize: bool) -> Result<Curve, MorphError> {
        if !(0.0..=1.0).contains(&t) {
            return Err(MorphError::InvalidFraction { value: t });
        }
        if npoints < 2 {
            return Err(MorphError::InsufficientGrid { actual: npoints });
        }

        let allocation_failure = |_| MorphError::AllocationFailure { requested: npoints };
        let x = try_linear_grid(self.xmin, self.xmax, npoints).map_err(allocation_failure)?;
        let mut y = try_zeroed(npoints).map_err(allocation_failure)?;
        for (value, &position) in y.iter_mut().zip(&x) {
            *value = self.eval(t, position, normalize);
        }

        Curve::new(x, y).map_err(|_| MorphError::InsufficientGrid { actual: npoints })
    }

    /// Samples `frames` intermediate curves at evenly spaced fractions from 0
    /// to 1 inclusive. A single frame is the initial curve.
    pub fn sample_series(
        &self,
        frames: usize,
        npoints: usize,
        normalize: bool,
    ) -> Result<Vec<(f64, Curve)>, MorphError> {
        let mut series = Vec::new();
        series
            .try_reserve_exact(frames)
            .map_err(|_| MorphError::AllocationFailure { requested: frames })?;

        for frame in 0..frames {
            let t = if frames > 1 {
                frame as f64 / (frames - 1) as f64
            } else {
                0.0
            };
            series.push((t, self.sample(t, npoints, normalize)?));
        }

        Ok(series)
    }
}

/// Extracts `(F_i, x_i)` pairs with strictly increasing `F` for inversion.
///
/// A leading run at zero keeps its last position so that no probability is
/// assigned to the empty wing; every other flat run keeps its first position.
fn strictly_increasing_cdf(
    cdf: &[f64],
    grid: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), std::collections::TryReserveError> {
    let mut probabilities = Vec::new();
    let mut positions = Vec::new();
    probabilities.try_reserve_exact(cdf.len())?;
    positions.try_reserve_exact(cdf.len())?;

    probabilities.push(cdf[0]);
    positions.push(grid[0]);

    for (&probability, &position) in cdf.iter().zip(grid).skip(1) {
        let last = probabilities[probabilities.len() - 1];
        if probability > last {
            probabilities.push(probability);
            positions.push(position);
        } else if probabilities.len() == 1 && probability <= 0.0 {
            positions[0] = position;
        }
    }

    Ok((probabilities, positions))
}
