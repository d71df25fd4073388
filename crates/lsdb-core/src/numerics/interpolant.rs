//! Shape-preserving piecewise cubic interpolation.
//!
//! Slopes follow Steffen's method (A&A 239, 443, 1990): each node slope is
//! limited so that the cubic never leaves the range spanned by its two
//! neighbouring samples. A curve built from non-negative samples therefore
//! stays non-negative and its running integral is monotone, which the morph
//! engine relies on when inverting cumulative distributions.

use super::try_zeroed;
use crate::domain::{Curve, ErrorKind};
use std::cell::Cell;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolantError {
    #[error("interpolant requires at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("interpolant input length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("interpolant sample must be finite at index {index}, got ({x}, {y})")]
    NonFinite { index: usize, x: f64, y: f64 },
    #[error(
        "interpolant abscissae must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("interpolation query {value} is outside [{min}, {max}]")]
    OutOfDomain { value: f64, min: f64, max: f64 },
    #[error("failed to allocate interpolant storage for {requested} points")]
    AllocationFailure { requested: usize },
}

impl InterpolantError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfDomain { .. } => ErrorKind::OutOfDomain,
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            _ => ErrorKind::DegenerateInput,
        }
    }
}

/// Steffen monotone cubic through a set of samples.
///
/// The last looked-up interval is cached in a [`Cell`], so an `Interpolant`
/// may be shared by reference within one thread but is not `Sync`. Clone it
/// to evaluate from several threads.
#[derive(Debug, Clone)]
pub struct Interpolant {
    x: Vec<f64>,
    y: Vec<f64>,
    // Per interval: cubic, quadratic and linear coefficients in (x - x_i).
    coefficients: Vec<[f64; 3]>,
    // Integral from x[0] to x[i].
    cumulative: Vec<f64>,
    cache: Cell<usize>,
}

impl Interpolant {
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self, InterpolantError> {
        validate_samples(x, y)?;

        let point_count = x.len();
        let slopes = steffen_slopes(x, y)?;

        let mut coefficients = Vec::new();
        coefficients
            .try_reserve_exact(point_count - 1)
            .map_err(|_| InterpolantError::AllocationFailure {
                requested: point_count,
            })?;
        let mut cumulative = try_zeroed(point_count).map_err(|_| {
            InterpolantError::AllocationFailure {
                requested: point_count,
            }
        })?;

        for index in 0..point_count - 1 {
            let h = x[index + 1] - x[index];
            let secant = (y[index + 1] - y[index]) / h;
            let a = (slopes[index] + slopes[index + 1] - 2.0 * secant) / (h * h);
            let b = (3.0 * secant - 2.0 * slopes[index] - slopes[index + 1]) / h;
            let c = slopes[index];
            coefficients.push([a, b, c]);

            cumulative[index + 1] =
                cumulative[index] + segment_integral([a, b, c], y[index], h);
        }

        let mut x_owned = try_zeroed(point_count).map_err(|_| {
            InterpolantError::AllocationFailure {
                requested: point_count,
            }
        })?;
        x_owned.copy_from_slice(x);
        let mut y_owned = try_zeroed(point_count).map_err(|_| {
            InterpolantError::AllocationFailure {
                requested: point_count,
            }
        })?;
        y_owned.copy_from_slice(y);

        Ok(Self {
            x: x_owned,
            y: y_owned,
            coefficients,
            cumulative,
            cache: Cell::new(0),
        })
    }

    pub fn from_curve(curve: &Curve) -> Result<Self, InterpolantError> {
        Self::fit(curve.x(), curve.y())
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn eval(&self, x: f64) -> Result<f64, InterpolantError> {
        self.check_domain(x)?;
        Ok(self.value_at(x))
    }

    pub fn eval_derivative(&self, x: f64) -> Result<f64, InterpolantError> {
        self.check_domain(x)?;
        Ok(self.derivative_at(x))
    }

    /// Definite integral of the fitted cubic over `[a, b]`.
    pub fn eval_integral(&self, a: f64, b: f64) -> Result<f64, InterpolantError> {
        self.check_domain(a)?;
        self.check_domain(b)?;
        Ok(self.integral_to(b) - self.integral_to(a))
    }

    /// Evaluates at `x` clamped into the domain.
    pub fn eval_clamped(&self, x: f64) -> f64 {
        let (min, max) = self.domain();
        self.value_at(x.clamp(min, max))
    }

    pub(crate) fn derivative_clamped(&self, x: f64) -> f64 {
        let (min, max) = self.domain();
        self.derivative_at(x.clamp(min, max))
    }

    fn check_domain(&self, value: f64) -> Result<(), InterpolantError> {
        let (min, max) = self.domain();
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(InterpolantError::OutOfDomain { value, min, max })
        }
    }

    fn locate(&self, x: f64) -> usize {
        let last_interval = self.x.len() - 2;
        let cached = self.cache.get();
        if cached <= last_interval && self.x[cached] <= x && x <= self.x[cached + 1] {
            return cached;
        }

        let index = self
            .x
            .partition_point(|node| *node <= x)
            .saturating_sub(1)
            .min(last_interval);
        self.cache.set(index);
        index
    }

    fn value_at(&self, x: f64) -> f64 {
        let index = self.locate(x);
        let [a, b, c] = self.coefficients[index];
        let t = x - self.x[index];
        ((a * t + b) * t + c) * t + self.y[index]
    }

    fn derivative_at(&self, x: f64) -> f64 {
        let index = self.locate(x);
        let [a, b, c] = self.coefficients[index];
        let t = x - self.x[index];
        (3.0 * a * t + 2.0 * b) * t + c
    }

    fn integral_to(&self, x: f64) -> f64 {
        let index = self.locate(x);
        let t = x - self.x[index];
        self.cumulative[index] + segment_integral(self.coefficients[index], self.y[index], t)
    }
}

fn segment_integral([a, b, c]: [f64; 3], d: f64, t: f64) -> f64 {
    (((a * t / 4.0 + b / 3.0) * t + c / 2.0) * t + d) * t
}

fn validate_samples(x: &[f64], y: &[f64]) -> Result<(), InterpolantError> {
    if x.len() != y.len() {
        return Err(InterpolantError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(InterpolantError::InsufficientPoints { actual: x.len() });
    }

    for (index, (&xi, &yi)) in x.iter().zip(y).enumerate() {
        if !xi.is_finite() || !yi.is_finite() {
            return Err(InterpolantError::NonFinite {
                index,
                x: xi,
                y: yi,
            });
        }
        if index > 0 && xi <= x[index - 1] {
            return Err(InterpolantError::NonIncreasing {
                index,
                previous: x[index - 1],
                current: xi,
            });
        }
    }

    Ok(())
}

fn steffen_slopes(x: &[f64], y: &[f64]) -> Result<Vec<f64>, InterpolantError> {
    let point_count = x.len();
    let mut slopes = try_zeroed(point_count).map_err(|_| InterpolantError::AllocationFailure {
        requested: point_count,
    })?;

    let first_secant = (y[1] - y[0]) / (x[1] - x[0]);
    if point_count == 2 {
        slopes[0] = first_secant;
        slopes[1] = first_secant;
        return Ok(slopes);
    }

    // Boundary slopes use the adjacent secant, the simplest admissible choice.
    slopes[0] = first_secant;
    slopes[point_count - 1] = (y[point_count - 1] - y[point_count - 2])
        / (x[point_count - 1] - x[point_count - 2]);

    for index in 1..point_count - 1 {
        let h_prev = x[index] - x[index - 1];
        let h_next = x[index + 1] - x[index];
        let s_prev = (y[index] - y[index - 1]) / h_prev;
        let s_next = (y[index + 1] - y[index]) / h_next;
        let parabolic = (s_prev * h_next + s_next * h_prev) / (h_prev + h_next);

        slopes[index] = (s_prev.signum() + s_next.signum())
            * s_prev.abs().min(s_next.abs()).min(0.5 * parabolic.abs());
    }

    Ok(slopes)
}

#[cfg(test)]
mod tests {
    use super::{Interpolant, InterpolantError};
    use crate::domain::ErrorKind;
    use crate::numerics::{linear_grid, trapezoid};

    #[test]
    fn nodes_are_reproduced_exactly() {
        let x = [0.0, 0.5, 1.5, 2.0, 4.0];
        let y = [1.0, 3.0, 2.0, 2.5, 0.0];
        let interpolant = Interpolant::fit(&x, &y).expect("fit");

        for (&xi, &yi) in x.iter().zip(&y) {
            let value = interpolant.eval(xi).expect("node eval");
            assert!((value - yi).abs() < 1.0e-12, "x={xi}: {value} != {yi}");
        }
    }

    #[test]
    fn linear_samples_are_reproduced_with_consistent_derivative_and_integral() {
        let x = [0.0, 1.0, 3.0, 4.0];
        let y = [1.0, 3.0, 7.0, 9.0];
        let interpolant = Interpolant::fit(&x, &y).expect("fit");

        assert!((interpolant.eval(2.0).expect("eval") - 5.0).abs() < 1.0e-12);
        assert!((interpolant.eval_derivative(3.5).expect("derivative") - 2.0).abs() < 1.0e-12);
        // integral of 1 + 2x over [0.5, 3.5] = 3 + (3.5^2 - 0.5^2)
        let integral = interpolant.eval_integral(0.5, 3.5).expect("integral");
        assert!((integral - 15.0).abs() < 1.0e-12);
    }

    #[test]
    fn two_points_degenerate_to_a_line() {
        let interpolant = Interpolant::fit(&[1.0, 3.0], &[2.0, 6.0]).expect("fit");
        assert!((interpolant.eval(2.0).expect("eval") - 4.0).abs() < 1.0e-12);
        assert!((interpolant.eval_integral(1.0, 3.0).expect("integral") - 8.0).abs() < 1.0e-12);
    }

    #[test]
    fn step_data_does_not_overshoot() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 0.0, 1.0, 1.0, 1.0];
        let interpolant = Interpolant::fit(&x, &y).expect("fit");

        let grid = linear_grid(0.0, 4.0, 401).expect("grid");
        let mut previous = f64::NEG_INFINITY;
        for xi in grid {
            let value = interpolant.eval(xi).expect("eval");
            assert!((0.0..=1.0).contains(&value), "overshoot at {xi}: {value}");
            assert!(value >= previous - 1.0e-15, "non-monotone at {xi}");
            previous = value;
        }
    }

    #[test]
    fn non_negative_peak_stays_non_negative() {
        let x = [0.0, 0.2, 0.4, 1.0, 3.0];
        let y = [0.0, 0.0, 5.0, 0.1, 0.0];
        let interpolant = Interpolant::fit(&x, &y).expect("fit");

        for xi in linear_grid(0.0, 3.0, 601).expect("grid") {
            assert!(interpolant.eval(xi).expect("eval") >= 0.0);
        }
    }

    #[test]
    fn integral_matches_quadrature_of_evaluated_curve() {
        let x = [0.0, 0.7, 1.1, 2.5, 3.0];
        let y = [0.2, 1.4, 0.9, 2.2, 0.0];
        let interpolant = Interpolant::fit(&x, &y).expect("fit");

        let grid = linear_grid(0.3, 2.8, 20_001).expect("grid");
        let values: Vec<f64> = grid
            .iter()
            .map(|xi| interpolant.eval(*xi).expect("eval"))
            .collect();
        let quadrature = trapezoid(&grid, &values);
        let integral = interpolant.eval_integral(0.3, 2.8).expect("integral");

        assert!((quadrature - integral).abs() < 1.0e-6);
    }

    #[test]
    fn queries_outside_the_domain_are_rejected() {
        let interpolant = Interpolant::fit(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).expect("fit");
        let error = interpolant.eval(2.0 + 1.0e-9).expect_err("outside");
        assert_eq!(error.kind(), ErrorKind::OutOfDomain);
        assert_eq!(interpolant.eval_clamped(2.5), 0.0);
        assert!(interpolant.eval_integral(-1.0, 1.0).is_err());
    }

    #[test]
    fn degenerate_samples_are_rejected() {
        assert_eq!(
            Interpolant::fit(&[0.0], &[1.0]).expect_err("too short"),
            InterpolantError::InsufficientPoints { actual: 1 }
        );
        let error = Interpolant::fit(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]).expect_err("order");
        assert!(matches!(error, InterpolantError::NonIncreasing { index: 2, .. }));
        assert_eq!(error.kind(), ErrorKind::DegenerateInput);
    }
}
