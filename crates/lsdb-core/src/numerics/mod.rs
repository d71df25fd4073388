pub mod broadening;
pub mod interpolant;
pub mod morph;
pub mod regularize;

pub use broadening::{
    BroadeningError, BroadeningParams, EvenSymmetricTransform, FftEvenTransform, VoigtConvolver,
    convolve_voigt,
};
pub use interpolant::{Interpolant, InterpolantError};
pub use morph::{Morph, MorphError};
pub use regularize::{Regularization, regularize};

use std::collections::TryReserveError;

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

/// Trapezoidal integral of `y(x)`; mismatched or short inputs integrate to zero.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    if x.len() < 2 || x.len() != y.len() {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut correction = 0.0;
    for index in 1..x.len() {
        kahan_add(
            &mut sum,
            &mut correction,
            0.5 * (x[index] - x[index - 1]) * (y[index] + y[index - 1]),
        );
    }

    sum
}

/// Evenly spaced inclusive grid. The last node is pinned to `end` so that
/// accumulated rounding never steps past the domain maximum.
pub fn linear_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    if count < 2 {
        return None;
    }

    let step = (end - start) / ((count - 1) as f64);
    let mut grid = Vec::with_capacity(count);
    for index in 0..count {
        grid.push(start + step * (index as f64));
    }

    if let Some(last) = grid.last_mut() {
        *last = end;
    }

    Some(grid)
}

/// Like [`linear_grid`], but reports allocation failure instead of aborting.
pub(crate) fn try_linear_grid(
    start: f64,
    end: f64,
    count: usize,
) -> Result<Vec<f64>, TryReserveError> {
    let mut grid = try_zeroed(count)?;
    let step = (end - start) / ((count.max(2) - 1) as f64);
    for (index, node) in grid.iter_mut().enumerate() {
        *node = start + step * (index as f64);
    }
    if let Some(last) = grid.last_mut() {
        *last = end;
    }
    Ok(grid)
}

pub(crate) fn try_zeroed(len: usize) -> Result<Vec<f64>, TryReserveError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

/// Indices ordered by value, ties broken by position.
pub fn deterministic_argsort(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_unstable_by(|lhs, rhs| {
        values[*lhs]
            .total_cmp(&values[*rhs])
            .then_with(|| lhs.cmp(rhs))
    });
    indices
}

pub fn relative_difference(lhs: f64, rhs: f64, relative_floor: f64) -> f64 {
    let scale = lhs.abs().max(rhs.abs()).max(relative_floor);
    (lhs - rhs).abs() / scale
}

pub fn within_tolerance(
    lhs: f64,
    rhs: f64,
    abs_tol: f64,
    rel_tol: f64,
    relative_floor: f64,
) -> bool {
    let abs_diff = (lhs - rhs).abs();
    abs_diff <= abs_tol || relative_difference(lhs, rhs, relative_floor) <= rel_tol
}

#[cfg(test)]
mod tests {
    use super::{
        deterministic_argsort, linear_grid, relative_difference, stable_sum, trapezoid,
        try_linear_grid, within_tolerance,
    };

    #[test]
    fn stable_sum_reduces_order_loss_for_large_and_small_values() {
        let input = [1.0e16, 1.0, -1.0e16];
        assert_eq!(stable_sum(&input), 0.0);
    }

    #[test]
    fn trapezoid_integrates_piecewise_linear_samples_exactly() {
        let x = [0.0, 1.0, 3.0];
        let y = [0.0, 2.0, 2.0];
        assert!((trapezoid(&x, &y) - 5.0).abs() < 1.0e-15);
        assert_eq!(trapezoid(&x, &y[..2]), 0.0);
    }

    #[test]
    fn deterministic_argsort_orders_by_value_then_index() {
        let values = [2.0, 1.0, f64::NAN, 1.0, -0.0, 0.0];
        let order = deterministic_argsort(&values);
        assert_eq!(order, vec![4, 5, 1, 3, 0, 2]);
    }

    #[test]
    fn linear_grid_is_inclusive_and_rejects_invalid_counts() {
        assert_eq!(linear_grid(0.0, 1.0, 1), None);
        let grid = linear_grid(0.0, 2.0, 5).expect("grid");
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn fallible_grid_pins_the_last_node() {
        let grid = try_linear_grid(0.1, 0.7, 7).expect("grid");
        assert_eq!(grid.len(), 7);
        assert_eq!(grid[0], 0.1);
        assert_eq!(grid[6], 0.7);
    }

    #[test]
    fn relative_difference_uses_relative_floor() {
        let diff = relative_difference(0.0, 1.0e-10, 1.0e-6);
        assert!((diff - 1.0e-4).abs() < 1.0e-12);
    }

    #[test]
    fn within_tolerance_accepts_abs_or_relative_match() {
        assert!(within_tolerance(10.0, 10.001, 1.0e-2, 1.0e-6, 1.0e-12));
        assert!(within_tolerance(1000.0, 1000.2, 1.0e-6, 5.0e-4, 1.0e-12));
        assert!(!within_tolerance(1.0, 1.1, 1.0e-3, 1.0e-3, 1.0e-12));
    }
}
