use super::try_zeroed;
use crate::domain::ErrorKind;
use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BroadeningError {
    #[error("broadening requires at least 2 samples, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("broadening step must be finite and > 0, got {dx}")]
    InvalidStep { dx: f64 },
    #[error("broadening width {name} must be finite and >= 0, got {value}")]
    InvalidWidth { name: &'static str, value: f64 },
    #[error("failed to allocate broadening buffers for {requested} samples")]
    AllocationFailure { requested: usize },
}

impl BroadeningError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            _ => ErrorKind::DegenerateInput,
        }
    }
}

/// Gaussian (`sigma`) and Lorentzian (`gamma`) widths of a Voigt kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadeningParams {
    pub sigma: f64,
    pub gamma: f64,
}

impl BroadeningParams {
    pub const fn new(sigma: f64, gamma: f64) -> Self {
        Self { sigma, gamma }
    }

    pub fn is_noop(&self) -> bool {
        self.sigma == 0.0 && self.gamma == 0.0
    }

    pub fn validate(&self) -> Result<(), BroadeningError> {
        for (name, value) in [("sigma", self.sigma), ("gamma", self.gamma)] {
            if !value.is_finite() || value < 0.0 {
                return Err(BroadeningError::InvalidWidth { name, value });
            }
        }
        Ok(())
    }

    /// Adds a Gaussian width in quadrature.
    pub fn with_extra_sigma(self, sigma: f64) -> Self {
        Self {
            sigma: self.sigma.hypot(sigma),
            gamma: self.gamma,
        }
    }

    /// Fourier transform of the unit-area Voigt kernel at angular frequency `omega`.
    pub fn kernel_transform(&self, omega: f64) -> f64 {
        (-self.gamma * omega - 0.5 * self.sigma * self.sigma * omega * omega).exp()
    }
}

/// Real transform of a sequence viewed as one half period of an even signal.
///
/// For input `y` of length `n` the output is
/// `Y_k = y_0 + (-1)^k y_{n-1} + 2 sum_{j=1}^{n-2} y_j cos(pi j k / (n - 1))`,
/// the unnormalized type-I discrete cosine transform. Applying it twice
/// scales the input by `2 (n - 1)`.
pub trait EvenSymmetricTransform {
    fn transform(&mut self, input: &[f64]) -> Result<Vec<f64>, BroadeningError>;
}

/// Type-I cosine transform computed as the real part of a complex FFT over
/// the even extension of the input.
pub struct FftEvenTransform {
    planner: FftPlanner<f64>,
}

impl FftEvenTransform {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
}

impl Default for FftEvenTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl EvenSymmetricTransform for FftEvenTransform {
    fn transform(&mut self, input: &[f64]) -> Result<Vec<f64>, BroadeningError> {
        let n = input.len();
        if n < 2 {
            return Err(BroadeningError::InsufficientPoints { actual: n });
        }

        let period = 2 * (n - 1);
        let mut buffer: Vec<Complex64> = Vec::new();
        buffer
            .try_reserve_exact(period)
            .map_err(|_| BroadeningError::AllocationFailure { requested: period })?;
        buffer.extend(input.iter().map(|&value| Complex64::new(value, 0.0)));
        buffer.extend(
            input[1..n - 1]
                .iter()
                .rev()
                .map(|&value| Complex64::new(value, 0.0)),
        );

        let fft = self.planner.plan_fft_forward(period);
        fft.process(&mut buffer);

        let mut output =
            try_zeroed(n).map_err(|_| BroadeningError::AllocationFailure { requested: n })?;
        for (value, coefficient) in output.iter_mut().zip(&buffer) {
            *value = coefficient.re;
        }
        Ok(output)
    }
}

/// Voigt convolution by multiplication in the cosine-transform domain.
///
/// The reflecting boundary of the even extension means intensity near either
/// edge is mirrored back instead of wrapping around to the other side.
pub struct VoigtConvolver<T = FftEvenTransform> {
    transform: T,
}

impl VoigtConvolver<FftEvenTransform> {
    pub fn new() -> Self {
        Self::with_transform(FftEvenTransform::new())
    }
}

impl Default for VoigtConvolver<FftEvenTransform> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EvenSymmetricTransform> VoigtConvolver<T> {
    pub fn with_transform(transform: T) -> Self {
        Self { transform }
    }

    /// Convolves uniformly spaced samples `y` (step `dx`) with the Voigt kernel.
    pub fn convolve(
        &mut self,
        y: &[f64],
        dx: f64,
        params: BroadeningParams,
    ) -> Result<Vec<f64>, BroadeningError> {
        params.validate()?;
        if params.is_noop() {
            let mut unchanged = Vec::new();
            unchanged
                .try_reserve_exact(y.len())
                .map_err(|_| BroadeningError::AllocationFailure { requested: y.len() })?;
            unchanged.extend_from_slice(y);
            return Ok(unchanged);
        }

        let n = y.len();
        if n < 2 {
            return Err(BroadeningError::InsufficientPoints { actual: n });
        }
        if !dx.is_finite() || dx <= 0.0 {
            return Err(BroadeningError::InvalidStep { dx });
        }

        let period = (2 * (n - 1)) as f64;
        let mut spectrum = self.transform.transform(y)?;
        for (index, coefficient) in spectrum.iter_mut().enumerate() {
            let omega = 2.0 * PI * index as f64 / (period * dx);
            *coefficient *= params.kernel_transform(omega) / period;
        }

        debug!(
            samples = n,
            dx,
            sigma = params.sigma,
            gamma = params.gamma,
            "applied Voigt broadening"
        );
        self.transform.transform(&spectrum)
    }
}

/// One-shot Voigt convolution with a fresh FFT planner.
pub fn convolve_voigt(
    y: &[f64],
    dx: f64,
    sigma: f64,
    gamma: f64,
) -> Result<Vec<f64>, BroadeningError> {
    VoigtConvolver::new().convolve(y, dx, BroadeningParams::new(sigma, gamma))
}
