pub mod errors;

pub use errors::{ErrorKind, LsdbError, LsdbErrorCategory, LsdbResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Theoretical model that produced a set of line shapes.
    ModelId
);
record_id!(
    /// Plasma environment (e.g. ion dynamics treatment) of a calculation.
    EnvironmentId
);
record_id!(RadiatorId);
record_id!(LineId);
record_id!(DatasetId);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("curve requires at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("curve length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("curve value must be finite at index {index}, got ({x}, {y})")]
    NonFinite { index: usize, x: f64, y: f64 },
    #[error("curve x must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("curve intensity must be >= 0 at index {index}, got {value}")]
    NegativeIntensity { index: usize, value: f64 },
}

impl CurveError {
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::DegenerateInput
    }
}

/// Sampled non-negative intensity profile with strictly increasing abscissae.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve", into = "RawCurve")]
pub struct Curve {
    x: Vec<f64>,
    y: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawCurve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<RawCurve> for Curve {
    type Error = CurveError;

    fn try_from(raw: RawCurve) -> Result<Self, Self::Error> {
        Curve::new(raw.x, raw.y)
    }
}

impl From<Curve> for RawCurve {
    fn from(curve: Curve) -> Self {
        Self {
            x: curve.x,
            y: curve.y,
        }
    }
}

impl Curve {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, CurveError> {
        if x.len() != y.len() {
            return Err(CurveError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(CurveError::InsufficientPoints { actual: x.len() });
        }

        for (index, (&xi, &yi)) in x.iter().zip(&y).enumerate() {
            if !xi.is_finite() || !yi.is_finite() {
                return Err(CurveError::NonFinite {
                    index,
                    x: xi,
                    y: yi,
                });
            }
            if yi < 0.0 {
                return Err(CurveError::NegativeIntensity { index, value: yi });
            }
            if index > 0 && xi <= x[index - 1] {
                return Err(CurveError::NonIncreasing {
                    index,
                    previous: x[index - 1],
                    current: xi,
                });
            }
        }

        Ok(Self { x, y })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// Trapezoidal area under the samples.
    pub fn area(&self) -> f64 {
        crate::numerics::trapezoid(&self.x, &self.y)
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.x, self.y)
    }
}

/// Datasets computed for one spectral line with one model in one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineGroup {
    pub model: ModelId,
    pub environment: EnvironmentId,
    pub line: LineId,
}

impl LineGroup {
    pub const fn new(model: ModelId, environment: EnvironmentId, line: LineId) -> Self {
        Self {
            model,
            environment,
            line,
        }
    }
}

/// Stored dataset identity together with the plasma conditions it was computed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketCandidate {
    pub id: DatasetId,
    pub density: f64,
    pub temperature: f64,
}

/// A fetched line shape tagged with its density (cm^-3) and temperature (eV).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub density: f64,
    pub temperature: f64,
    pub curve: Curve,
}

impl Dataset {
    pub fn new(density: f64, temperature: f64, curve: Curve) -> Self {
        Self {
            density,
            temperature,
            curve,
        }
    }
}

/// Density and temperature span of the datasets stored for one line group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLimits {
    pub density_min: f64,
    pub density_max: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
}

impl GridLimits {
    pub fn from_candidates(candidates: &[BracketCandidate]) -> Option<Self> {
        let first = candidates.first()?;
        let mut limits = Self {
            density_min: first.density,
            density_max: first.density,
            temperature_min: first.temperature,
            temperature_max: first.temperature,
        };
        for candidate in &candidates[1..] {
            limits.density_min = limits.density_min.min(candidate.density);
            limits.density_max = limits.density_max.max(candidate.density);
            limits.temperature_min = limits.temperature_min.min(candidate.temperature);
            limits.temperature_max = limits.temperature_max.max(candidate.temperature);
        }
        Some(limits)
    }

    pub fn contains(&self, density: f64, temperature: f64) -> bool {
        (self.density_min..=self.density_max).contains(&density)
            && (self.temperature_min..=self.temperature_max).contains(&temperature)
    }
}

/// Rest energy of a line and the mass (amu) of its radiator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineProperties {
    pub energy: f64,
    pub radiator_mass: f64,
}
