//! Line shapes at arbitrary plasma conditions from a grid of stored ones.
//!
//! Four stored datasets bracketing the query `(n, T)` are combined with three
//! pairwise morphs: along density at the low-temperature edge, along density
//! at the high-temperature edge, and finally along temperature between the
//! two intermediate shapes.

use crate::common::constants::DOPPLER_SIGMA_COEFFICIENT;
use crate::config::InterpolationSettings;
use crate::domain::{
    BracketCandidate, Curve, Dataset, DatasetId, ErrorKind, GridLimits, LineGroup, LineId,
    LineProperties,
};
use crate::numerics::{
    BroadeningError, Morph, MorphError, VoigtConvolver, deterministic_argsort,
};
use crate::store::{LineShapeStore, StoreError};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("query density {density} and temperature {temperature} must be finite and > 0")]
    InvalidQuery { density: f64, temperature: f64 },
    #[error(
        "no {missing} dataset brackets density {density:e} and temperature {temperature}"
    )]
    NoBracket {
        density: f64,
        temperature: f64,
        missing: &'static str,
    },
    #[error("corner dataset {id} could not be fetched: {message}")]
    MissingDataset { id: DatasetId, message: String },
    #[error("output grid requires at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("radiator mass must be > 0 for a Doppler width, got {mass}")]
    InvalidMass { mass: f64 },
    #[error("temperature must be finite and >= 0 for a Doppler width, got {temperature}")]
    InvalidTemperature { temperature: f64 },
    #[error(transparent)]
    Morph(#[from] MorphError),
    #[error(transparent)]
    Broadening(#[from] BroadeningError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuery { .. } | Self::NoBracket { .. } => ErrorKind::NoBracket,
            Self::MissingDataset { .. } => ErrorKind::MissingDataset,
            Self::InsufficientPoints { .. }
            | Self::InvalidMass { .. }
            | Self::InvalidTemperature { .. } => ErrorKind::DegenerateInput,
            Self::Morph(error) => error.kind(),
            Self::Broadening(error) => error.kind(),
            Self::Store(error) => error.kind(),
        }
    }
}

/// Position of a corner relative to the query: left/right is lower/higher
/// density, bottom/top is lower/higher temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    BottomLeft,
    BottomRight,
    TopRight,
    TopLeft,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [
        Self::BottomLeft,
        Self::BottomRight,
        Self::TopRight,
        Self::TopLeft,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        }
    }

    // Boundaries are inclusive on both sides, so a candidate lying on an axis
    // through the query can fill two quadrants (four if it is the query).
    fn accepts(self, dn: f64, dt: f64) -> bool {
        match self {
            Self::BottomLeft => dn <= 0.0 && dt <= 0.0,
            Self::BottomRight => dn >= 0.0 && dt <= 0.0,
            Self::TopRight => dn >= 0.0 && dt >= 0.0,
            Self::TopLeft => dn <= 0.0 && dt >= 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerSet {
    pub bottom_left: DatasetId,
    pub bottom_right: DatasetId,
    pub top_right: DatasetId,
    pub top_left: DatasetId,
}

impl CornerSet {
    /// Ids in bottom-left, bottom-right, top-right, top-left order.
    pub const fn ids(&self) -> [DatasetId; 4] {
        [
            self.bottom_left,
            self.bottom_right,
            self.top_right,
            self.top_left,
        ]
    }
}

fn check_query(density: f64, temperature: f64) -> Result<(), GridError> {
    if density.is_finite() && density > 0.0 && temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidQuery {
            density,
            temperature,
        })
    }
}

/// Picks, for each quadrant around `(density, temperature)`, the candidate
/// closest in relative distance.
pub fn select_corners(
    candidates: &[BracketCandidate],
    density: f64,
    temperature: f64,
) -> Result<CornerSet, GridError> {
    check_query(density, temperature)?;

    let offsets: Vec<(f64, f64)> = candidates
        .iter()
        .map(|candidate| {
            (
                (candidate.density - density) / density,
                (candidate.temperature - temperature) / temperature,
            )
        })
        .collect();
    let distances: Vec<f64> = offsets.iter().map(|(dn, dt)| dn * dn + dt * dt).collect();

    let mut slots: [Option<DatasetId>; 4] = [None; 4];
    for index in deterministic_argsort(&distances) {
        let (dn, dt) = offsets[index];
        for (slot, quadrant) in slots.iter_mut().zip(Quadrant::ALL) {
            if slot.is_none() && quadrant.accepts(dn, dt) {
                *slot = Some(candidates[index].id);
            }
        }
        if slots.iter().all(Option::is_some) {
            break;
        }
    }

    match slots {
        [Some(bottom_left), Some(bottom_right), Some(top_right), Some(top_left)] => {
            let corners = CornerSet {
                bottom_left,
                bottom_right,
                top_right,
                top_left,
            };
            debug!(
                density,
                temperature,
                corners = ?corners.ids(),
                "selected bracketing datasets"
            );
            Ok(corners)
        }
        _ => {
            let missing = slots
                .iter()
                .zip(Quadrant::ALL)
                .find(|(slot, _)| slot.is_none())
                .map_or(Quadrant::BottomLeft, |(_, quadrant)| quadrant)
                .name();
            warn!(
                density,
                temperature,
                missing,
                candidates = candidates.len(),
                "query lies outside the stored grid"
            );
            Err(GridError::NoBracket {
                density,
                temperature,
                missing,
            })
        }
    }
}

/// Morph fraction placing `target` between `v1` and `v2`:
/// `sqrt(ln(target / v1) / ln(v2 / v1))`, exactly 0 when `v1 == v2`.
///
/// The ratio is clamped to [0, 1], which only matters for rounding when
/// `target` sits on one of the end points.
pub fn morph_parameter(target: f64, v1: f64, v2: f64) -> f64 {
    if v1 == v2 {
        return 0.0;
    }
    let ratio = (target / v1).ln() / (v2 / v1).ln();
    ratio.clamp(0.0, 1.0).sqrt()
}

/// Fractions and intermediate temperatures of the three morph stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphStages {
    pub low_fraction: f64,
    pub low_temperature: f64,
    pub high_fraction: f64,
    pub high_temperature: f64,
    pub temperature_fraction: f64,
}

/// Result of the grid interpolation, kept as the final morph so it can be
/// evaluated at any position without repeating the setup.
#[derive(Debug, Clone)]
pub struct PreparedInterpolation {
    morph: Morph,
    density: f64,
    temperature: f64,
    stages: MorphStages,
}

impl PreparedInterpolation {
    pub fn eval_at(&self, x: f64, normalize: bool) -> f64 {
        self.morph
            .eval(self.stages.temperature_fraction, x, normalize)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.morph.domain()
    }

    /// Query density and temperature.
    pub fn target(&self) -> (f64, f64) {
        (self.density, self.temperature)
    }

    pub fn stages(&self) -> MorphStages {
        self.stages
    }

    pub fn sample(&self, npoints: usize, normalize: bool) -> Result<Curve, GridError> {
        Ok(self
            .morph
            .sample(self.stages.temperature_fraction, npoints, normalize)?)
    }
}

/// Interpolates between four fetched corner datasets given in bottom-left,
/// bottom-right, top-right, top-left order.
pub fn interpolate_corners(
    corners: [&Dataset; 4],
    density: f64,
    temperature: f64,
    npoints: usize,
) -> Result<PreparedInterpolation, GridError> {
    check_query(density, temperature)?;
    if npoints < 2 {
        return Err(GridError::InsufficientPoints { actual: npoints });
    }
    let [bottom_left, bottom_right, top_right, top_left] = corners;

    let low = Morph::build(&bottom_left.curve, &bottom_right.curve, npoints)?;
    let low_fraction = morph_parameter(density, bottom_left.density, bottom_right.density);
    let low_temperature = bottom_left.temperature
        * (bottom_right.temperature / bottom_left.temperature).powf(low_fraction * low_fraction);
    let low_curve = low.sample(low_fraction, npoints, false)?;
    drop(low);

    let high = Morph::build(&top_left.curve, &top_right.curve, npoints)?;
    let high_fraction = morph_parameter(density, top_left.density, top_right.density);
    let high_temperature = top_left.temperature
        * (top_right.temperature / top_left.temperature).powf(high_fraction * high_fraction);
    let high_curve = high.sample(high_fraction, npoints, false)?;
    drop(high);

    let morph = Morph::build(&low_curve, &high_curve, npoints)?;
    let temperature_fraction = morph_parameter(temperature, low_temperature, high_temperature);

    let stages = MorphStages {
        low_fraction,
        low_temperature,
        high_fraction,
        high_temperature,
        temperature_fraction,
    };
    debug!(
        density,
        temperature,
        t1 = low_fraction,
        t2 = high_fraction,
        t3 = temperature_fraction,
        tm1 = low_temperature,
        tm2 = high_temperature,
        "composed corner morphs"
    );

    Ok(PreparedInterpolation {
        morph,
        density,
        temperature,
        stages,
    })
}

/// Selects and fetches the corners of `group` around the query, then
/// prepares the interpolated shape.
pub fn prepare_interpolation<S: LineShapeStore + ?Sized>(
    store: &S,
    group: LineGroup,
    density: f64,
    temperature: f64,
    npoints: usize,
) -> Result<PreparedInterpolation, GridError> {
    let candidates = store.bracket_candidates(group.model, group.environment, group.line)?;
    let corners = select_corners(&candidates, density, temperature)?;

    let [bottom_left, bottom_right, top_right, top_left] = corners.ids().map(|id| {
        store
            .dataset(id)
            .map_err(|error| GridError::MissingDataset {
                id,
                message: error.to_string(),
            })
    });
    let datasets = [bottom_left?, bottom_right?, top_right?, top_left?];

    interpolate_corners(
        [&datasets[0], &datasets[1], &datasets[2], &datasets[3]],
        density,
        temperature,
        npoints,
    )
}

/// Interpolated shape sampled on `settings.points` points, broadened with
/// the configured Voigt widths plus, on request, the line's Doppler width.
pub fn get_interpolation<S: LineShapeStore + ?Sized>(
    store: &S,
    group: LineGroup,
    density: f64,
    temperature: f64,
    settings: &InterpolationSettings,
) -> Result<Curve, GridError> {
    settings.broadening.validate()?;
    let prepared = prepare_interpolation(store, group, density, temperature, settings.points)?;
    let curve = prepared.sample(settings.points, settings.normalize)?;

    let mut params = settings.broadening;
    if settings.doppler {
        params = params.with_extra_sigma(doppler_sigma(store, group.line, temperature)?);
    }
    if params.is_noop() {
        return Ok(curve);
    }

    let (xmin, xmax) = curve.domain();
    let dx = (xmax - xmin) / (curve.len() - 1) as f64;
    let (x, y) = curve.into_parts();
    let mut broadened = VoigtConvolver::new().convolve(&y, dx, params)?;
    // The transform leaves rounding-level negative values in empty wings.
    for value in &mut broadened {
        *value = value.max(0.0);
    }

    Curve::new(x, broadened).map_err(|_| GridError::InsufficientPoints {
        actual: settings.points,
    })
}

/// Thermal Doppler width `3.265e-5 * E0 * sqrt(T / M)` in the units of `E0`.
pub fn doppler_width(properties: LineProperties, temperature: f64) -> Result<f64, GridError> {
    if !(properties.radiator_mass > 0.0) {
        return Err(GridError::InvalidMass {
            mass: properties.radiator_mass,
        });
    }
    if !temperature.is_finite() || temperature < 0.0 {
        return Err(GridError::InvalidTemperature { temperature });
    }
    Ok(DOPPLER_SIGMA_COEFFICIENT
        * properties.energy
        * (temperature / properties.radiator_mass).sqrt())
}

pub fn doppler_sigma<S: LineShapeStore + ?Sized>(
    store: &S,
    line: LineId,
    temperature: f64,
) -> Result<f64, GridError> {
    doppler_width(store.line_properties(line)?, temperature)
}

/// Density and temperature span of the datasets of `group`, `None` when the
/// group is empty.
pub fn interpolation_limits<S: LineShapeStore + ?Sized>(
    store: &S,
    group: LineGroup,
) -> Result<Option<GridLimits>, GridError> {
    let candidates = store.bracket_candidates(group.model, group.environment, group.line)?;
    Ok(GridLimits::from_candidates(&candidates))
}

#[cfg(test)]
mod tests {
    use super::{
        CornerSet, GridError, doppler_width, interpolate_corners, morph_parameter,
        select_corners,
    };
    use crate::domain::{BracketCandidate, Curve, Dataset, DatasetId, ErrorKind, LineProperties};
    use crate::numerics::linear_grid;

    fn candidate(id: u64, density: f64, temperature: f64) -> BracketCandidate {
        BracketCandidate {
            id: DatasetId(id),
            density,
            temperature,
        }
    }

    fn scaled_gaussian(scale: f64) -> Curve {
        let x = linear_grid(-6.0, 6.0, 121).expect("grid");
        let y = x.iter().map(|xi| scale * (-xi * xi / 2.0).exp()).collect();
        Curve::new(x, y).expect("curve")
    }

    #[test]
    fn unit_square_corners_are_assigned_by_quadrant() {
        let candidates = [
            candidate(1, 0.0, 0.0),
            candidate(2, 1.0, 0.0),
            candidate(3, 1.0, 1.0),
            candidate(4, 0.0, 1.0),
        ];

        let corners = select_corners(&candidates, 0.5, 0.5).expect("bracket");
        assert_eq!(
            corners,
            CornerSet {
                bottom_left: DatasetId(1),
                bottom_right: DatasetId(2),
                top_right: DatasetId(3),
                top_left: DatasetId(4),
            }
        );
    }

    #[test]
    fn nearest_candidate_wins_each_quadrant() {
        let candidates = [
            candidate(1, 1.0e16, 1.0),
            candidate(2, 8.0e16, 1.5),
            candidate(3, 2.0e17, 1.0),
            candidate(4, 2.0e17, 4.0),
            candidate(5, 1.0e17, 4.0),
            candidate(6, 9.0e16, 3.0),
        ];

        let corners = select_corners(&candidates, 1.0e17, 2.0).expect("bracket");
        assert_eq!(corners.bottom_left, DatasetId(2));
        assert_eq!(corners.bottom_right, DatasetId(3));
        assert_eq!(corners.top_right, DatasetId(5));
        assert_eq!(corners.top_left, DatasetId(6));
    }

    #[test]
    fn candidate_on_an_axis_fills_two_quadrants() {
        let candidates = [
            candidate(1, 1.0, 2.0),
            candidate(2, 2.0, 2.0),
            candidate(3, 2.0, 3.0),
            candidate(4, 1.0, 3.0),
        ];

        let corners = select_corners(&candidates, 2.0, 2.5).expect("bracket");
        assert_eq!(corners.bottom_left, DatasetId(2));
        assert_eq!(corners.bottom_right, DatasetId(2));
        assert_eq!(corners.top_right, DatasetId(3));
        assert_eq!(corners.top_left, DatasetId(3));

        let on_node = select_corners(&candidates, 2.0, 2.0).expect("bracket");
        assert_eq!(on_node.bottom_left, DatasetId(2));
        assert_eq!(on_node.bottom_right, DatasetId(2));
        assert_eq!(on_node.top_right, DatasetId(2));
        assert_eq!(on_node.top_left, DatasetId(2));
    }

    #[test]
    fn queries_outside_the_grid_report_the_empty_quadrant() {
        let candidates = [
            candidate(1, 1.0, 1.0),
            candidate(2, 2.0, 1.0),
            candidate(3, 2.0, 2.0),
            candidate(4, 1.0, 2.0),
        ];

        let error = select_corners(&candidates, 1.5, 3.0).expect_err("above the grid");
        assert_eq!(
            error,
            GridError::NoBracket {
                density: 1.5,
                temperature: 3.0,
                missing: "top-right",
            }
        );
        assert_eq!(error.kind(), ErrorKind::NoBracket);

        for (density, temperature) in [(0.0, 1.0), (1.0, -1.0), (f64::NAN, 1.0)] {
            let error = select_corners(&candidates, density, temperature).expect_err("invalid");
            assert_eq!(error.kind(), ErrorKind::NoBracket);
        }
        assert!(select_corners(&[], 1.0, 1.0).is_err());
    }

    #[test]
    fn equal_axis_values_give_a_zero_fraction() {
        assert_eq!(morph_parameter(5.0e17, 1.0e17, 1.0e17), 0.0);
        assert_eq!(morph_parameter(1.0e17, 1.0e17, 1.0e18), 0.0);
        assert_eq!(morph_parameter(1.0e18, 1.0e17, 1.0e18), 1.0);

        let half = morph_parameter(10.0_f64.powf(17.5), 1.0e17, 1.0e18);
        assert!((half - 0.5_f64.sqrt()).abs() < 1.0e-12);
    }

    #[test]
    fn identical_shapes_interpolate_their_scale() {
        let corners = [
            Dataset::new(1.0e17, 1.0, scaled_gaussian(1.0)),
            Dataset::new(1.0e18, 1.0, scaled_gaussian(1.0)),
            Dataset::new(1.0e18, 4.0, scaled_gaussian(4.0)),
            Dataset::new(1.0e17, 4.0, scaled_gaussian(4.0)),
        ];
        let prepared = interpolate_corners(
            [&corners[0], &corners[1], &corners[2], &corners[3]],
            10.0_f64.powf(17.5),
            2.0,
            601,
        )
        .expect("interpolation");

        let stages = prepared.stages();
        assert_eq!(stages.low_temperature, 1.0);
        assert_eq!(stages.high_temperature, 4.0);
        assert!((stages.temperature_fraction - 0.5_f64.sqrt()).abs() < 1.0e-12);
        assert_eq!(prepared.domain(), (-6.0, 6.0));

        let scale = 1.0 + 3.0 * 0.5_f64.sqrt();
        let curve = prepared.sample(241, false).expect("sample");
        for (x, y) in curve.points() {
            let expected = scale * (-x * x / 2.0).exp();
            assert!((y - expected).abs() < 1.0e-2 * scale, "x={x}: {y} vs {expected}");
        }
        assert!((prepared.eval_at(0.0, false) - scale).abs() < 1.0e-2 * scale);
    }

    #[test]
    fn degenerate_density_axis_keeps_the_corner_shape() {
        let corners = [
            Dataset::new(1.0e17, 1.0, scaled_gaussian(1.0)),
            Dataset::new(1.0e17, 1.0, scaled_gaussian(1.0)),
            Dataset::new(1.0e17, 3.0, scaled_gaussian(2.0)),
            Dataset::new(1.0e17, 3.0, scaled_gaussian(2.0)),
        ];
        let prepared = interpolate_corners(
            [&corners[0], &corners[1], &corners[2], &corners[3]],
            1.0e17,
            3.0,
            401,
        )
        .expect("interpolation");

        let stages = prepared.stages();
        assert_eq!(stages.low_fraction, 0.0);
        assert_eq!(stages.high_fraction, 0.0);
        assert_eq!(stages.temperature_fraction, 1.0);
        assert!((prepared.eval_at(0.0, false) - 2.0).abs() < 1.0e-2);
    }

    #[test]
    fn doppler_width_follows_the_thermal_formula() {
        let properties = LineProperties {
            energy: 1.0e4,
            radiator_mass: 4.0,
        };
        let sigma = doppler_width(properties, 16.0).expect("width");
        assert!((sigma - 3.265e-5 * 1.0e4 * 2.0).abs() < 1.0e-12);

        let massless = LineProperties {
            energy: 1.0e4,
            radiator_mass: 0.0,
        };
        assert!(matches!(
            doppler_width(massless, 1.0),
            Err(GridError::InvalidMass { .. })
        ));
    }
}
