use lsdb_core::common::units::EnergyUnits;
use lsdb_core::config::InterpolationSettings;
use lsdb_core::domain::{Curve, ErrorKind, LineGroup, LsdbError};
use lsdb_core::grid::{
    doppler_sigma, get_interpolation, interpolation_limits, morph_parameter,
    prepare_interpolation,
};
use lsdb_core::numerics::{BroadeningParams, linear_grid, within_tolerance};
use lsdb_core::store::{FileStore, NewDataset, NewRadiator};
use tempfile::TempDir;

const DENSITIES: [f64; 2] = [1.0e17, 1.0e19];
const TEMPERATURES: [f64; 2] = [2.0, 8.0];

fn gaussian(scale: f64) -> Curve {
    let x = linear_grid(-6.0, 6.0, 241).expect("grid");
    let y = x.iter().map(|x| scale * (-0.5 * x * x).exp()).collect();
    Curve::new(x, y).expect("gaussian curve")
}

/// Mass of the stored profile at a corner; identical shapes otherwise.
fn corner_mass(density: f64, temperature: f64) -> f64 {
    let density_index = if density == DENSITIES[0] { 0.0 } else { 1.0 };
    let temperature_index = if temperature == TEMPERATURES[0] { 0.0 } else { 2.0 };
    1.0 + density_index + temperature_index
}

fn populated_store() -> (FileStore, LineGroup) {
    let mut store = FileStore::in_memory();
    let model = store.add_model("mm", "").expect("model");
    let environment = store.add_environment("ions", "").expect("environment");
    let radiator = store
        .add_radiator(NewRadiator {
            symbol: "Ar".to_string(),
            atomic_number: 18,
            mass: 39.948,
            spectroscopic_charge: 17,
        })
        .expect("radiator");
    let line = store
        .add_line(radiator, "He-b", 3683.7, EnergyUnits::Ev)
        .expect("line");

    let base_area = gaussian(1.0).area();
    for density in DENSITIES {
        for temperature in TEMPERATURES {
            let mass = corner_mass(density, temperature);
            store
                .add_dataset(NewDataset {
                    model,
                    environment,
                    line,
                    density,
                    temperature,
                    curve: gaussian(mass / base_area),
                })
                .expect("dataset");
        }
    }

    (store, LineGroup::new(model, environment, line))
}

#[test]
fn centroid_query_reproduces_the_shape_with_interpolated_mass() {
    let (store, group) = populated_store();
    let density = (DENSITIES[0] * DENSITIES[1]).sqrt();
    let temperature = (TEMPERATURES[0] * TEMPERATURES[1]).sqrt();

    let prepared =
        prepare_interpolation(&store, group, density, temperature, 801).expect("prepared");
    let stages = prepared.stages();
    let s = std::f64::consts::FRAC_1_SQRT_2;
    assert!((stages.low_fraction - s).abs() < 1.0e-12);
    assert!((stages.high_fraction - s).abs() < 1.0e-12);
    assert!((stages.temperature_fraction - s).abs() < 1.0e-12);
    assert_eq!(stages.low_temperature, TEMPERATURES[0]);
    assert_eq!(stages.high_temperature, TEMPERATURES[1]);

    let [bl, br, tr, tl] = [
        corner_mass(DENSITIES[0], TEMPERATURES[0]),
        corner_mass(DENSITIES[1], TEMPERATURES[0]),
        corner_mass(DENSITIES[1], TEMPERATURES[1]),
        corner_mass(DENSITIES[0], TEMPERATURES[1]),
    ];
    let low = (1.0 - s) * bl + s * br;
    let high = (1.0 - s) * tl + s * tr;
    let expected = (1.0 - s) * low + s * high;

    let curve = prepared.sample(801, false).expect("sampled");
    let area = curve.area();
    assert!(
        (area - expected).abs() < 1.0e-2 * expected,
        "area {area}, expected {expected}"
    );

    let base = gaussian(1.0);
    let peak = prepared.eval_at(0.0, false);
    let expected_peak = expected / base.area();
    assert!(
        (peak - expected_peak).abs() < 1.0e-2 * expected_peak,
        "peak {peak}, expected {expected_peak}"
    );
    assert_eq!(prepared.target(), (density, temperature));
}

#[test]
fn query_on_a_stored_node_returns_that_dataset() {
    let (store, group) = populated_store();
    let prepared =
        prepare_interpolation(&store, group, DENSITIES[1], TEMPERATURES[0], 241).expect("prepared");

    assert_eq!(prepared.stages().temperature_fraction, 0.0);
    assert_eq!(morph_parameter(DENSITIES[1], DENSITIES[1], DENSITIES[1]), 0.0);

    let expected = corner_mass(DENSITIES[1], TEMPERATURES[0]);
    let area = prepared.sample(241, false).expect("sampled").area();
    assert!((area - expected).abs() < 1.0e-3 * expected, "area {area}");
}

#[test]
fn one_shot_interpolation_applies_broadening_and_normalization() {
    let (store, group) = populated_store();
    let settings = InterpolationSettings {
        points: 512,
        normalize: true,
        broadening: BroadeningParams::new(0.4, 0.05),
        doppler: false,
    };

    let curve = get_interpolation(&store, group, 1.0e18, 4.0, &settings).expect("interpolated");
    assert_eq!(curve.len(), 512);
    assert!(curve.y().iter().all(|y| *y >= 0.0));
    assert!((curve.area() - 1.0).abs() < 2.0e-2, "area {}", curve.area());

    let sharp = get_interpolation(
        &store,
        group,
        1.0e18,
        4.0,
        &InterpolationSettings {
            broadening: BroadeningParams::default(),
            ..settings
        },
    )
    .expect("interpolated");
    let peak = |curve: &Curve| curve.y().iter().copied().fold(0.0, f64::max);
    assert!(peak(&curve) < peak(&sharp));
}

#[test]
fn doppler_width_follows_line_energy_and_radiator_mass() {
    let (store, group) = populated_store();
    let sigma = doppler_sigma(&store, group.line, 1000.0).expect("doppler sigma");
    let expected = 3.265e-5 * 3683.7 * (1000.0_f64 / 39.948).sqrt();
    assert!((sigma - expected).abs() < 1.0e-12 * expected);

    let settings = InterpolationSettings {
        points: 256,
        doppler: true,
        ..InterpolationSettings::default()
    };
    let curve = get_interpolation(&store, group, 1.0e18, 4.0, &settings).expect("interpolated");
    assert_eq!(curve.len(), 256);
}

#[test]
fn limits_and_missing_brackets_are_reported() {
    let (store, group) = populated_store();
    let limits = interpolation_limits(&store, group)
        .expect("limits")
        .expect("group has datasets");
    assert_eq!((limits.density_min, limits.density_max), (DENSITIES[0], DENSITIES[1]));
    assert_eq!(
        (limits.temperature_min, limits.temperature_max),
        (TEMPERATURES[0], TEMPERATURES[1])
    );

    let error = prepare_interpolation(&store, group, 1.0e20, 4.0, 64).expect_err("outside");
    assert_eq!(error.kind(), ErrorKind::NoBracket);
    let error = LsdbError::from(error);
    assert_eq!(error.exit_code(), 2);
    assert_eq!(error.placeholder(), "RUN.GRID");
}

#[test]
fn persisted_store_interpolates_like_the_in_memory_one() {
    let (store, group) = populated_store();
    let temp = TempDir::new().expect("tempdir should be created");
    let path = temp.path().join("lsdb.json");
    store.save_as(&path).expect("store saved");

    let reopened = FileStore::open(&path).expect("store reopened");
    let settings = InterpolationSettings {
        points: 128,
        ..InterpolationSettings::default()
    };
    let expected = get_interpolation(&store, group, 3.0e17, 3.0, &settings).expect("original");
    let actual = get_interpolation(&reopened, group, 3.0e17, 3.0, &settings).expect("reopened");
    assert_eq!(actual.x().len(), expected.x().len());
    for (lhs, rhs) in actual.points().zip(expected.points()) {
        assert!(within_tolerance(lhs.0, rhs.0, 1.0e-12, 1.0e-12, 1.0e-12));
        assert!(within_tolerance(lhs.1, rhs.1, 1.0e-12, 1.0e-9, 1.0e-12));
    }
}
