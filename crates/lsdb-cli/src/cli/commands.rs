use super::CliError;
use super::helpers::{MorphFrames, core, emit, morph_frames, open_store, parse_units};
use lsdb_core::common::units::{EnergyUnits, conversion_factor};
use lsdb_core::config::{InterpolationSettings, load_settings};
use lsdb_core::domain::{
    Curve, DatasetId, EnvironmentId, LineGroup, LineId, ModelId, RadiatorId,
};
use lsdb_core::grid::{get_interpolation, interpolation_limits};
use lsdb_core::io::{format_series, format_xy, read_xy};
use lsdb_core::numerics::{Morph, Regularization, regularize};
use lsdb_core::store::{FileStore, NewDataset, NewRadiator, StoreError};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(clap::Args)]
pub(super) struct InfoArgs {
    /// Only list datasets of this model
    #[arg(long)]
    model: Option<u64>,

    /// Only list datasets of this environment
    #[arg(long)]
    environment: Option<u64>,

    /// Only list this radiator
    #[arg(long)]
    radiator: Option<u64>,

    /// Only list this line
    #[arg(long)]
    line: Option<u64>,

    /// Units line energies are also shown in
    #[arg(long, default_value = "ev", value_parser = parse_units)]
    units: EnergyUnits,
}

#[derive(clap::Args)]
pub(super) struct NamedArgs {
    name: String,

    #[arg(long, default_value = "")]
    description: String,
}

#[derive(clap::Args)]
pub(super) struct AddRadiatorArgs {
    /// Element symbol, e.g. `Ar`
    #[arg(long)]
    symbol: String,

    #[arg(long)]
    atomic_number: u32,

    /// Spectroscopic charge (ion charge + 1)
    #[arg(long)]
    charge: u32,

    /// Mass in amu
    #[arg(long)]
    mass: f64,
}

#[derive(clap::Args)]
pub(super) struct AddLineArgs {
    name: String,

    #[arg(long)]
    radiator: u64,

    /// Rest energy of the line
    #[arg(long)]
    energy: f64,

    #[arg(long, default_value = "inv-cm", value_parser = parse_units)]
    units: EnergyUnits,
}

#[derive(clap::Args)]
pub(super) struct AddDatasetArgs {
    /// Two-column `x y` text file
    file: PathBuf,

    #[arg(long)]
    model: u64,

    #[arg(long)]
    environment: u64,

    #[arg(long)]
    line: u64,

    /// Electron density in cm^-3
    #[arg(long)]
    density: f64,

    /// Temperature in eV
    #[arg(long)]
    temperature: f64,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum EntityKind {
    Model,
    Environment,
    Radiator,
    Line,
    Dataset,
}

#[derive(clap::Args)]
pub(super) struct DeleteArgs {
    #[arg(value_enum)]
    entity: EntityKind,

    id: u64,
}

#[derive(clap::Args)]
pub(super) struct DatasetArgs {
    id: u64,

    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct InterpolateArgs {
    #[arg(long)]
    model: u64,

    #[arg(long)]
    environment: u64,

    #[arg(long)]
    line: u64,

    /// Electron density in cm^-3
    #[arg(long)]
    density: f64,

    /// Temperature in eV
    #[arg(long)]
    temperature: f64,

    /// JSON interpolation settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    points: Option<usize>,

    /// Rescale the result to unit area
    #[arg(long)]
    normalize: bool,

    /// Add the thermal Doppler width of the line to the Gaussian width
    #[arg(long)]
    doppler: bool,

    /// Gaussian width
    #[arg(long)]
    sigma: Option<f64>,

    /// Lorentzian width
    #[arg(long)]
    gamma: Option<f64>,

    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct MorphArgs {
    #[arg(long)]
    initial: PathBuf,

    #[arg(long = "final")]
    final_curve: PathBuf,

    /// Morph fraction in [0, 1], or an integer frame count above 2
    #[arg(long, default_value_t = 0.5)]
    t: f64,

    #[arg(long)]
    normalize: bool,

    /// Center and rescale both curves before morphing
    #[arg(long)]
    regularize: bool,

    #[arg(long, default_value_t = lsdb_core::common::constants::DEFAULT_POINTS)]
    points: usize,

    #[arg(long)]
    output: Option<PathBuf>,
}

pub(super) fn run_init_command(db: &Path) -> Result<i32, CliError> {
    FileStore::create(db).map_err(core)?;
    info!(path = %db.display(), "created line-shape database");
    Ok(0)
}

pub(super) fn run_info_command(db: &Path, args: InfoArgs) -> Result<i32, CliError> {
    let store = open_store(db)?;
    print!("{}", render_info(&store, &args));
    Ok(0)
}

fn render_info(store: &FileStore, args: &InfoArgs) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Models:");
    for model in store.models() {
        let _ = writeln!(
            out,
            "  id = {}: \"{}\" ({})",
            model.id, model.name, model.description
        );
    }

    let _ = writeln!(out, "Environments:");
    for environment in store.environments() {
        let _ = writeln!(
            out,
            "  id = {}: \"{}\" ({})",
            environment.id, environment.name, environment.description
        );
    }

    let _ = writeln!(out, "Radiators:");
    for radiator in store
        .radiators()
        .filter(|radiator| args.radiator.is_none_or(|id| radiator.id.get() == id))
    {
        let _ = writeln!(
            out,
            "  id = {}: \"{}\" (A = {}, Zsp = {}, mass = {})",
            radiator.id,
            radiator.symbol,
            radiator.atomic_number,
            radiator.spectroscopic_charge,
            radiator.mass
        );
        let _ = writeln!(out, "  Lines:");
        for line in store
            .lines(radiator.id)
            .filter(|line| args.line.is_none_or(|id| line.id.get() == id))
        {
            let converted = line.energy * conversion_factor(line.units, args.units);
            let _ = writeln!(
                out,
                "    id = {}: \"{}\" ({} {} => {} {})",
                line.id,
                line.name,
                line.energy,
                line.units.label(),
                converted,
                args.units.label()
            );
            let _ = writeln!(out, "    Datasets:");
            for dataset in store.datasets(line.id).into_iter().filter(|dataset| {
                args.model.is_none_or(|id| dataset.model.get() == id)
                    && args
                        .environment
                        .is_none_or(|id| dataset.environment.get() == id)
            }) {
                let _ = writeln!(
                    out,
                    "      id = {}: (mid = {}, eid = {}, n_e = {:e} cm^-3, T = {} eV)",
                    dataset.id,
                    dataset.model,
                    dataset.environment,
                    dataset.density,
                    dataset.temperature
                );
            }
        }
    }

    out
}

pub(super) fn run_add_model_command(db: &Path, args: NamedArgs) -> Result<i32, CliError> {
    let mut store = open_store(db)?;
    let id = store
        .add_model(&args.name, &args.description)
        .map_err(core)?;
    store.save().map_err(core)?;
    info!(%id, name = %args.name, "added model");
    println!("{id}");
    Ok(0)
}

pub(super) fn run_add_environment_command(db: &Path, args: NamedArgs) -> Result<i32, CliError> {
    let mut store = open_store(db)?;
    let id = store
        .add_environment(&args.name, &args.description)
        .map_err(core)?;
    store.save().map_err(core)?;
    info!(%id, name = %args.name, "added environment");
    println!("{id}");
    Ok(0)
}

pub(super) fn run_add_radiator_command(db: &Path, args: AddRadiatorArgs) -> Result<i32, CliError> {
    let mut store = open_store(db)?;
    let id = store
        .add_radiator(NewRadiator {
            symbol: args.symbol,
            atomic_number: args.atomic_number,
            mass: args.mass,
            spectroscopic_charge: args.charge,
        })
        .map_err(core)?;
    store.save().map_err(core)?;
    info!(%id, "added radiator");
    println!("{id}");
    Ok(0)
}

pub(super) fn run_add_line_command(db: &Path, args: AddLineArgs) -> Result<i32, CliError> {
    let mut store = open_store(db)?;
    let id = store
        .add_line(RadiatorId(args.radiator), &args.name, args.energy, args.units)
        .map_err(core)?;
    store.save().map_err(core)?;
    info!(%id, radiator = args.radiator, "added line");
    println!("{id}");
    Ok(0)
}

pub(super) fn run_add_dataset_command(db: &Path, args: AddDatasetArgs) -> Result<i32, CliError> {
    let curve = read_xy(&args.file).map_err(core)?;
    let mut store = open_store(db)?;
    let id = store
        .add_dataset(NewDataset {
            model: ModelId(args.model),
            environment: EnvironmentId(args.environment),
            line: LineId(args.line),
            density: args.density,
            temperature: args.temperature,
            curve,
        })
        .map_err(core)?;
    store.save().map_err(core)?;
    info!(
        %id,
        density = args.density,
        temperature = args.temperature,
        file = %args.file.display(),
        "added dataset"
    );
    println!("{id}");
    Ok(0)
}

pub(super) fn run_delete_command(db: &Path, args: DeleteArgs) -> Result<i32, CliError> {
    let mut store = open_store(db)?;
    let (entity, outcome) = match args.entity {
        EntityKind::Model => ("model", store.delete_model(ModelId(args.id))),
        EntityKind::Environment => (
            "environment",
            store.delete_environment(EnvironmentId(args.id)),
        ),
        EntityKind::Radiator => ("radiator", store.delete_radiator(RadiatorId(args.id))),
        EntityKind::Line => ("line", store.delete_line(LineId(args.id))),
        EntityKind::Dataset => ("dataset", store.delete_dataset(DatasetId(args.id))),
    };
    outcome.map_err(core)?;
    store.save().map_err(core)?;
    info!(entity, id = args.id, "deleted");
    Ok(0)
}

pub(super) fn run_dataset_command(db: &Path, args: DatasetArgs) -> Result<i32, CliError> {
    let store = open_store(db)?;
    let record = store
        .dataset_record(DatasetId(args.id))
        .ok_or_else(|| {
            core(StoreError::NotFound {
                entity: "dataset",
                id: args.id,
            })
        })?;
    emit(args.output.as_deref(), &format_xy(&record.curve))?;
    Ok(0)
}

pub(super) fn run_interpolate_command(db: &Path, args: InterpolateArgs) -> Result<i32, CliError> {
    let settings = interpolation_settings(&args)?;
    let store = open_store(db)?;
    let group = LineGroup::new(
        ModelId(args.model),
        EnvironmentId(args.environment),
        LineId(args.line),
    );

    if let Some(limits) = interpolation_limits(&store, group).map_err(core)? {
        debug!(
            density_min = limits.density_min,
            density_max = limits.density_max,
            temperature_min = limits.temperature_min,
            temperature_max = limits.temperature_max,
            "stored grid span"
        );
    }

    let curve = get_interpolation(&store, group, args.density, args.temperature, &settings)
        .map_err(core)?;
    emit(args.output.as_deref(), &format_xy(&curve))?;
    Ok(0)
}

fn interpolation_settings(args: &InterpolateArgs) -> Result<InterpolationSettings, CliError> {
    let mut settings = match &args.config {
        Some(path) => load_settings(path).map_err(core)?,
        None => InterpolationSettings::default(),
    };
    if let Some(points) = args.points {
        settings.points = points;
    }
    if let Some(sigma) = args.sigma {
        settings.broadening.sigma = sigma;
    }
    if let Some(gamma) = args.gamma {
        settings.broadening.gamma = gamma;
    }
    settings.normalize |= args.normalize;
    settings.doppler |= args.doppler;
    settings.validate().map_err(core)?;
    Ok(settings)
}

pub(super) fn run_morph_command(args: MorphArgs) -> Result<i32, CliError> {
    let frames = morph_frames(args.t)?;
    let initial = read_xy(&args.initial).map_err(core)?;
    let last = read_xy(&args.final_curve).map_err(core)?;

    let (initial, last, coordinates) = if args.regularize {
        let (initial, from) = regularize(&initial).map_err(core)?;
        let (last, to) = regularize(&last).map_err(core)?;
        debug!(
            initial_shift = from.shift,
            initial_scale = from.scale,
            final_shift = to.shift,
            final_scale = to.scale,
            "regularized curves"
        );
        (initial, last, Some((from, to)))
    } else {
        (initial, last, None)
    };

    let morph = Morph::build(&initial, &last, args.points).map_err(core)?;
    let sampled = match frames {
        MorphFrames::Single(t) => vec![(
            t,
            morph
                .sample(t, args.points, args.normalize)
                .map_err(core)?,
        )],
        MorphFrames::Series(count) => morph
            .sample_series(count, args.points, args.normalize)
            .map_err(core)?,
    };

    let curves = sampled
        .into_iter()
        .map(|(t, curve)| restore_frame(curve, coordinates, t))
        .collect::<Result<Vec<_>, _>>()?;
    emit(args.output.as_deref(), &format_series(&curves))?;
    Ok(0)
}

fn restore_frame(
    curve: Curve,
    coordinates: Option<(Regularization, Regularization)>,
    t: f64,
) -> Result<Curve, CliError> {
    match coordinates {
        Some((from, to)) => from.interpolate(&to, t).restore(&curve).map_err(core),
        None => Ok(curve),
    }
}
