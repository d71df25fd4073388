use super::{
    DatasetRecord, EnvironmentRecord, LineRecord, LineShapeStore, ModelRecord, NewDataset,
    NewRadiator, RadiatorRecord, StoreError,
};
use crate::common::units::EnergyUnits;
use crate::domain::{
    BracketCandidate, Dataset, DatasetId, EnvironmentId, GridLimits, LineId, LineProperties,
    ModelId, RadiatorId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const STORE_FORMAT: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoreDocument {
    format: u32,
    #[serde(default)]
    models: Vec<ModelRecord>,
    #[serde(default)]
    environments: Vec<EnvironmentRecord>,
    #[serde(default)]
    radiators: Vec<RadiatorRecord>,
    #[serde(default)]
    lines: Vec<LineRecord>,
    #[serde(default)]
    datasets: Vec<DatasetRecord>,
}

/// Catalogue kept in memory and persisted as a single JSON document.
///
/// Ids are assigned per table, starting at 1. Deleting a row removes every
/// row that refers to it.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    path: Option<PathBuf>,
    models: BTreeMap<ModelId, ModelRecord>,
    environments: BTreeMap<EnvironmentId, EnvironmentRecord>,
    radiators: BTreeMap<RadiatorId, RadiatorRecord>,
    lines: BTreeMap<LineId, LineRecord>,
    datasets: BTreeMap<DatasetId, DatasetRecord>,
}

fn next_id<K, V>(table: &BTreeMap<K, V>, raw: impl Fn(&K) -> u64) -> u64 {
    table.keys().next_back().map_or(1, |last| raw(last) + 1)
}

fn require_name(entity: &'static str, name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::invalid(entity, "name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn require_positive(entity: &'static str, field: &str, value: f64) -> Result<(), StoreError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(StoreError::invalid(
            entity,
            format!("{field} must be finite and > 0, got {value}"),
        ));
    }
    Ok(())
}

impl FileStore {
    /// Empty store without a backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates an empty store file; refuses to overwrite an existing one.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let store = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };
        store.save()?;
        Ok(store)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;
        let document: StoreDocument =
            serde_json::from_str(&source).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                message: source.to_string(),
            })?;
        if document.format != STORE_FORMAT {
            return Err(StoreError::Parse {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported format {} (expected {STORE_FORMAT})",
                    document.format
                ),
            });
        }

        let mut store = Self::from_document(document)?;
        store.path = Some(path.to_path_buf());
        debug!(
            path = %path.display(),
            datasets = store.datasets.len(),
            "opened line-shape store"
        );
        Ok(store)
    }

    fn from_document(document: StoreDocument) -> Result<Self, StoreError> {
        let mut store = Self::default();

        for record in document.models {
            require_name("model", &record.name)?;
            if store.models.insert(record.id, record.clone()).is_some() {
                return Err(StoreError::invalid("model", format!("duplicate id {}", record.id)));
            }
        }
        for record in document.environments {
            require_name("environment", &record.name)?;
            if store.environments.insert(record.id, record.clone()).is_some() {
                return Err(StoreError::invalid(
                    "environment",
                    format!("duplicate id {}", record.id),
                ));
            }
        }
        for record in document.radiators {
            store.check_radiator(
                &record.symbol,
                record.atomic_number,
                record.mass,
                record.spectroscopic_charge,
            )?;
            if store.radiators.insert(record.id, record.clone()).is_some() {
                return Err(StoreError::invalid(
                    "radiator",
                    format!("duplicate id {}", record.id),
                ));
            }
        }
        for record in document.lines {
            store.check_line(record.radiator, &record.name, record.energy)?;
            if store.lines.insert(record.id, record.clone()).is_some() {
                return Err(StoreError::invalid("line", format!("duplicate id {}", record.id)));
            }
        }
        for record in document.datasets {
            store.check_dataset(
                record.model,
                record.environment,
                record.line,
                record.density,
                record.temperature,
            )?;
            if store.datasets.insert(record.id, record.clone()).is_some() {
                return Err(StoreError::invalid(
                    "dataset",
                    format!("duplicate id {}", record.id),
                ));
            }
        }

        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let path = self.path.as_deref().ok_or(StoreError::Detached)?;
        self.save_as(path)
    }

    pub fn save_as(&self, path: &Path) -> Result<(), StoreError> {
        let document = StoreDocument {
            format: STORE_FORMAT,
            models: self.models.values().cloned().collect(),
            environments: self.environments.values().cloned().collect(),
            radiators: self.radiators.values().cloned().collect(),
            lines: self.lines.values().cloned().collect(),
            datasets: self.datasets.values().cloned().collect(),
        };
        let write_error = |message: String| StoreError::Write {
            path: path.to_path_buf(),
            message,
        };
        let encoded =
            serde_json::to_string_pretty(&document).map_err(|error| write_error(error.to_string()))?;
        fs::write(path, encoded).map_err(|error| write_error(error.to_string()))
    }

    pub fn add_model(&mut self, name: &str, description: &str) -> Result<ModelId, StoreError> {
        let name = require_name("model", name)?;
        let id = ModelId(next_id(&self.models, |id| id.get()));
        self.models.insert(
            id,
            ModelRecord {
                id,
                name,
                description: description.trim().to_string(),
            },
        );
        debug!(%id, "added model");
        Ok(id)
    }

    pub fn add_environment(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<EnvironmentId, StoreError> {
        let name = require_name("environment", name)?;
        let id = EnvironmentId(next_id(&self.environments, |id| id.get()));
        self.environments.insert(
            id,
            EnvironmentRecord {
                id,
                name,
                description: description.trim().to_string(),
            },
        );
        debug!(%id, "added environment");
        Ok(id)
    }

    pub fn add_radiator(&mut self, radiator: NewRadiator) -> Result<RadiatorId, StoreError> {
        self.check_radiator(
            &radiator.symbol,
            radiator.atomic_number,
            radiator.mass,
            radiator.spectroscopic_charge,
        )?;
        let id = RadiatorId(next_id(&self.radiators, |id| id.get()));
        self.radiators.insert(
            id,
            RadiatorRecord {
                id,
                symbol: radiator.symbol.trim().to_string(),
                atomic_number: radiator.atomic_number,
                mass: radiator.mass,
                spectroscopic_charge: radiator.spectroscopic_charge,
            },
        );
        debug!(%id, "added radiator");
        Ok(id)
    }

    pub fn add_line(
        &mut self,
        radiator: RadiatorId,
        name: &str,
        energy: f64,
        units: EnergyUnits,
    ) -> Result<LineId, StoreError> {
        self.check_line(radiator, name, energy)?;
        let id = LineId(next_id(&self.lines, |id| id.get()));
        self.lines.insert(
            id,
            LineRecord {
                id,
                radiator,
                name: name.trim().to_string(),
                energy,
                units,
            },
        );
        debug!(%id, %radiator, "added line");
        Ok(id)
    }

    pub fn add_dataset(&mut self, dataset: NewDataset) -> Result<DatasetId, StoreError> {
        self.check_dataset(
            dataset.model,
            dataset.environment,
            dataset.line,
            dataset.density,
            dataset.temperature,
        )?;
        let id = DatasetId(next_id(&self.datasets, |id| id.get()));
        self.datasets.insert(
            id,
            DatasetRecord {
                id,
                model: dataset.model,
                environment: dataset.environment,
                line: dataset.line,
                density: dataset.density,
                temperature: dataset.temperature,
                curve: dataset.curve,
            },
        );
        debug!(
            %id,
            density = dataset.density,
            temperature = dataset.temperature,
            "added dataset"
        );
        Ok(id)
    }

    pub fn delete_model(&mut self, id: ModelId) -> Result<(), StoreError> {
        self.models.remove(&id).ok_or(StoreError::NotFound {
            entity: "model",
            id: id.get(),
        })?;
        self.datasets.retain(|_, dataset| dataset.model != id);
        Ok(())
    }

    pub fn delete_environment(&mut self, id: EnvironmentId) -> Result<(), StoreError> {
        self.environments.remove(&id).ok_or(StoreError::NotFound {
            entity: "environment",
            id: id.get(),
        })?;
        self.datasets.retain(|_, dataset| dataset.environment != id);
        Ok(())
    }

    pub fn delete_radiator(&mut self, id: RadiatorId) -> Result<(), StoreError> {
        self.radiators.remove(&id).ok_or(StoreError::NotFound {
            entity: "radiator",
            id: id.get(),
        })?;
        let orphaned: Vec<LineId> = self
            .lines
            .values()
            .filter(|line| line.radiator == id)
            .map(|line| line.id)
            .collect();
        for line in orphaned {
            self.remove_line(line);
        }
        Ok(())
    }

    pub fn delete_line(&mut self, id: LineId) -> Result<(), StoreError> {
        if !self.lines.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: "line",
                id: id.get(),
            });
        }
        self.remove_line(id);
        Ok(())
    }

    pub fn delete_dataset(&mut self, id: DatasetId) -> Result<(), StoreError> {
        self.datasets
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "dataset",
                id: id.get(),
            })
    }

    fn remove_line(&mut self, id: LineId) {
        self.lines.remove(&id);
        self.datasets.retain(|_, dataset| dataset.line != id);
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelRecord> + '_ {
        self.models.values()
    }

    pub fn environments(&self) -> impl Iterator<Item = &EnvironmentRecord> + '_ {
        self.environments.values()
    }

    pub fn radiators(&self) -> impl Iterator<Item = &RadiatorRecord> + '_ {
        self.radiators.values()
    }

    pub fn lines(&self, radiator: RadiatorId) -> impl Iterator<Item = &LineRecord> + '_ {
        self.lines
            .values()
            .filter(move |line| line.radiator == radiator)
    }

    /// Datasets of one line ordered by model, environment, density, temperature.
    pub fn datasets(&self, line: LineId) -> Vec<&DatasetRecord> {
        let mut records: Vec<&DatasetRecord> = self
            .datasets
            .values()
            .filter(|dataset| dataset.line == line)
            .collect();
        records.sort_by(|lhs, rhs| {
            lhs.model
                .cmp(&rhs.model)
                .then(lhs.environment.cmp(&rhs.environment))
                .then(lhs.density.total_cmp(&rhs.density))
                .then(lhs.temperature.total_cmp(&rhs.temperature))
                .then(lhs.id.cmp(&rhs.id))
        });
        records
    }

    pub fn dataset_record(&self, id: DatasetId) -> Option<&DatasetRecord> {
        self.datasets.get(&id)
    }

    pub fn line(&self, id: LineId) -> Option<&LineRecord> {
        self.lines.get(&id)
    }

    /// Density and temperature span of a group, `None` when it has no datasets.
    pub fn limits(
        &self,
        model: ModelId,
        environment: EnvironmentId,
        line: LineId,
    ) -> Option<GridLimits> {
        GridLimits::from_candidates(&self.group_candidates(model, environment, line))
    }

    fn group_candidates(
        &self,
        model: ModelId,
        environment: EnvironmentId,
        line: LineId,
    ) -> Vec<BracketCandidate> {
        self.datasets
            .values()
            .filter(|dataset| {
                dataset.model == model && dataset.environment == environment && dataset.line == line
            })
            .map(DatasetRecord::candidate)
            .collect()
    }

    fn check_radiator(
        &self,
        symbol: &str,
        atomic_number: u32,
        mass: f64,
        spectroscopic_charge: u32,
    ) -> Result<(), StoreError> {
        if symbol.trim().is_empty() {
            return Err(StoreError::invalid("radiator", "symbol must not be empty"));
        }
        if atomic_number == 0 {
            return Err(StoreError::invalid("radiator", "atomic number must be >= 1"));
        }
        if spectroscopic_charge == 0 || spectroscopic_charge > atomic_number {
            return Err(StoreError::invalid(
                "radiator",
                format!(
                    "spectroscopic charge must be in 1..={atomic_number}, got {spectroscopic_charge}"
                ),
            ));
        }
        require_positive("radiator", "mass", mass)
    }

    fn check_line(&self, radiator: RadiatorId, name: &str, energy: f64) -> Result<(), StoreError> {
        if !self.radiators.contains_key(&radiator) {
            return Err(StoreError::invalid(
                "line",
                format!("radiator {radiator} does not exist"),
            ));
        }
        require_name("line", name)?;
        require_positive("line", "energy", energy)
    }

    fn check_dataset(
        &self,
        model: ModelId,
        environment: EnvironmentId,
        line: LineId,
        density: f64,
        temperature: f64,
    ) -> Result<(), StoreError> {
        if !self.models.contains_key(&model) {
            return Err(StoreError::invalid(
                "dataset",
                format!("model {model} does not exist"),
            ));
        }
        if !self.environments.contains_key(&environment) {
            return Err(StoreError::invalid(
                "dataset",
                format!("environment {environment} does not exist"),
            ));
        }
        if !self.lines.contains_key(&line) {
            return Err(StoreError::invalid(
                "dataset",
                format!("line {line} does not exist"),
            ));
        }
        require_positive("dataset", "density", density)?;
        require_positive("dataset", "temperature", temperature)
    }
}

impl LineShapeStore for FileStore {
    fn bracket_candidates(
        &self,
        model: ModelId,
        environment: EnvironmentId,
        line: LineId,
    ) -> Result<Vec<BracketCandidate>, StoreError> {
        Ok(self.group_candidates(model, environment, line))
    }

    fn dataset(&self, id: DatasetId) -> Result<Dataset, StoreError> {
        let record = self.datasets.get(&id).ok_or(StoreError::NotFound {
            entity: "dataset",
            id: id.get(),
        })?;
        Ok(Dataset::new(
            record.density,
            record.temperature,
            record.curve.clone(),
        ))
    }

    fn line_properties(&self, line: LineId) -> Result<LineProperties, StoreError> {
        let record = self.lines.get(&line).ok_or(StoreError::NotFound {
            entity: "line",
            id: line.get(),
        })?;
        let radiator = self
            .radiators
            .get(&record.radiator)
            .ok_or(StoreError::NotFound {
                entity: "radiator",
                id: record.radiator.get(),
            })?;
        Ok(LineProperties {
            energy: record.energy,
            radiator_mass: radiator.mass,
        })
    }
}
