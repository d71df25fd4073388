//! Line-shape catalogue: the records the grid interpolator reads from and the
//! file-backed store that keeps them.

pub mod file;

pub use file::FileStore;

use crate::common::units::EnergyUnits;
use crate::domain::{
    BracketCandidate, Curve, Dataset, DatasetId, EnvironmentId, ErrorKind, LineId,
    LineProperties, ModelId, RadiatorId,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("invalid {entity} record: {message}")]
    InvalidRecord {
        entity: &'static str,
        message: String,
    },
    #[error("failed to read store '{path}': {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to write store '{path}': {message}")]
    Write { path: PathBuf, message: String },
    #[error("store '{path}' is malformed: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("store '{path}' already exists")]
    AlreadyExists { path: PathBuf },
    #[error("store has no backing file")]
    Detached,
}

impl StoreError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidRecord { .. } | Self::Parse { .. } => ErrorKind::InvalidRecord,
            Self::Read { .. } | Self::Write { .. } | Self::AlreadyExists { .. } | Self::Detached => {
                ErrorKind::Io
            }
        }
    }

    pub(crate) fn invalid(entity: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            entity,
            message: message.into(),
        }
    }
}

/// Read side of the catalogue consumed by the grid interpolator.
pub trait LineShapeStore {
    /// Every dataset stored for one (model, environment, line) group.
    fn bracket_candidates(
        &self,
        model: ModelId,
        environment: EnvironmentId,
        line: LineId,
    ) -> Result<Vec<BracketCandidate>, StoreError>;

    fn dataset(&self, id: DatasetId) -> Result<Dataset, StoreError>;

    fn line_properties(&self, line: LineId) -> Result<LineProperties, StoreError>;
}

impl<S: LineShapeStore + ?Sized> LineShapeStore for &S {
    fn bracket_candidates(
        &self,
        model: ModelId,
        environment: EnvironmentId,
        line: LineId,
    ) -> Result<Vec<BracketCandidate>, StoreError> {
        (**self).bracket_candidates(model, environment, line)
    }

    fn dataset(&self, id: DatasetId) -> Result<Dataset, StoreError> {
        (**self).dataset(id)
    }

    fn line_properties(&self, line: LineId) -> Result<LineProperties, StoreError> {
        (**self).line_properties(line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: ModelId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub id: EnvironmentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Emitting species: element symbol, nuclear charge, mass in amu and
/// spectroscopic charge (ion charge + 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiatorRecord {
    pub id: RadiatorId,
    pub symbol: String,
    pub atomic_number: u32,
    pub mass: f64,
    pub spectroscopic_charge: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub id: LineId,
    pub radiator: RadiatorId,
    pub name: String,
    pub energy: f64,
    #[serde(default)]
    pub units: EnergyUnits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    pub model: ModelId,
    pub environment: EnvironmentId,
    pub line: LineId,
    pub density: f64,
    pub temperature: f64,
    pub curve: Curve,
}

impl DatasetRecord {
    pub fn candidate(&self) -> BracketCandidate {
        BracketCandidate {
            id: self.id,
            density: self.density,
            temperature: self.temperature,
        }
    }
}

/// Fields of a new radiator.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRadiator {
    pub symbol: String,
    pub atomic_number: u32,
    pub mass: f64,
    pub spectroscopic_charge: u32,
}

/// Fields of a new dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataset {
    pub model: ModelId,
    pub environment: EnvironmentId,
    pub line: LineId,
    pub density: f64,
    pub temperature: f64,
    pub curve: Curve,
}
