use crate::common::constants::DEFAULT_POINTS;
use crate::domain::ErrorKind;
use crate::numerics::BroadeningParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tunables for an interpolation request, loadable from JSON.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpolationSettings {
    pub points: usize,
    pub normalize: bool,
    pub broadening: BroadeningParams,
    /// Add the thermal Doppler width of the line to `broadening.sigma`.
    pub doppler: bool,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            points: DEFAULT_POINTS,
            normalize: false,
            broadening: BroadeningParams::default(),
            doppler: false,
        }
    }
}

impl InterpolationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points < 2 {
            return Err(ConfigError::Invalid {
                field: "points",
                message: format!("must be >= 2, got {}", self.points),
            });
        }
        self.broadening
            .validate()
            .map_err(|error| ConfigError::Invalid {
                field: "broadening",
                message: error.to_string(),
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::Io,
            Self::Parse { .. } | Self::Invalid { .. } => ErrorKind::InvalidRecord,
        }
    }
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<InterpolationSettings, ConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: InterpolationSettings =
        serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, InterpolationSettings, load_settings};
    use crate::domain::ErrorKind;
    use crate::numerics::BroadeningParams;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{ "points": 501, "broadening": { "gamma": 0.25 } }"#)
            .expect("settings should be written");

        let settings = load_settings(&path).expect("settings should load");
        assert_eq!(
            settings,
            InterpolationSettings {
                points: 501,
                broadening: BroadeningParams::new(0.0, 0.25),
                ..InterpolationSettings::default()
            }
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("settings.json");

        fs::write(&path, r#"{ "points": 1 }"#).expect("settings should be written");
        assert!(matches!(
            load_settings(&path),
            Err(ConfigError::Invalid {
                field: "points",
                ..
            })
        ));

        fs::write(&path, r#"{ "broadening": { "sigma": -1.0 } }"#)
            .expect("settings should be written");
        assert!(matches!(
            load_settings(&path),
            Err(ConfigError::Invalid {
                field: "broadening",
                ..
            })
        ));

        fs::write(&path, r#"{ "pionts": 3 }"#).expect("settings should be written");
        let error = load_settings(&path).expect_err("unknown field");
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert_eq!(error.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn unreadable_settings_are_io_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = load_settings(temp.path().join("absent.json")).expect_err("missing");
        assert_eq!(error.kind(), ErrorKind::Io);
    }
}
