use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LsdbResult<T> = Result<T, LsdbError>;

/// Failure kinds shared by every component of the line-shape engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DegenerateInput,
    EmptyDomain,
    OutOfDomain,
    NoBracket,
    MissingDataset,
    AllocationFailure,
    NotFound,
    InvalidRecord,
    Io,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DegenerateInput => "DegenerateInput",
            Self::EmptyDomain => "EmptyDomain",
            Self::OutOfDomain => "OutOfDomain",
            Self::NoBracket => "NoBracket",
            Self::MissingDataset => "MissingDataset",
            Self::AllocationFailure => "AllocationFailure",
            Self::NotFound => "NotFound",
            Self::InvalidRecord => "InvalidRecord",
            Self::Io => "Io",
        }
    }

    pub const fn category(self) -> LsdbErrorCategory {
        match self {
            Self::DegenerateInput | Self::NoBracket | Self::NotFound | Self::InvalidRecord => {
                LsdbErrorCategory::InputValidationError
            }
            Self::MissingDataset | Self::Io => LsdbErrorCategory::IoSystemError,
            Self::EmptyDomain | Self::OutOfDomain => LsdbErrorCategory::ComputationError,
            Self::AllocationFailure => LsdbErrorCategory::InternalError,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LsdbErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl LsdbErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsdbError {
    kind: ErrorKind,
    placeholder: &'static str,
    message: String,
}

impl LsdbError {
    pub fn new(kind: ErrorKind, placeholder: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DegenerateInput, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, placeholder, message)
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub const fn category(&self) -> LsdbErrorCategory {
        self.kind.category()
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.kind.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category().is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category()
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for LsdbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category().name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for LsdbError {}

macro_rules! impl_from_component_error {
    ($source:ty, $placeholder:expr) => {
        impl From<$source> for LsdbError {
            fn from(error: $source) -> Self {
                Self::new(error.kind(), $placeholder, error.to_string())
            }
        }
    };
}

impl_from_component_error!(super::CurveError, "INPUT.CURVE");
impl_from_component_error!(crate::numerics::InterpolantError, "RUN.INTERPOLANT");
impl_from_component_error!(crate::numerics::MorphError, "RUN.MORPH");
impl_from_component_error!(crate::numerics::BroadeningError, "RUN.BROADENING");
impl_from_component_error!(crate::grid::GridError, "RUN.GRID");
impl_from_component_error!(crate::store::StoreError, "IO.STORE");
impl_from_component_error!(crate::io::TextInputError, "INPUT.XY_TEXT");
impl_from_component_error!(crate::config::ConfigError, "INPUT.CONFIG");

#[cfg(test)]
mod tests {
    use super::{ErrorKind, LsdbError, LsdbErrorCategory};
    use crate::grid::GridError;

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (LsdbErrorCategory::Success, 0, "Success"),
            (
                LsdbErrorCategory::InputValidationError,
                2,
                "InputValidationError",
            ),
            (LsdbErrorCategory::IoSystemError, 3, "IoSystemError"),
            (LsdbErrorCategory::ComputationError, 4, "ComputationError"),
            (LsdbErrorCategory::InternalError, 5, "InternalError"),
        ];

        for (category, exit_code, name) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.name(), name);
        }
    }

    #[test]
    fn error_kinds_fall_into_expected_categories() {
        assert_eq!(
            ErrorKind::NoBracket.category(),
            LsdbErrorCategory::InputValidationError
        );
        assert_eq!(
            ErrorKind::MissingDataset.category(),
            LsdbErrorCategory::IoSystemError
        );
        assert_eq!(
            ErrorKind::EmptyDomain.category(),
            LsdbErrorCategory::ComputationError
        );
        assert_eq!(
            ErrorKind::AllocationFailure.category(),
            LsdbErrorCategory::InternalError
        );
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = LsdbError::input_validation("INPUT.CLI_USAGE", "density must be positive");

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.CLI_USAGE] density must be positive"
        );
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 2")
        );
    }

    #[test]
    fn component_errors_keep_their_kind() {
        let error = LsdbError::from(GridError::NoBracket {
            density: 1.0e17,
            temperature: 2.0,
            missing: "top-left",
        });

        assert_eq!(error.kind(), ErrorKind::NoBracket);
        assert_eq!(error.placeholder(), "RUN.GRID");
        assert!(error.message().contains("top-left"));
    }
}
