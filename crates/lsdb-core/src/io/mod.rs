//! Plain-text two-column `x y` curves.
//!
//! Lines starting with `#` and blank lines are skipped. Extra columns after
//! the first two are ignored.

use crate::domain::{Curve, CurveError, ErrorKind};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextInputError {
    #[error("failed to read '{path}': {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to write '{path}': {message}")]
    Write { path: PathBuf, message: String },
    #[error("unparseable line {line}: '{content}'")]
    Unparseable { line: usize, content: String },
    #[error("y must be >= 0 on line {line}, got {value}")]
    NegativeIntensity { line: usize, value: f64 },
    #[error(transparent)]
    Curve(#[from] CurveError),
}

impl TextInputError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } | Self::Write { .. } => ErrorKind::Io,
            Self::Curve(error) => error.kind(),
            _ => ErrorKind::DegenerateInput,
        }
    }
}

pub fn parse_xy(text: &str) -> Result<Curve, TextInputError> {
    let mut x = Vec::new();
    let mut y = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let unparseable = || TextInputError::Unparseable {
            line: index + 1,
            content: raw.to_string(),
        };
        let mut columns = line.split_whitespace();
        let xi = parse_column(columns.next()).ok_or_else(unparseable)?;
        let yi = parse_column(columns.next()).ok_or_else(unparseable)?;
        if yi < 0.0 {
            return Err(TextInputError::NegativeIntensity {
                line: index + 1,
                value: yi,
            });
        }

        x.push(xi);
        y.push(yi);
    }

    Ok(Curve::new(x, y)?)
}

fn parse_column(column: Option<&str>) -> Option<f64> {
    column?.parse::<f64>().ok()
}

pub fn read_xy(path: &Path) -> Result<Curve, TextInputError> {
    let text = fs::read_to_string(path).map_err(|source| TextInputError::Read {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    parse_xy(&text)
}

pub fn format_xy(curve: &Curve) -> String {
    let mut output = String::new();
    for (x, y) in curve.points() {
        let _ = writeln!(output, "{x} {y}");
    }
    output
}

/// Formats a sequence of curves as consecutive `x y` blocks separated by a
/// single blank line.
pub fn format_series<'a>(curves: impl IntoIterator<Item = &'a Curve>) -> String {
    let blocks: Vec<String> = curves.into_iter().map(format_xy).collect();
    blocks.join("\n")
}

pub fn write_text(path: &Path, content: &str) -> Result<(), TextInputError> {
    fs::write(path, content).map_err(|source| TextInputError::Write {
        path: path.to_path_buf(),
        message: source.to_string(),
    })
}
