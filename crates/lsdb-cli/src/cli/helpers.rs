use super::CliError;
use anyhow::Context;
use lsdb_core::common::units::EnergyUnits;
use lsdb_core::domain::LsdbError;
use lsdb_core::io::write_text;
use lsdb_core::store::FileStore;
use std::io::Write;
use std::path::Path;

pub(super) fn core<E: Into<LsdbError>>(error: E) -> CliError {
    CliError::Core(error.into())
}

pub(super) fn open_store(db: &Path) -> Result<FileStore, CliError> {
    FileStore::open(db).map_err(core)
}

/// Writes `content` to `output`, or to stdout when no path is given.
pub(super) fn emit(output: Option<&Path>, content: &str) -> Result<(), CliError> {
    match output {
        Some(path) => write_text(path, content).map_err(core),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write to stdout")?;
            Ok(())
        }
    }
}

pub(super) fn parse_units(value: &str) -> Result<EnergyUnits, String> {
    value.parse()
}

/// Which morph fractions to sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum MorphFrames {
    Single(f64),
    Series(usize),
}

/// `t` in [0, 1] is one fraction; an integer above 2 is a frame count.
pub(super) fn morph_frames(t: f64) -> Result<MorphFrames, CliError> {
    if t > 2.0 && t.fract() == 0.0 && t <= usize::MAX as f64 {
        return Ok(MorphFrames::Series(t as usize));
    }
    if (0.0..=1.0).contains(&t) {
        return Ok(MorphFrames::Single(t));
    }
    Err(CliError::Usage(format!(
        "--t must be in [0, 1] or an integer frame count above 2, got {t}"
    )))
}

#[cfg(test)]
mod tests {
    use super::{MorphFrames, morph_frames};
    use crate::cli::CliError;

    #[test]
    fn fractions_and_frame_counts_are_told_apart() {
        assert_eq!(morph_frames(0.0).expect("fraction"), MorphFrames::Single(0.0));
        assert_eq!(morph_frames(1.0).expect("fraction"), MorphFrames::Single(1.0));
        assert_eq!(morph_frames(0.3).expect("fraction"), MorphFrames::Single(0.3));
        assert_eq!(morph_frames(3.0).expect("frames"), MorphFrames::Series(3));
        assert_eq!(morph_frames(25.0).expect("frames"), MorphFrames::Series(25));
    }

    #[test]
    fn ambiguous_values_are_usage_errors() {
        for t in [2.0, 1.5, 3.5, -0.1, f64::NAN] {
            assert!(
                matches!(morph_frames(t), Err(CliError::Usage(_))),
                "t = {t}"
            );
        }
    }
}
