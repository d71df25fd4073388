use super::constants::{AU_TO_EV, EV_TO_INV_CM};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Energy units a line position may be recorded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnergyUnits {
    #[default]
    InvCm,
    Ev,
    Au,
}

impl EnergyUnits {
    pub const ALL: [Self; 3] = [Self::InvCm, Self::Ev, Self::Au];

    pub const fn label(self) -> &'static str {
        match self {
            Self::InvCm => "1/cm",
            Self::Ev => "eV",
            Self::Au => "a.u.",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::InvCm => "inv-cm",
            Self::Ev => "ev",
            Self::Au => "au",
        }
    }

    const fn in_ev(self) -> f64 {
        match self {
            Self::InvCm => 1.0 / EV_TO_INV_CM,
            Self::Ev => 1.0,
            Self::Au => AU_TO_EV,
        }
    }
}

impl Display for EnergyUnits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EnergyUnits {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inv-cm" | "1/cm" | "cm-1" => Ok(Self::InvCm),
            "ev" => Ok(Self::Ev),
            "au" | "a.u." => Ok(Self::Au),
            other => Err(format!(
                "unknown energy units '{other}' (expected inv-cm, ev or au)"
            )),
        }
    }
}

/// Factor turning a value expressed in `from` units into `to` units.
pub fn conversion_factor(from: EnergyUnits, to: EnergyUnits) -> f64 {
    if from == to {
        return 1.0;
    }
    from.in_ev() / to.in_ev()
}
