use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The measurement unit system requested from the API.
///
/// Serialised with the single-letter API codes (`m`, `e`), which are also used
/// in dataset file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Units {
    #[serde(rename = "m")]
    Metric,
    #[serde(rename = "e")]
    Imperial,
}

impl Units {
    /// The `units` query parameter value.
    pub fn code(&self) -> &'static str {
        match self {
            Units::Metric => "m",
            Units::Imperial => "e",
        }
    }

    /// The name the history API nests unit-dependent measurements under.
    pub fn text(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    /// Column prefix stripped from flattened history observations, e.g. `metric.`.
    pub(crate) fn column_prefix(&self) -> String {
        format!("{}.", self.text())
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" | "metric" => Ok(Units::Metric),
            "e" | "imperial" => Ok(Units::Imperial),
            other => Err(format!("unknown units '{other}', expected 'm' or 'e'")),
        }
    }
}
