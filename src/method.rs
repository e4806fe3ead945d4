//! Query methods under comparison and the preprocessing knobs they accept.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// A shortest-path query strategy understood by the external executables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Dijkstra,
    Astar,
    Ch,
    Tnr,
    Tnraf,
    Dm,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Dijkstra,
        Method::Astar,
        Method::Ch,
        Method::Tnr,
        Method::Tnraf,
        Method::Dm,
    ];

    /// Value passed to `-m`.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Dijkstra => "dijkstra",
            Method::Astar => "astar",
            Method::Ch => "ch",
            Method::Tnr => "tnr",
            Method::Tnraf => "tnraf",
            Method::Dm => "dm",
        }
    }

    /// Default row label in the comparison table.
    pub fn label(self) -> &'static str {
        match self {
            Method::Dijkstra => "Dijkstra",
            Method::Astar => "A*",
            Method::Ch => "CH",
            Method::Tnr => "TNR",
            Method::Tnraf => "TNRAF",
            Method::Dm => "DM",
        }
    }

    /// Exact searches run straight on the graph input; everything else needs a
    /// structure from the preprocessor.
    pub fn requires_preprocessing(self) -> bool {
        !matches!(self, Method::Dijkstra | Method::Astar)
    }

    /// Extension the preprocessor appends to the output prefix. Distance
    /// matrices depend on the chosen [`OutputFormat`] instead.
    pub fn structure_extension(self) -> Option<&'static str> {
        match self {
            Method::Ch => Some("ch"),
            Method::Tnr => Some("tnrg"),
            Method::Tnraf => Some("tgaf"),
            Method::Dijkstra | Method::Astar | Method::Dm => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HarnessError::Config(format!("unknown method '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessingMode {
    Fast,
    Slow,
    /// Transit-node variants computed through a full distance matrix.
    Dm,
}

impl PreprocessingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PreprocessingMode::Fast => "fast",
            PreprocessingMode::Slow => "slow",
            PreprocessingMode::Dm => "dm",
        }
    }
}

/// On-disk encoding of a distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Hdf,
    Xdm,
    Csv,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Hdf => "hdf",
            OutputFormat::Xdm => "xdm",
            OutputFormat::Csv => "csv",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Hdf => "hdf5",
            OutputFormat::Xdm => "xdm",
            OutputFormat::Csv => "csv",
        }
    }
}
