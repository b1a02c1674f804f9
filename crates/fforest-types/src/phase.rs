//! Pipeline phases, in execution order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// One stage of the experiment pipeline.
///
/// Phases are totally ordered by [`Phase::rank`]; the pipeline always moves
/// from a phase to its immediate successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[serde(alias = "parsing")]
    Parse,
    #[serde(alias = "preprocessing")]
    Preprocess,
    InitialSplit,
    ReferenceSplit,
    SubsubtrainSplit,
    #[serde(alias = "learning")]
    Construct,
    #[serde(alias = "reduction")]
    Reduce,
    Quality,
    #[serde(alias = "classes_matrices")]
    ClassMatrices,
    #[serde(alias = "clustering_trees")]
    ClusterTrees,
    #[serde(alias = "ending")]
    End,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Phase; 11] = [
        Phase::Parse,
        Phase::Preprocess,
        Phase::InitialSplit,
        Phase::ReferenceSplit,
        Phase::SubsubtrainSplit,
        Phase::Construct,
        Phase::Reduce,
        Phase::Quality,
        Phase::ClassMatrices,
        Phase::ClusterTrees,
        Phase::End,
    ];

    /// Position of the phase in the pipeline, starting at 0 for `Parse`.
    #[must_use]
    pub fn rank(self) -> usize {
        self as usize
    }

    /// The immediate successor, or `None` once `End` is reached.
    #[must_use]
    pub fn next(self) -> Option<Phase> {
        Self::ALL.get(self.rank() + 1).copied()
    }

    /// Canonical snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Preprocess => "preprocess",
            Self::InitialSplit => "initial_split",
            Self::ReferenceSplit => "reference_split",
            Self::SubsubtrainSplit => "subsubtrain_split",
            Self::Construct => "construct",
            Self::Reduce => "reduce",
            Self::Quality => "quality",
            Self::ClassMatrices => "class_matrices",
            Self::ClusterTrees => "cluster_trees",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let phase = match s.trim().to_ascii_lowercase().as_str() {
            "parse" | "parsing" => Self::Parse,
            "preprocess" | "preprocessing" => Self::Preprocess,
            "initial_split" => Self::InitialSplit,
            "reference_split" => Self::ReferenceSplit,
            "subsubtrain_split" => Self::SubsubtrainSplit,
            "construct" | "learning" => Self::Construct,
            "reduce" | "reduction" => Self::Reduce,
            "quality" => Self::Quality,
            "class_matrices" | "classes_matrices" => Self::ClassMatrices,
            "cluster_trees" | "clustering_trees" => Self::ClusterTrees,
            "end" | "ending" => Self::End,
            _ => {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                return Err(ParseEnumError::new("phase", s, &names));
            }
        };
        Ok(phase)
    }
}
