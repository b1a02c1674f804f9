//! Closed sets of algorithm choices selected once at configuration time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $canonical:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $canonical $(, alias = $alias)*)]
                $variant,
            )+
        }

        impl $name {
            /// Canonical lowercase name.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $canonical, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $( $canonical $(| $alias)* => Ok(Self::$variant), )+
                    _ => Err(ParseEnumError::new($kind, s, &[$($canonical),+])),
                }
            }
        }
    };
}

named_enum! {
    /// Strategy used to cut one table into several.
    SplittingMethod, "splitting method" {
        /// Consecutive blocks of rows, in file order.
        Sequential => "sequential" | "halfing",
        /// Per-class shares so each output keeps the class proportions.
        Stratified => "stratified" | "keep_distribution",
    }
}

named_enum! {
    /// Entropy measure requested from the tree builder.
    EntropyMeasure, "entropy measure" {
        Shannon => "shannon",
    }
}

named_enum! {
    /// How a tree's quality score is derived from the difficulty vectors.
    QualityComputingMethod, "quality computing method" {
        /// Mean of `difficulty × true-class membership` over reference instances.
        KappaRifqiMarsala => "kappa_rifqi_marsala" | "kapparifqimarsala",
    }
}

named_enum! {
    /// How trees are grouped after quality evaluation.
    ClusteringTreesMethod, "clustering trees method" {
        Hypersphere => "hypersphere",
    }
}

named_enum! {
    /// File format of the tables written by the pipeline.
    TableFormat, "table format" {
        Csv => "csv",
    }
}

named_enum! {
    /// Amount of user feedback printed during a run.
    Verbosity, "verbosity" {
        Quiet => "quiet",
        Normal => "normal",
        Verbose => "verbose",
    }
}

impl TableFormat {
    /// File extension, without the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
        }
    }
}

impl Verbosity {
    /// Default log filter for this verbosity.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitting_method_accepts_legacy_names() {
        assert_eq!(
            "halfing".parse::<SplittingMethod>().unwrap(),
            SplittingMethod::Sequential
        );
        assert_eq!(
            "Keep_Distribution".parse::<SplittingMethod>().unwrap(),
            SplittingMethod::Stratified
        );
    }

    #[test]
    fn unknown_entropy_measure_is_rejected() {
        let err = "gini".parse::<EntropyMeasure>().unwrap_err();
        assert_eq!(err.kind, "entropy measure");
        assert_eq!(err.expected, "shannon");
    }

    #[test]
    fn serde_roundtrip_restores_variant_from_its_name() {
        let json = serde_json::to_string(&QualityComputingMethod::KappaRifqiMarsala).unwrap();
        assert_eq!(json, "\"kappa_rifqi_marsala\"");
        let back: QualityComputingMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, QualityComputingMethod::KappaRifqiMarsala);

        let legacy: SplittingMethod = serde_json::from_str("\"keep_distribution\"").unwrap();
        assert_eq!(legacy, SplittingMethod::Stratified);
    }

    #[test]
    fn verbosity_maps_to_log_levels() {
        assert_eq!(Verbosity::Quiet.log_level(), "warn");
        assert_eq!(Verbosity::Verbose.log_level(), "debug");
    }
}
