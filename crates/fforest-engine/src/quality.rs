//! Quality phase: one score per tree per norm.

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;
use fforest_types::{Dialect, QualityComputingMethod, RunState};

use crate::construction::artifacts::{format_float, read_vector, StoredMembershipTable};
use crate::errors::PipelineError;
use crate::phase::{layout, parameters};
use crate::reduction::{forest_memberships, require_forest_artifacts};
use crate::table;

pub const KEY_ID_TREE: &str = "ID_tree";
pub const KEY_QUALITY: &str = "quality";

/// Quality of one tree: the mean, over the reference instances, of the
/// instance difficulty times the membership the tree gave its true class.
///
/// # Errors
///
/// Returns an error when an instance of the tree has no difficulty.
pub fn kappa_rifqi_marsala(
    difficulty: &HashMap<String, f64>,
    memberships: &StoredMembershipTable,
) -> Result<f64, PipelineError> {
    let degrees = memberships.true_class_degrees();
    if degrees.is_empty() {
        return Ok(0.0);
    }
    let mut score = 0.0;
    for (id, degree) in &degrees {
        let weight = difficulty.get(id).ok_or_else(|| {
            PipelineError::infrastructure(format!("instance '{id}' has no difficulty"))
        })?;
        score += weight * degree;
    }
    let instances = f64::from(u32::try_from(degrees.len()).unwrap_or(u32::MAX));
    Ok(score / instances)
}

/// Quality of every tree for `norm`, in tree order.
///
/// # Errors
///
/// Returns missing artifacts and I/O failures.
pub fn tree_qualities(
    method: QualityComputingMethod,
    forest: &[(String, StoredMembershipTable)],
    difficulty: &HashMap<String, f64>,
) -> Result<Vec<(String, f64)>, PipelineError> {
    forest
        .iter()
        .map(|(tree, memberships)| {
            let quality = match method {
                QualityComputingMethod::KappaRifqiMarsala => {
                    kappa_rifqi_marsala(difficulty, memberships)?
                }
            };
            Ok((tree.clone(), quality))
        })
        .collect()
}

/// Read a quality file written by this phase.
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] and I/O failures.
pub fn read_quality_file(path: &Path, dialect: &Dialect) -> Result<Vec<(String, f64)>, PipelineError> {
    crate::construction::artifacts::ensure_exists(path)?;
    let stored = table::read_table(path, dialect, true)?;
    stored
        .rows
        .iter()
        .map(|record| {
            let tree = table::field(record, 0)?.to_string();
            let raw = table::field(record, 1)?;
            let quality = raw.trim().parse().map_err(|_| {
                PipelineError::infrastructure(format!(
                    "invalid quality '{raw}' in {}",
                    path.display()
                ))
            })?;
            Ok((tree, quality))
        })
        .collect()
}

/// Execute the quality phase.
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] when a tree artifact or a
/// difficulty vector is missing, and I/O failures.
pub fn execute(state: &RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;
    require_forest_artifacts(layout)?;
    let dialect = &params.dialect_output;

    for norm in &state.norms {
        let (Some(difficulty_path), Some(quality_path)) = (
            layout.difficulty_vectors.get(norm),
            layout.quality_files.get(norm),
        ) else {
            return Err(PipelineError::infrastructure(format!(
                "no difficulty or quality path for norm '{norm}'"
            )));
        };
        let difficulty: HashMap<String, f64> =
            read_vector(difficulty_path, dialect)?.into_iter().collect();
        let forest = forest_memberships(layout, dialect, norm)?;
        let qualities = tree_qualities(params.quality_computing_method, &forest, &difficulty)?;

        let header = StringRecord::from(vec![KEY_ID_TREE, KEY_QUALITY]);
        let rows = qualities
            .iter()
            .map(|(tree, quality)| [tree.clone(), format_float(*quality)]);
        table::write_table(quality_path, dialect, Some(&header), rows)?;

        tracing::info!(
            norm,
            method = %params.quality_computing_method,
            trees = qualities.len(),
            path = %quality_path.display(),
            "Tree qualities written"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::artifacts::MembershipRow;

    fn memberships(rows: &[(&str, f64)]) -> StoredMembershipTable {
        StoredMembershipTable {
            classes: vec!["A".into()],
            rows: rows
                .iter()
                .map(|(id, degree)| MembershipRow {
                    id: (*id).into(),
                    true_class: "A".into(),
                    degrees: vec![*degree],
                })
                .collect(),
        }
    }

    #[test]
    fn quality_weights_membership_by_difficulty() {
        let difficulty = HashMap::from([("0".to_string(), 1.0), ("1".to_string(), 0.5)]);
        let tree = memberships(&[("0", 0.5), ("1", 1.0)]);
        // (1.0 * 0.5 + 0.5 * 1.0) / 2
        assert_eq!(kappa_rifqi_marsala(&difficulty, &tree).unwrap(), 0.5);
    }

    #[test]
    fn instance_without_difficulty_is_an_error() {
        let difficulty = HashMap::from([("0".to_string(), 1.0)]);
        let tree = memberships(&[("0", 0.5), ("7", 1.0)]);
        assert!(kappa_rifqi_marsala(&difficulty, &tree).is_err());
    }

    #[test]
    fn one_score_per_tree_in_order() {
        let difficulty = HashMap::from([("0".to_string(), 1.0)]);
        let forest = vec![
            ("t1".to_string(), memberships(&[("0", 0.25)])),
            ("t2".to_string(), memberships(&[("0", 1.0)])),
        ];
        let qualities = tree_qualities(
            QualityComputingMethod::KappaRifqiMarsala,
            &forest,
            &difficulty,
        )
        .unwrap();
        assert_eq!(qualities, [("t1".to_string(), 0.25), ("t2".to_string(), 1.0)]);
    }

    #[test]
    fn quality_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quality_classic.csv");
        std::fs::write(&path, "ID_tree,quality\nsubsubtrain_1,0.75\n").unwrap();
        let qualities = read_quality_file(&path, &Dialect::default()).unwrap();
        assert_eq!(qualities, [("subsubtrain_1".to_string(), 0.75)]);
    }
}
