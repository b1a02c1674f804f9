//! Reduce phase: one difficulty vector per norm.
//!
//! The difficulty of a reference instance is the mean, over every tree of
//! the forest, of the membership degree the tree gave the instance's true
//! class.

use std::collections::HashMap;

use fforest_types::{Dialect, RunLayout, RunState};

use crate::construction::artifacts::{
    self, format_float, read_membership_table, StoredMembershipTable,
};
use crate::errors::PipelineError;
use crate::phase::{layout, parameters};
use crate::table;

/// Distance below which an accumulated value is snapped to the nearest
/// integer.
pub const INTEGER_EPSILON: f64 = 2e-16;

/// `value` rounded to the nearest integer when it lies within
/// [`INTEGER_EPSILON`] of it, unchanged otherwise.
#[must_use]
pub fn snap_to_integer(value: f64) -> f64 {
    let rounded = value.round();
    if (rounded - value).abs() < INTEGER_EPSILON {
        rounded
    } else {
        value
    }
}

/// Fail with [`PipelineError::MissingArtifact`] unless every tree has both
/// artifacts of every norm.
///
/// # Errors
///
/// Returns the first missing artifact.
pub fn require_forest_artifacts(layout: &RunLayout) -> Result<(), PipelineError> {
    for path in crate::construction::expected_artifacts(&layout.trees) {
        artifacts::ensure_exists(path)?;
    }
    Ok(())
}

/// Membership tables of every tree for `norm`, in tree order.
pub(crate) fn forest_memberships(
    layout: &RunLayout,
    dialect: &Dialect,
    norm: &str,
) -> Result<Vec<(String, StoredMembershipTable)>, PipelineError> {
    layout
        .trees
        .iter()
        .map(|tree| {
            let path = tree.membership_tables.get(norm).ok_or_else(|| {
                PipelineError::infrastructure(format!(
                    "no membership table for norm '{norm}' in tree {}",
                    tree.name
                ))
            })?;
            Ok((tree.name.clone(), read_membership_table(path, dialect)?))
        })
        .collect()
}

/// Difficulty of every reference instance, in the row order of the first
/// tree.
///
/// # Errors
///
/// Returns an error when the trees do not cover the same instances.
pub fn difficulty_vector(
    forest: &[(String, StoredMembershipTable)],
) -> Result<Vec<(String, f64)>, PipelineError> {
    let Some((_, first)) = forest.first() else {
        return Ok(Vec::new());
    };
    let trees = f64::from(u32::try_from(forest.len()).unwrap_or(u32::MAX));

    let mut order = Vec::with_capacity(first.rows.len());
    let mut sums: HashMap<String, f64> = HashMap::with_capacity(first.rows.len());
    for (id, _) in first.true_class_degrees() {
        sums.insert(id.clone(), 0.0);
        order.push(id);
    }

    for (tree, table) in forest {
        let degrees = table.true_class_degrees();
        if degrees.len() != order.len() {
            return Err(PipelineError::infrastructure(format!(
                "tree {tree} reports {} instances, expected {}",
                degrees.len(),
                order.len()
            )));
        }
        for (id, degree) in degrees {
            let sum = sums.get_mut(&id).ok_or_else(|| {
                PipelineError::infrastructure(format!(
                    "instance '{id}' of tree {tree} is unknown to the other trees"
                ))
            })?;
            *sum += degree;
        }
    }

    // Dividing once keeps a forest of degrees in [0, 1] inside [0, 1].
    Ok(order
        .into_iter()
        .map(|id| {
            let value = sums.get(&id).copied().unwrap_or(0.0) / trees;
            (id, snap_to_integer(value))
        })
        .collect())
}

/// Execute the reduce phase.
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] when any tree lacks an
/// artifact, and I/O failures.
pub fn execute(state: &RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;
    require_forest_artifacts(layout)?;

    for norm in &state.norms {
        let forest = forest_memberships(layout, &params.dialect_output, norm)?;
        let vector = difficulty_vector(&forest)?;
        let path = layout.difficulty_vectors.get(norm).ok_or_else(|| {
            PipelineError::infrastructure(format!("no difficulty vector path for norm '{norm}'"))
        })?;
        let rows = vector
            .iter()
            .map(|(id, difficulty)| [id.clone(), format_float(*difficulty)]);
        table::write_table(path, &params.dialect_output, None, rows)?;

        tracing::info!(
            norm,
            instances = vector.len(),
            path = %path.display(),
            "Difficulty vector written"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::artifacts::MembershipRow;

    fn table(rows: &[(&str, &str, f64)]) -> StoredMembershipTable {
        StoredMembershipTable {
            classes: vec!["A".into(), "B".into()],
            rows: rows
                .iter()
                .map(|(id, class, degree)| MembershipRow {
                    id: (*id).into(),
                    true_class: (*class).into(),
                    degrees: if *class == "A" {
                        vec![*degree, 1.0 - degree]
                    } else {
                        vec![1.0 - degree, *degree]
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn values_within_epsilon_snap_to_integer() {
        assert_eq!(snap_to_integer(0.999_999_999_999_999_9), 1.0);
        assert_eq!(snap_to_integer(0.999_999_999_999_999_8), 0.999_999_999_999_999_8);
        assert_eq!(snap_to_integer(0.5), 0.5);
    }

    #[test]
    fn difficulty_is_the_mean_true_class_membership() {
        let forest = vec![
            ("t1".to_string(), table(&[("0", "A", 1.0), ("1", "B", 0.5)])),
            ("t2".to_string(), table(&[("0", "A", 1.0), ("1", "B", 0.0)])),
        ];
        let vector = difficulty_vector(&forest).unwrap();
        assert_eq!(vector, [("0".to_string(), 1.0), ("1".to_string(), 0.25)]);
    }

    #[test]
    fn ten_full_memberships_give_exactly_one() {
        let forest: Vec<_> = (0..10)
            .map(|i| (format!("t{i}"), table(&[("0", "A", 1.0)])))
            .collect();
        let vector = difficulty_vector(&forest).unwrap();
        assert_eq!(vector[0].1, 1.0);
    }

    #[test]
    fn trees_disagreeing_on_instances_are_rejected() {
        let forest = vec![
            ("t1".to_string(), table(&[("0", "A", 1.0)])),
            ("t2".to_string(), table(&[("9", "A", 1.0)])),
        ];
        assert!(difficulty_vector(&forest).is_err());
    }

    proptest::proptest! {
        #[test]
        fn difficulty_stays_within_unit_interval(
            forest in proptest::collection::vec(
                proptest::collection::vec((proptest::bool::ANY, 0.0f64..=1.0), 6),
                1..40,
            ),
        ) {
            let forest: Vec<(String, StoredMembershipTable)> = forest
                .iter()
                .enumerate()
                .map(|(tree, instances)| {
                    let rows: Vec<(String, &str, f64)> = instances
                        .iter()
                        .enumerate()
                        .map(|(id, (is_a, degree))| {
                            (id.to_string(), if *is_a { "A" } else { "B" }, *degree)
                        })
                        .collect();
                    let borrowed: Vec<(&str, &str, f64)> = rows
                        .iter()
                        .map(|(id, class, degree)| (id.as_str(), *class, *degree))
                        .collect();
                    (format!("t{tree}"), table(&borrowed))
                })
                .collect();

            let vector = difficulty_vector(&forest).unwrap();

            proptest::prop_assert_eq!(vector.len(), 6);
            for (id, difficulty) in vector {
                proptest::prop_assert!(
                    (0.0..=1.0).contains(&difficulty),
                    "instance {} has difficulty {}",
                    id,
                    difficulty
                );
            }
        }
    }
}
