//! Class-stratified cut: every output keeps the class proportions of the
//! input, up to rounding.

use std::collections::HashMap;

use csv::StringRecord;

use super::{as_f64, round_to_count, Partitioner};
use crate::errors::PipelineError;
use crate::table;

/// Groups rows by the value of `class_column` (in order of first
/// appearance) and gives each output but the last
/// `round(group_size × L / total_rows)` rows of every group.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedCut {
    pub class_column: usize,
}

impl StratifiedCut {
    fn group(&self, rows: Vec<StringRecord>) -> Result<Vec<(String, Vec<StringRecord>)>, PipelineError> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<StringRecord>)> = Vec::new();
        for row in rows {
            let class = table::field(&row, self.class_column)?.to_string();
            let position = *positions.entry(class.clone()).or_insert_with(|| {
                groups.push((class, Vec::new()));
                groups.len() - 1
            });
            groups[position].1.push(row);
        }
        Ok(groups)
    }
}

impl Partitioner for StratifiedCut {
    fn split(
        &self,
        rows: Vec<StringRecord>,
        row_limit: usize,
        outputs: usize,
    ) -> Result<Vec<Vec<StringRecord>>, PipelineError> {
        let mut parts: Vec<Vec<StringRecord>> = vec![Vec::new(); outputs];
        if outputs == 0 {
            return Ok(parts);
        }
        let total_rows = rows.len();
        if total_rows == 0 {
            return Ok(parts);
        }

        for (class, group) in self.group(rows)? {
            let available = group.len();
            let rows_to_give =
                round_to_count(as_f64(available) * as_f64(row_limit) / as_f64(total_rows));
            if rows_to_give.saturating_mul(outputs - 1) > available {
                return Err(PipelineError::TooManyPartitionsToSplit {
                    class,
                    outputs,
                    rows_to_give,
                    available,
                });
            }

            let mut remaining = group.into_iter();
            for part in parts.iter_mut().take(outputs - 1) {
                part.extend(remaining.by_ref().take(rows_to_give));
            }
            parts[outputs - 1].extend(remaining);
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(classes: &[&str]) -> Vec<StringRecord> {
        classes
            .iter()
            .enumerate()
            .map(|(i, class)| StringRecord::from(vec![i.to_string(), (*class).to_string()]))
            .collect()
    }

    fn class_count(part: &[StringRecord], class: &str) -> usize {
        part.iter().filter(|r| &r[1] == class).count()
    }

    #[test]
    fn ten_rows_two_classes_half_split() {
        let rows = labelled(&["A", "A", "B", "A", "B", "A", "A", "B", "A", "B"]);
        let parts = StratifiedCut { class_column: 1 }.split(rows, 5, 2).unwrap();

        assert_eq!(class_count(&parts[0], "A"), 3);
        assert_eq!(class_count(&parts[0], "B"), 2);
        assert_eq!(class_count(&parts[1], "A"), 3);
        assert_eq!(class_count(&parts[1], "B"), 2);
        assert_eq!(parts[0].len() + parts[1].len(), 10);
    }

    #[test]
    fn rows_keep_their_order_within_a_class() {
        let rows = labelled(&["A", "B", "A", "B", "A", "B"]);
        let parts = StratifiedCut { class_column: 1 }.split(rows, 3, 2).unwrap();
        let first: Vec<&str> = parts[0].iter().map(|r| r.get(0).unwrap()).collect();
        // round(3 * 3 / 6) = round(1.5) = 2 rows per class
        assert_eq!(first, ["0", "2", "1", "3"]);
    }

    #[test]
    fn exhausted_class_is_an_error() {
        let rows = labelled(&["A", "A", "A", "A", "B"]);
        let err = StratifiedCut { class_column: 1 }
            .split(rows, 4, 3)
            .unwrap_err();
        match err {
            PipelineError::TooManyPartitionsToSplit {
                class,
                outputs,
                rows_to_give,
                available,
            } => {
                assert_eq!(class, "A");
                assert_eq!(outputs, 3);
                assert_eq!(rows_to_give, 3);
                assert_eq!(available, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_row_is_reported() {
        let rows = vec![StringRecord::from(vec!["0"])];
        assert!(matches!(
            StratifiedCut { class_column: 1 }.split(rows, 1, 2),
            Err(PipelineError::ColumnOutOfBounds { index: 1, columns: 1 })
        ));
    }
}
