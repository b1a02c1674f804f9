//! Sequential cut: consecutive blocks of rows, in file order.

use csv::StringRecord;

use super::Partitioner;
use crate::errors::PipelineError;

/// Gives rows `[i·L, (i+1)·L)` to output `i`; the last output absorbs the
/// remainder. Outputs past the end of the input are left empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialCut;

impl Partitioner for SequentialCut {
    fn split(
        &self,
        rows: Vec<StringRecord>,
        row_limit: usize,
        outputs: usize,
    ) -> Result<Vec<Vec<StringRecord>>, PipelineError> {
        let mut parts: Vec<Vec<StringRecord>> = vec![Vec::new(); outputs];
        let Some(last) = outputs.checked_sub(1) else {
            return Ok(parts);
        };
        for (index, row) in rows.into_iter().enumerate() {
            let target = index.checked_div(row_limit).map_or(last, |block| block.min(last));
            parts[target].push(row);
        }
        Ok(parts)
    }
}
