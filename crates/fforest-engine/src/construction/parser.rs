//! Parser for the tree builder's standard output.
//!
//! The builder prints one whitespace-separated record per (norm, instance):
//!
//! ```text
//! <ignored> <norm id> <instance id> <true class> [<class> <membership>]...
//! ```
//!
//! Records come in chunks of one record per evaluated norm. Tokens may be
//! wrapped in quotes.

use std::collections::{BTreeMap, HashMap};

use fforest_types::norm_name;

/// Memberships found by one tree for one reference instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMemberships {
    pub id: String,
    pub true_class: String,
    /// Candidate classes per norm name, in the order the builder printed
    /// them.
    pub per_norm: BTreeMap<String, Vec<(String, f64)>>,
}

impl InstanceMemberships {
    /// Membership degree of `class` under `norm`, if the tree reported one.
    #[must_use]
    pub fn degree(&self, norm: &str, class: &str) -> Option<f64> {
        self.per_norm
            .get(norm)?
            .iter()
            .find(|(candidate, _)| candidate == class)
            .map(|(_, degree)| *degree)
    }

    /// Whether the class with the highest membership under `norm` is the
    /// true class. The first maximum wins ties; a norm without candidates
    /// counts as a misclassification.
    #[must_use]
    pub fn is_correctly_classified(&self, norm: &str) -> bool {
        let Some(candidates) = self.per_norm.get(norm) else {
            return false;
        };
        let mut best: Option<&(String, f64)> = None;
        for candidate in candidates {
            if best.map_or(true, |(_, degree)| candidate.1 > *degree) {
                best = Some(candidate);
            }
        }
        best.is_some_and(|(class, _)| *class == self.true_class)
    }
}

/// Every instance reported by one tree, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipTable {
    instances: Vec<InstanceMemberships>,
    index: HashMap<String, usize>,
}

impl MembershipTable {
    #[must_use]
    pub fn instances(&self) -> &[InstanceMemberships] {
        &self.instances
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&InstanceMemberships> {
        self.index.get(id).map(|position| &self.instances[*position])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn insert(&mut self, record: Record) {
        let position = match self.index.get(&record.id).copied() {
            Some(position) => position,
            None => {
                self.index.insert(record.id.clone(), self.instances.len());
                self.instances.push(InstanceMemberships {
                    id: record.id,
                    true_class: record.true_class.clone(),
                    per_norm: BTreeMap::new(),
                });
                self.instances.len() - 1
            }
        };
        let instance = &mut self.instances[position];
        instance.true_class = record.true_class;
        let candidates = instance.per_norm.entry(record.norm).or_default();
        for (class, degree) in record.candidates {
            match candidates.iter_mut().find(|(known, _)| *known == class) {
                Some(existing) => existing.1 = degree,
                None => candidates.push((class, degree)),
            }
        }
    }
}

struct Record {
    norm: String,
    id: String,
    true_class: String,
    candidates: Vec<(String, f64)>,
}

fn unquote(token: &str) -> &str {
    token.trim_matches(|c| c == '"' || c == '\'')
}

fn parse_record(line: &str) -> Result<Record, String> {
    let tokens: Vec<&str> = line.split_whitespace().map(unquote).collect();
    let [_, norm, id, true_class, rest @ ..] = tokens.as_slice() else {
        return Err(format!("expected at least 4 fields, found {}", tokens.len()));
    };
    if rest.len() % 2 != 0 {
        return Err(format!(
            "candidate classes must come in (class, membership) pairs, found {} tokens",
            rest.len()
        ));
    }
    let norm_id: u32 = norm
        .parse()
        .map_err(|_| format!("invalid norm id '{norm}'"))?;

    let mut candidates = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks_exact(2) {
        let degree: f64 = pair[1]
            .parse()
            .map_err(|_| format!("invalid membership '{}' for class '{}'", pair[1], pair[0]))?;
        candidates.push((pair[0].to_string(), degree));
    }

    Ok(Record {
        norm: norm_name(norm_id),
        id: (*id).to_string(),
        true_class: (*true_class).to_string(),
        candidates,
    })
}

/// Parse the builder output into a [`MembershipTable`].
///
/// `norm_count` is the chunk size. Blank lines are skipped. A short or
/// malformed final chunk is dropped with a warning; a malformed record in any
/// earlier chunk is an error.
///
/// # Errors
///
/// Returns a description of the first malformed record, or of an output that
/// holds no record at all.
pub fn parse_tree_output(output: &str, norm_count: usize) -> Result<MembershipTable, String> {
    let lines: Vec<(usize, &str)> = output
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();
    let chunk_size = norm_count.max(1);
    let chunk_count = lines.len().div_ceil(chunk_size);

    let mut table = MembershipTable::default();
    for (chunk_index, chunk) in lines.chunks(chunk_size).enumerate() {
        let is_last = chunk_index + 1 == chunk_count;
        let parsed: Result<Vec<Record>, String> = chunk
            .iter()
            .map(|(number, line)| {
                parse_record(line).map_err(|reason| format!("line {}: {reason}", number + 1))
            })
            .collect();

        match parsed {
            Ok(records) if chunk.len() == chunk_size || !is_last => {
                for record in records {
                    table.insert(record);
                }
            }
            Ok(_) => {
                tracing::warn!(
                    records = chunk.len(),
                    expected = chunk_size,
                    "Ignoring incomplete trailing chunk of tree builder output"
                );
            }
            Err(reason) if is_last => {
                tracing::warn!(
                    reason = %reason,
                    "Ignoring malformed trailing chunk of tree builder output"
                );
            }
            Err(reason) => return Err(reason),
        }
    }

    if table.is_empty() {
        return Err("no instance record found".to_string());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NORMS: &str = "\
1 0 \"7\" \"yes\" \"yes\" 0.75 \"no\" 0.25
1 1 \"7\" \"yes\" \"yes\" 0.6 \"no\" 0.4
1 0 \"9\" \"no\" \"yes\" 0.5 \"no\" 0.5
1 1 \"9\" \"no\" \"yes\" 0.2 \"no\" 0.8
";

    #[test]
    fn two_norms_two_instances() {
        let table = parse_tree_output(TWO_NORMS, 2).unwrap();

        assert_eq!(table.len(), 2);
        let ids: Vec<&str> = table.instances().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["7", "9"]);

        let seven = table.get("7").unwrap();
        assert_eq!(seven.true_class, "yes");
        assert_eq!(seven.per_norm.len(), 2);
        assert_eq!(seven.degree("classic", "yes"), Some(0.75));
        assert_eq!(seven.degree("zadeh", "no"), Some(0.4));

        let nine = table.get("9").unwrap();
        assert_eq!(nine.true_class, "no");
        assert_eq!(nine.per_norm.len(), 2);
    }

    #[test]
    fn trailing_garbage_chunk_is_ignored() {
        let output = format!("{TWO_NORMS}\n1 0\n");
        let table = parse_tree_output(&output, 2).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn malformed_record_before_the_end_is_an_error() {
        let output = "1 0 a yes yes 0.5\n1 1 a yes yes oops\n1 0 b no no 1.0\n1 1 b no no 1.0\n";
        let err = parse_tree_output(output, 2).unwrap_err();
        assert!(err.contains("line 2"), "got: {err}");
        assert!(err.contains("oops"), "got: {err}");
    }

    #[test]
    fn empty_output_is_rejected() {
        assert!(parse_tree_output("\n\n", 3).is_err());
    }

    #[test]
    fn first_maximum_wins_ties() {
        let table = parse_tree_output(TWO_NORMS, 2).unwrap();
        let seven = table.get("7").unwrap();
        let nine = table.get("9").unwrap();

        assert!(seven.is_correctly_classified("classic"));
        // 0.5 / 0.5 tie: "yes" comes first, true class is "no".
        assert!(!nine.is_correctly_classified("classic"));
        assert!(nine.is_correctly_classified("zadeh"));
    }

    #[test]
    fn missing_norm_or_candidates_count_as_incorrect() {
        let table = parse_tree_output("1 0 a yes\n", 1).unwrap();
        let instance = table.get("a").unwrap();
        assert!(!instance.is_correctly_classified("classic"));
        assert!(!instance.is_correctly_classified("luka"));
    }

    #[test]
    fn single_quotes_are_stripped() {
        let table = parse_tree_output("x 0 'a' 'yes' 'yes' 1.0\n", 1).unwrap();
        assert_eq!(table.get("a").unwrap().degree("classic", "yes"), Some(1.0));
    }
}
