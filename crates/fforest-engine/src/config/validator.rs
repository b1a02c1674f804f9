//! Semantic validation for parsed experiment configuration values.

use fforest_types::{Dialect, SplittingMethod};

use crate::config::types::{ExperimentConfig, NamesConfig};
use crate::errors::PipelineError;
use crate::partition::RowLimit;

fn validate_dialect(dialect: &Dialect, context: &str, errors: &mut Vec<String>) {
    if !dialect.is_utf8_compatible() {
        errors.push(format!(
            "{context}: unsupported encoding '{}' (only utf8 and ascii are supported)",
            dialect.encoding
        ));
    }
    if !dialect.delimiter.is_ascii() {
        errors.push(format!(
            "{context}: delimiter '{}' must be a single ASCII character",
            dialect.delimiter
        ));
    }
    if !dialect.quote_char.is_ascii() {
        errors.push(format!(
            "{context}: quote_char '{}' must be a single ASCII character",
            dialect.quote_char
        ));
    }
    if dialect.delimiter == dialect.quote_char {
        errors.push(format!(
            "{context}: delimiter and quote_char must differ (both are '{}')",
            dialect.delimiter
        ));
    }
    if matches!(dialect.delimiter, '\n' | '\r') {
        errors.push(format!("{context}: delimiter must not be a line terminator"));
    }
}

fn validate_row_limit(value: &str, context: &str, errors: &mut Vec<String>) {
    if let Err(err) = RowLimit::parse(value) {
        errors.push(format!("{context}: {err}"));
    }
}

fn validate_names(names: &NamesConfig, errors: &mut Vec<String>) {
    let required = [
        ("names.train", &names.train),
        ("names.test", &names.test),
        ("names.reference", &names.reference),
        ("names.subtrain", &names.subtrain),
        ("names.subtrain_directory", &names.subtrain_directory),
        ("names.subsubtrain_prefix", &names.subsubtrain_prefix),
        ("names.header", &names.header),
        ("names.statistics", &names.statistics),
        (
            "names.classes_matrices_directory",
            &names.classes_matrices_directory,
        ),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            errors.push(format!("{key} must not be empty"));
        } else if value.contains('/') {
            errors.push(format!("{key} must be a plain name, got '{value}'"));
        }
    }
    if names
        .main_directory
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        errors.push("names.main_directory must not be empty when set".to_string());
    }
}

/// Validate a parsed experiment configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] listing every validation failure.
pub fn validate_experiment(config: &ExperimentConfig) -> Result<(), PipelineError> {
    let mut errors = Vec::new();

    validate_dialect(&config.input, "input", &mut errors);
    validate_dialect(&config.output, "output", &mut errors);

    validate_row_limit(config.training_value(), "initial_split.value", &mut errors);
    validate_row_limit(config.reference_value(), "reference_split.value", &mut errors);

    if config.class.is_none() {
        for (key, method) in config.split_methods() {
            if method == SplittingMethod::Stratified {
                errors.push(format!(
                    "{key}: method '{method}' requires a class column"
                ));
            }
        }
    }

    if config.forest.trees == 0 {
        errors.push("forest.trees must be at least 1".to_string());
    }
    if config.forest.tree_builder.as_os_str().is_empty() {
        errors.push("forest.tree_builder must not be empty".to_string());
    }
    if let Some(threshold) = config.forest.entropy_threshold.as_deref() {
        match threshold.trim().parse::<f64>() {
            Ok(value) if (0.0..=1.0).contains(&value) => {}
            _ => errors.push(format!(
                "forest.entropy_threshold must be a fraction between 0 and 1, got '{threshold}'"
            )),
        }
    }

    if !(0.0..=1.0).contains(&config.quality.threshold) {
        errors.push(format!(
            "quality.threshold must be a fraction between 0 and 1, got {}",
            config.quality.threshold
        ));
    }

    validate_names(&config.names, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Config(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_experiment_str;

    fn messages(yaml: &str) -> Vec<String> {
        let config = parse_experiment_str(yaml).unwrap();
        match validate_experiment(&config) {
            Ok(()) => Vec::new(),
            Err(PipelineError::Config(errors)) => errors,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_experiment_passes() {
        assert!(messages("{}").is_empty());
    }

    #[test]
    fn test_integer_row_limit_is_rejected() {
        let errors = messages("initial_split: { value: 500 }");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("initial_split.value"), "{errors:?}");
    }

    #[test]
    fn test_stratified_without_class_fails() {
        let errors = messages("class: ~");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("subsubtrain_split"));
        assert!(errors[0].contains("requires a class column"));
    }

    #[test]
    fn test_sequential_only_without_class_passes() {
        assert!(messages("class: ~\nsubsubtrain_split: { method: sequential }").is_empty());
    }

    #[test]
    fn test_dialect_problems_are_reported_per_side() {
        let yaml = "input: { delimiter: '\"', encoding: latin1 }\noutput: { quote_char: ',' }";
        let errors = messages(yaml);
        assert!(errors.iter().any(|e| e.starts_with("input: unsupported encoding")));
        assert!(errors.iter().any(|e| e.starts_with("input: delimiter and quote_char")));
        assert!(errors.iter().any(|e| e.starts_with("output: delimiter and quote_char")));
    }

    #[test]
    fn test_all_errors_are_collected() {
        let yaml = r"
forest:
  trees: 0
  entropy_threshold: 3
quality:
  threshold: 1.5
names:
  train: ''
";
        let errors = messages(yaml);
        assert_eq!(errors.len(), 4, "{errors:?}");
    }

    #[test]
    fn test_error_display_lists_items() {
        let config = parse_experiment_str("forest: { trees: 0 }").unwrap();
        let err = validate_experiment(&config).unwrap_err().to_string();
        assert!(err.contains("\n  - forest.trees must be at least 1"));
    }
}
