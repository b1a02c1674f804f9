//! Experiment configuration: YAML parsing, defaults and validation.

pub mod parser;
pub mod types;
pub mod validator;
