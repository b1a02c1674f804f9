//! Delimited-table conventions shared by every reader and writer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// When a writer wraps fields in quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    /// Quote every field.
    All,
    /// Quote only fields containing the delimiter, quote char or a newline.
    Minimal,
    /// Quote every field that does not parse as a number.
    #[serde(alias = "nonnumeric", alias = "numeric_only")]
    NonNumeric,
    /// Never quote.
    None,
}

impl Quoting {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Minimal => "minimal",
            Self::NonNumeric => "non_numeric",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Quoting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quoting {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "minimal" => Ok(Self::Minimal),
            "non_numeric" | "nonnumeric" | "numeric-only" | "numeric_only" => Ok(Self::NonNumeric),
            "none" => Ok(Self::None),
            _ => Err(ParseEnumError::new(
                "quoting",
                s,
                &["all", "minimal", "non_numeric", "none"],
            )),
        }
    }
}

/// Record terminator used when reading and writing tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineTerminator {
    /// Read any of `\n`, `\r\n`, `\r`; write `\n`.
    #[default]
    Auto,
    Lf,
    Cr,
    CrLf,
}

impl LineTerminator {
    /// Bytes emitted after each record.
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Auto | Self::Lf => b"\n",
            Self::Cr => b"\r",
            Self::CrLf => b"\r\n",
        }
    }
}

impl FromStr for LineTerminator {
    type Err = ParseEnumError;

    /// Accepts symbolic names as well as the literal (or backslash-escaped)
    /// terminator itself; the empty string means [`LineTerminator::Auto`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "auto" => Ok(Self::Auto),
            "\n" | "\\n" | "lf" => Ok(Self::Lf),
            "\r" | "\\r" | "cr" => Ok(Self::Cr),
            "\r\n" | "\\r\\n" | "crlf" => Ok(Self::CrLf),
            _ => Err(ParseEnumError::new(
                "line terminator",
                s,
                &["auto", "lf", "cr", "crlf"],
            )),
        }
    }
}

/// Encoding, delimiter, quoting and line-ending conventions of a table.
///
/// Built once from the configuration and copied into every stage that opens
/// a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    /// Text encoding of the table. Only UTF-8 and ASCII (under any of
    /// their usual spellings) pass validation; other codecs such as
    /// `latin1` are rejected.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_quote_char")]
    pub quote_char: char,
    #[serde(default = "default_quoting")]
    pub quoting: Quoting,
    #[serde(default)]
    pub line_terminator: LineTerminator,
    #[serde(default = "default_skip_initial_space")]
    pub skip_initial_space: bool,
}

fn default_encoding() -> String {
    "utf8".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_quote_char() -> char {
    '"'
}

fn default_quoting() -> Quoting {
    Quoting::Minimal
}

fn default_skip_initial_space() -> bool {
    true
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            delimiter: default_delimiter(),
            quote_char: default_quote_char(),
            quoting: default_quoting(),
            line_terminator: LineTerminator::Auto,
            skip_initial_space: default_skip_initial_space(),
        }
    }
}

impl Dialect {
    /// Whether the configured encoding can be read byte-for-byte as UTF-8.
    #[must_use]
    pub fn is_utf8_compatible(&self) -> bool {
        matches!(
            self.encoding.to_ascii_lowercase().replace('_', "-").as_str(),
            "utf8" | "utf-8" | "ascii" | "us-ascii"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_accepts_legacy_spellings() {
        assert_eq!("nonnumeric".parse::<Quoting>().unwrap(), Quoting::NonNumeric);
        assert_eq!("numeric-only".parse::<Quoting>().unwrap(), Quoting::NonNumeric);
        assert_eq!("ALL".parse::<Quoting>().unwrap(), Quoting::All);
        assert!("sometimes".parse::<Quoting>().is_err());
    }

    #[test]
    fn line_terminator_accepts_escaped_forms() {
        assert_eq!("\\n".parse::<LineTerminator>().unwrap(), LineTerminator::Lf);
        assert_eq!("\r\n".parse::<LineTerminator>().unwrap(), LineTerminator::CrLf);
        assert_eq!("".parse::<LineTerminator>().unwrap(), LineTerminator::Auto);
        assert!(";".parse::<LineTerminator>().is_err());
    }

    #[test]
    fn default_dialect_is_comma_separated_utf8() {
        let dialect = Dialect::default();
        assert_eq!(dialect.delimiter, ',');
        assert_eq!(dialect.quoting, Quoting::Minimal);
        assert!(dialect.is_utf8_compatible());
    }

    #[test]
    fn latin1_is_not_utf8_compatible() {
        let dialect = Dialect {
            encoding: "latin1".into(),
            ..Dialect::default()
        };
        assert!(!dialect.is_utf8_compatible());
    }

    #[test]
    fn partial_yaml_like_json_fills_defaults() {
        let dialect: Dialect = serde_json::from_str(r#"{"delimiter": ";"}"#).unwrap();
        assert_eq!(dialect.delimiter, ';');
        assert_eq!(dialect.quote_char, '"');
        assert_eq!(dialect.line_terminator, LineTerminator::Auto);
    }
}
