//! Validation and quoting of values embedded in SQL and RMAN text.
//!
//! Nothing supplied by a caller reaches a script without passing through
//! one of these functions. Identifiers are checked against the unquoted
//! identifier grammar and upper-cased; everything else is either a quoted
//! literal or matched against a closed grammar.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_$#]{0,127}$").expect("identifier regex is valid")
});

static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)[0-9]+[KMGTPE]?$").expect("size regex is valid"));

static KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_$#]*( +[A-Za-z][A-Za-z0-9_$#]*)*$")
        .expect("keyword regex is valid")
});

/// Validate an unquoted identifier and return it upper-cased.
pub fn identifier(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} must not be empty", what)));
    }
    if !IDENTIFIER.is_match(value) {
        return Err(Error::validation(format!(
            "{} '{}' is not a valid Oracle identifier (letter first, then letters, digits, _, $ or #)",
            what, value
        )));
    }
    Ok(value.to_uppercase())
}

/// Validate `owner.name` or `name` and return the upper-cased parts.
pub fn qualified_name(value: &str, what: &str) -> Result<(Option<String>, String)> {
    match value.trim().split_once('.') {
        Some((owner, name)) => Ok((Some(identifier(owner, what)?), identifier(name, what)?)),
        None => Ok((None, identifier(value, what)?)),
    }
}

/// Render a single-quoted string literal.
///
/// Embedded quotes are doubled. Control characters are rejected because a
/// line break inside a literal can end a SQL*Plus block early.
pub fn literal(value: &str) -> Result<String> {
    if let Some(c) = value.chars().find(|c| c.is_control()) {
        return Err(Error::validation(format!(
            "value contains a control character (U+{:04X})",
            c as u32
        )));
    }
    Ok(format!("'{}'", value.replace('\'', "''")))
}

/// Validate a password and return it as a quoted identifier.
pub fn password(value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::validation("password must not be empty"));
    }
    if value.contains(['"', '\'']) {
        return Err(Error::validation("password must not contain quotes"));
    }
    if value.contains(';') {
        return Err(Error::validation("password must not contain ';'"));
    }
    if value.contains('@') {
        return Err(Error::validation("password must not contain '@'"));
    }
    if !value.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(Error::validation("password must start with a letter"));
    }
    if value.contains(['$', '#']) {
        return Err(Error::validation(
            "password must not contain '$' or '#' (discouraged by Oracle)",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::validation(
            "password may only contain letters, digits and '_'",
        ));
    }
    Ok(format!("\"{}\"", value))
}

/// Validate a storage size such as `100M` and return it upper-cased.
pub fn size(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if SIZE.is_match(value) {
        Ok(value.to_uppercase())
    } else {
        Err(Error::validation(format!(
            "{} '{}' must be a number with an optional K, M, G, T, P or E suffix",
            what, value
        )))
    }
}

/// Like [`size`] but also accepting `UNLIMITED`.
pub fn size_or_unlimited(value: &str, what: &str) -> Result<String> {
    if value.trim().eq_ignore_ascii_case("unlimited") {
        Ok("UNLIMITED".to_string())
    } else {
        size(value, what)
    }
}

/// Validate a phrase of SQL keywords (`CREATE SESSION`, `SELECT`) and
/// return it upper-cased with single spaces.
pub fn keywords(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if !KEYWORDS.is_match(value) {
        return Err(Error::validation(format!(
            "{} '{}' must be words made of letters, digits, _, $ or #",
            what, value
        )));
    }
    Ok(value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase())
}

/// Validate a value against a fixed set of choices (case-insensitive).
pub fn choice<'a>(value: &str, what: &str, choices: &[&'a str]) -> Result<&'a str> {
    choices
        .iter()
        .find(|c| c.eq_ignore_ascii_case(value.trim()))
        .copied()
        .ok_or_else(|| {
            Error::validation(format!(
                "{} must be one of {}, got '{}'",
                what,
                choices.join(", "),
                value
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_uppercases() {
        assert_eq!(identifier("app_user", "username").unwrap(), "APP_USER");
        assert_eq!(identifier("c##ops$1", "username").unwrap(), "C##OPS$1");
    }

    #[test]
    fn test_identifier_rejects_injection() {
        for bad in ["", "1abc", "a b", "x;drop user sys", "a\"b", "a'--", "a.b"] {
            assert!(identifier(bad, "username").is_err(), "{bad:?} accepted");
        }
        assert!(identifier(&"a".repeat(129), "username").is_err());
        assert!(identifier(&"a".repeat(128), "username").is_ok());
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(
            qualified_name("hr.employees", "object").unwrap(),
            (Some("HR".to_string()), "EMPLOYEES".to_string())
        );
        assert_eq!(
            qualified_name("dual", "object").unwrap(),
            (None, "DUAL".to_string())
        );
        assert!(qualified_name("hr.emp;x", "object").is_err());
    }

    #[test]
    fn test_literal_doubles_quotes() {
        assert_eq!(literal("it's").unwrap(), "'it''s'");
        assert_eq!(literal("a & b").unwrap(), "'a & b'");
        assert!(literal("line\n/").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert_eq!(password("Secret_123").unwrap(), "\"Secret_123\"");
        assert!(password("1secret").is_err());
        assert!(password("sec\"ret").is_err());
        assert!(password("sec;ret").is_err());
        assert!(password("sec@ret").is_err());
        assert!(password("sec$ret").is_err());
        assert!(password("sec#ret").is_err());
        assert!(password("sec ret").is_err());
        assert!(password("").is_err());
    }

    #[test]
    fn test_size() {
        assert_eq!(size("100m", "size").unwrap(), "100M");
        assert_eq!(size("4096", "size").unwrap(), "4096");
        assert!(size("100MB", "size").is_err());
        assert!(size("1G; DROP", "size").is_err());
        assert_eq!(size_or_unlimited("unlimited", "maxsize").unwrap(), "UNLIMITED");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            keywords("create   session", "privilege").unwrap(),
            "CREATE SESSION"
        );
        assert!(keywords("select; drop", "privilege").is_err());
    }

    #[test]
    fn test_choice() {
        assert_eq!(
            choice("Immediate", "mode", &["IMMEDIATE", "ABORT"]).unwrap(),
            "IMMEDIATE"
        );
        assert!(choice("now", "mode", &["IMMEDIATE"]).is_err());
    }
}
