//! Classification of sqlplus and rman output.
//!
//! The tools report failures as text. Error markers are scraped from the
//! combined output and checked together with the exit status; connection
//! and authentication markers map to [`Error::Connection`], everything else
//! to [`Error::Execution`].

use crate::error::{Error, Result};
use crate::types::{CommandOutput, Tool};
use regex::Regex;
use std::sync::LazyLock;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(ORA-\d{5}|PLS-\d{5}|SP2-\d{4}|RMAN-\d{5}|TNS-\d{5})\b")
        .expect("marker regex is valid")
});

/// Codes meaning the target could not be reached or refused the login.
const CONNECTION_CODES: &[&str] = &[
    "ORA-01017", // invalid username/password
    "ORA-01031", // insufficient privileges
    "ORA-01034", // ORACLE not available
    "ORA-12154", // could not resolve connect identifier
    "ORA-12514", // listener does not know of service
    "ORA-12541", // no listener
    "ORA-12545", // target host or object does not exist
    "ORA-12560", // protocol adapter error
    "ORA-27101", // shared memory realm does not exist
];

/// RMAN prints these around every error stack.
const BANNER_CODES: &[&str] = &["RMAN-00569", "RMAN-00571"];

/// Error codes found in `text`, in order of appearance.
pub fn error_codes(text: &str) -> Vec<String> {
    MARKER
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

fn is_connection_code(code: &str) -> bool {
    code.starts_with("TNS-") || CONNECTION_CODES.contains(&code)
}

fn line_with(text: &str, code: &str) -> String {
    text.lines()
        .find(|l| l.contains(code))
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Classify one invocation.
///
/// Codes listed in `tolerated` do not fail the run, even when the tool
/// exited non-zero because of them. Returns the tolerated codes seen.
pub fn classify(tool: Tool, output: &CommandOutput, tolerated: &[&str]) -> Result<Vec<String>> {
    let text = output.combined();
    let codes: Vec<String> = error_codes(&text)
        .into_iter()
        .filter(|c| !BANNER_CODES.contains(&c.as_str()))
        .collect();

    let (seen, failures): (Vec<String>, Vec<String>) = codes
        .into_iter()
        .partition(|c| tolerated.contains(&c.as_str()));

    if let Some(code) = failures.iter().find(|c| is_connection_code(c)) {
        return Err(Error::Connection {
            message: line_with(&text, code),
            output: text,
        });
    }

    if let Some(code) = failures.first() {
        return Err(Error::Execution {
            message: line_with(&text, code),
            output: text,
        });
    }

    if !output.success() && seen.is_empty() {
        let status = output
            .code
            .map_or_else(|| "a signal".to_string(), |c| format!("status {}", c));
        return Err(Error::Execution {
            message: format!("{} exited with {}", tool, status),
            output: text,
        });
    }

    Ok(seen)
}

/// Non-empty, trimmed output lines.
///
/// With headings, feedback and paging disabled, each line is one row.
pub fn rows(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a row produced by concatenating columns with [`FIELD_SEPARATOR`].
///
/// The last field receives the remainder of the line so it may itself
/// contain the separator.
pub fn fields(row: &str, count: usize) -> Vec<String> {
    let mut parts: Vec<String> = row
        .splitn(count, FIELD_SEPARATOR)
        .map(|f| f.trim().to_string())
        .collect();
    parts.resize(count, String::new());
    parts
}

/// Column separator used by multi-column probes.
pub const FIELD_SEPARATOR: &str = "|";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_output_passes() {
        let out = CommandOutput::ok("APP_USER\n");
        assert!(classify(Tool::Sqlplus, &out, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_login_failure_is_connection_error() {
        let out = CommandOutput::failed(
            "ERROR:\nORA-01017: invalid username/password; logon denied\n",
            1,
        );
        let err = classify(Tool::Sqlplus, &out, &[]).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert_eq!(
            err.to_string(),
            "connection failed: ORA-01017: invalid username/password; logon denied"
        );
    }

    #[test]
    fn test_tns_marker_is_connection_error() {
        let out = CommandOutput::failed("TNS-12541: TNS:no listener", 1);
        assert!(matches!(
            classify(Tool::Sqlplus, &out, &[]),
            Err(Error::Connection { .. })
        ));
    }

    #[test]
    fn test_sql_error_is_execution_error_with_output() {
        let out = CommandOutput::failed(
            "CREATE USER X\n*\nERROR at line 1:\nORA-01920: user name 'X' conflicts with another user or role name\n",
            1920 % 256,
        );
        let err = classify(Tool::Sqlplus, &out, &[]).unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
        assert!(err.output().unwrap().contains("ERROR at line 1"));
    }

    #[test]
    fn test_marker_with_zero_exit_still_fails() {
        let out = CommandOutput::ok("SP2-0734: unknown command beginning \"foo\"");
        assert!(classify(Tool::Sqlplus, &out, &[]).is_err());
    }

    #[test]
    fn test_nonzero_exit_without_marker_fails() {
        let out = CommandOutput::failed("", 3);
        let err = classify(Tool::Rman, &out, &[]).unwrap_err();
        assert_eq!(err.to_string(), "execution failed: rman exited with status 3");
    }

    #[test]
    fn test_rman_banner_is_skipped() {
        let out = CommandOutput::failed(
            "RMAN-00571: ======\nRMAN-00569: === ERROR MESSAGE STACK FOLLOWS ===\nRMAN-03002: failure of restore command\n",
            1,
        );
        let err = classify(Tool::Rman, &out, &[]).unwrap_err();
        assert!(err.to_string().contains("RMAN-03002"));
    }

    #[test]
    fn test_tolerated_codes_are_reported() {
        let out = CommandOutput::failed(
            "ORA-01081: cannot start already-running ORACLE - shut it down first",
            1,
        );
        let seen = classify(Tool::Sqlplus, &out, &["ORA-01081"]).unwrap();
        assert_eq!(seen, vec!["ORA-01081".to_string()]);
    }

    #[test]
    fn test_rows_and_fields() {
        assert_eq!(rows("  A \n\n B\n"), vec!["A", "B"]);
        assert_eq!(
            fields("TRUE|FREQ=DAILY|BEGIN x; END;", 3),
            vec!["TRUE", "FREQ=DAILY", "BEGIN x; END;"]
        );
        assert_eq!(fields("TRUE|FREQ=DAILY|a|b", 3)[2], "a|b");
        assert_eq!(fields("ONLY", 2), vec!["ONLY", ""]);
    }
}
