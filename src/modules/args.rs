//! Module arguments
//!
//! Arguments arrive as a JSON object (an Ansible args file) and/or as
//! `key=value` pairs from the command line. Values from pairs are parsed as
//! JSON when they can be, so `port=1521` is a number and `privileges=["A"]`
//! a list; anything else is a plain string.

use declarative::DesiredState;
use orakit::{Error, Result};
use serde_json::{Map, Value};

const ANSIBLE_PREFIX: &str = "_ansible_";
const ANSIBLE_CHECK_MODE: &str = "_ansible_check_mode";

/// Normalized arguments for one module invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleArgs {
    values: Map<String, Value>,
    check_mode: bool,
}

impl ModuleArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object, stripping `_ansible_*` keys
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(Error::validation("module arguments must be a JSON object"));
        };

        let mut args = Self::new();
        for (key, value) in object {
            args.set(key, value);
        }
        Ok(args)
    }

    /// Parse `key=value` pairs
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut args = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, raw) = pair.split_once('=').ok_or_else(|| {
                Error::validation(format!("argument '{}' must be of the form key=value", pair))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::validation(format!("argument '{}' has no key", pair)));
            }
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            args.set(key.to_string(), value);
        }
        Ok(args)
    }

    /// Overlay `other` on top of these arguments
    pub fn merge(mut self, other: Self) -> Self {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
        self.check_mode |= other.check_mode;
        self
    }

    /// Insert one argument
    pub fn set(&mut self, key: String, value: Value) {
        if key == ANSIBLE_CHECK_MODE {
            self.check_mode = value.as_bool().unwrap_or(false);
        } else if !key.starts_with(ANSIBLE_PREFIX) {
            self.values.insert(key, value);
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key.to_string(), value.into());
        self
    }

    /// Whether the caller asked for a dry run
    pub fn check_mode(&self) -> bool {
        self.check_mode
    }

    /// Reject keys the module does not know
    pub fn ensure_known(&self, module: &str, allowed: &[&str]) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .values
            .keys()
            .map(String::as_str)
            .filter(|k| !allowed.contains(k))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        Err(Error::validation(format!(
            "Unsupported parameters for {} module: {}. Supported parameters include: {}",
            module,
            unknown.join(", "),
            allowed.join(", ")
        )))
    }

    /// Raw value; JSON null counts as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Scalar as a string; numbers and booleans are accepted
    pub fn str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => scalar(key, value).map(Some),
        }
    }

    pub fn required(&self, key: &str) -> Result<String> {
        match self.str(key)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(Error::validation(format!(
                "missing required arguments: {}",
                key
            ))),
        }
    }

    /// Boolean in JSON or Ansible's string spellings
    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        if let Value::Bool(b) = value {
            return Ok(Some(*b));
        }
        match scalar(key, value)?.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            other => Err(Error::validation(format!(
                "{} must be a boolean, got '{}'",
                key, other
            ))),
        }
    }

    pub fn flag(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.bool(key)?.unwrap_or(default))
    }

    pub fn u16(&self, key: &str) -> Result<Option<u16>> {
        self.str(key)?
            .map(|v| {
                v.trim().parse::<u16>().map_err(|_| {
                    Error::validation(format!("{} must be an integer between 0 and 65535", key))
                })
            })
            .transpose()
    }

    pub fn u32(&self, key: &str) -> Result<Option<u32>> {
        self.str(key)?
            .map(|v| {
                v.trim()
                    .parse::<u32>()
                    .map_err(|_| Error::validation(format!("{} must be a non-negative integer", key)))
            })
            .transpose()
    }

    /// `state`, defaulting to present
    pub fn state(&self) -> Result<DesiredState> {
        match self.choice("state", &["present", "absent"], Some("present"))? {
            "absent" => Ok(DesiredState::Absent),
            _ => Ok(DesiredState::Present),
        }
    }

    /// List given as a JSON array or a comma-separated string
    pub fn list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(|v| scalar(key, v)).collect(),
            Some(value) => Ok(scalar(key, value)?
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
        }
    }

    /// Dictionary with raw values, in declaration order
    pub fn map_values(&self, key: &str) -> Result<Vec<(String, Value)>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Object(map)) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Some(_) => Err(Error::validation(format!("{} must be a dictionary", key))),
        }
    }

    /// Dictionary with scalar values, in declaration order
    pub fn map(&self, key: &str) -> Result<Vec<(String, String)>> {
        self.map_values(key)?
            .into_iter()
            .map(|(k, v)| {
                let value = scalar(&format!("{}.{}", key, k), &v)?;
                Ok((k, value))
            })
            .collect()
    }

    /// One of `choices` (case-insensitive), or `default` when unset
    pub fn choice(
        &self,
        key: &str,
        choices: &[&'static str],
        default: Option<&'static str>,
    ) -> Result<&'static str> {
        match (self.str(key)?, default) {
            (Some(value), _) => orakit::quote::choice(&value, key, choices),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(Error::validation(format!(
                "missing required arguments: {}",
                key
            ))),
        }
    }
}

fn scalar(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::validation(format!("{} must be a scalar value", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ansible_keys_are_stripped() {
        let args = ModuleArgs::from_json(json!({
            "username": "app",
            "_ansible_check_mode": true,
            "_ansible_verbosity": 2
        }))
        .unwrap();
        assert!(args.check_mode());
        assert!(args.ensure_known("user", &["username"]).is_ok());
    }

    #[test]
    fn test_pairs_are_json_coerced() {
        let args = ModuleArgs::from_pairs(&[
            "port=1521",
            "autoextend=true",
            "privileges=[\"CREATE SESSION\",\"CREATE TABLE\"]",
            "job_action=BEGIN x := 1; END;",
        ])
        .unwrap();
        assert_eq!(args.u16("port").unwrap(), Some(1521));
        assert_eq!(args.bool("autoextend").unwrap(), Some(true));
        assert_eq!(
            args.list("privileges").unwrap(),
            vec!["CREATE SESSION", "CREATE TABLE"]
        );
        assert_eq!(
            args.str("job_action").unwrap().as_deref(),
            Some("BEGIN x := 1; END;")
        );
    }

    #[test]
    fn test_pair_without_equals_fails() {
        assert!(ModuleArgs::from_pairs(&["username"]).is_err());
        assert!(ModuleArgs::from_pairs(&["=x"]).is_err());
    }

    #[test]
    fn test_merge_overrides() {
        let file = ModuleArgs::from_json(json!({"size": "10M", "tablespace": "data"})).unwrap();
        let cli = ModuleArgs::from_pairs(&["size=20M"]).unwrap();
        let merged = file.merge(cli);
        assert_eq!(merged.required("size").unwrap(), "20M");
        assert_eq!(merged.required("tablespace").unwrap(), "data");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let args = ModuleArgs::new().with("username", "a").with("colour", "red");
        let err = args.ensure_known("user", &["username"]).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_null_counts_as_absent() {
        let args = ModuleArgs::from_json(json!({"maxsize": null})).unwrap();
        assert!(!args.contains("maxsize"));
        assert!(args.required("maxsize").is_err());
    }

    #[test]
    fn test_bool_spellings() {
        let args = ModuleArgs::new().with("a", "yes").with("b", "off").with("c", "maybe");
        assert_eq!(args.bool("a").unwrap(), Some(true));
        assert_eq!(args.bool("b").unwrap(), Some(false));
        assert!(args.bool("c").is_err());
        assert!(args.flag("missing", true).unwrap());
    }

    #[test]
    fn test_state_and_choice() {
        assert_eq!(ModuleArgs::new().state().unwrap(), DesiredState::Present);
        let args = ModuleArgs::new().with("state", "Absent").with("mode", "loud");
        assert_eq!(args.state().unwrap(), DesiredState::Absent);
        assert!(args.choice("mode", &["normal", "mount"], Some("normal")).is_err());
    }

    #[test]
    fn test_list_from_csv() {
        let args = ModuleArgs::new().with("privileges", "select, insert ,");
        assert_eq!(args.list("privileges").unwrap(), vec!["select", "insert"]);
    }

    #[test]
    fn test_map_keeps_order_and_stringifies() {
        let args = ModuleArgs::from_json(json!({
            "limits": {"SESSIONS_PER_USER": 5, "IDLE_TIME": "30", "CONNECT_TIME": "UNLIMITED"}
        }))
        .unwrap();
        assert_eq!(
            args.map("limits").unwrap(),
            vec![
                ("SESSIONS_PER_USER".to_string(), "5".to_string()),
                ("IDLE_TIME".to_string(), "30".to_string()),
                ("CONNECT_TIME".to_string(), "UNLIMITED".to_string()),
            ]
        );
        let bad = ModuleArgs::new().with("limits", "x");
        assert!(bad.map("limits").is_err());
    }
}
