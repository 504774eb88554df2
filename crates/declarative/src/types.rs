//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state requested by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Resource should exist
    #[default]
    Present,
    /// Resource should not exist
    Absent,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Insertion-ordered attribute map
///
/// Order matters for command synthesis: clauses are emitted in the order
/// the caller declared them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace an attribute, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// What the request asks for: lifecycle plus the attributes it manages
///
/// Attributes the caller did not mention are not managed and never
/// produce drift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Desired {
    pub state: DesiredState,
    pub attributes: Attributes,
}

impl Desired {
    pub fn present(attributes: Attributes) -> Self {
        Self {
            state: DesiredState::Present,
            attributes,
        }
    }

    pub fn absent() -> Self {
        Self {
            state: DesiredState::Absent,
            attributes: Attributes::new(),
        }
    }
}

/// Observed state of a resource on the live system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists, with the attribute values the probe could read
    Present { attributes: Attributes },
    /// Resource does not exist
    Absent,
}

impl ResourceState {
    pub fn present() -> Self {
        Self::Present {
            attributes: Attributes::new(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Observed attributes (empty when absent)
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Self::Present { attributes } => Some(attributes),
            Self::Absent => None,
        }
    }
}

/// A single attribute that must change to converge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub key: String,
    pub from: Option<String>,
    pub to: String,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            Some(from) => write!(f, "{}: {} -> {}", self.key, from, self.to),
            None => write!(f, "{}: (unset) -> {}", self.key, self.to),
        }
    }
}

/// What must happen to move observed state to desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Already converged
    NoOp,
    /// Resource is missing and must be created
    Create,
    /// Resource exists but some managed attributes differ
    Modify { changes: Vec<Change> },
    /// Resource exists and must be removed
    Drop,
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

impl From<&Action> for ApplyResult {
    fn from(action: &Action) -> Self {
        match action {
            Action::NoOp => Self::NoChange,
            Action::Create => Self::Created,
            Action::Modify { .. } => Self::Modified,
            Action::Drop => Self::Removed,
        }
    }
}

/// Outcome of one reconciliation, produced exactly once per invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub changed: bool,
    pub msg: String,
    #[serde(skip)]
    pub action: Option<Action>,
    /// Commands that ran (or would run in check mode), secrets redacted
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub commands: Vec<String>,
}

impl Reconciliation {
    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            changed: false,
            msg: msg.into(),
            action: None,
            commands: Vec::new(),
        }
    }

    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: msg.into(),
            action: None,
            commands: Vec::new(),
        }
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    /// Outcome category for summaries
    pub fn apply_result(&self) -> ApplyResult {
        match &self.action {
            Some(action) => ApplyResult::from(action),
            None if self.changed => ApplyResult::Modified,
            None => ApplyResult::NoChange,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}
