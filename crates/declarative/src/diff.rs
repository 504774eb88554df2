//! Drift detection: turn desired and observed state into an action
//!
//! `decide` is pure. It never touches the live system, so the whole
//! reconciliation decision table is testable without a database.

use crate::types::{Action, Attributes, Change, Desired, DesiredState, ResourceState};

/// Decide what must happen to converge `observed` onto `desired`
///
/// | desired | observed | action |
/// |---|---|---|
/// | absent  | absent   | NoOp |
/// | absent  | present  | Drop |
/// | present | absent   | Create |
/// | present | present  | Modify if a managed attribute differs, else NoOp |
pub fn decide(desired: &Desired, observed: &ResourceState) -> Action {
    match (desired.state, observed) {
        (DesiredState::Absent, ResourceState::Absent) => Action::NoOp,
        (DesiredState::Absent, ResourceState::Present { .. }) => Action::Drop,
        (DesiredState::Present, ResourceState::Absent) => Action::Create,
        (DesiredState::Present, ResourceState::Present { attributes }) => {
            let changes = attribute_changes(&desired.attributes, attributes);
            if changes.is_empty() {
                Action::NoOp
            } else {
                Action::Modify { changes }
            }
        }
    }
}

/// Managed attributes whose observed value differs from the wanted one
///
/// Only keys present in `wanted` are compared; values must already be
/// normalized by the resource (case, whitespace).
pub fn attribute_changes(wanted: &Attributes, current: &Attributes) -> Vec<Change> {
    wanted
        .iter()
        .filter_map(|(key, to)| {
            let from = current.get(key);
            if from == Some(to) {
                return None;
            }
            Some(Change {
                key: key.to_string(),
                from: from.map(str::to_string),
                to: to.to_string(),
            })
        })
        .collect()
}

/// Render a one-line summary of an action for messages
pub fn describe_changes(changes: &[Change]) -> String {
    changes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
