//! # Declarative
//!
//! A framework for idempotent "ensure state X" reconciliation.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (a user, a profile, a file)
//! - **Desired**: The lifecycle state and attributes a request asks for
//! - **ResourceState**: What a read-only probe observed on the live system
//! - **Action**: The outcome of [`decide`]: `NoOp`, `Create`, `Modify` or `Drop`
//! - **Reconciliation**: The `{changed, msg}` result, produced once per run
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{reconcile, ApplyContext};
//!
//! let resource = build_resource(params)?;
//! let result = reconcile(&resource, &mut ApplyContext::default())?;
//! println!("changed={} msg={}", result.changed, result.msg);
//! ```
//!
//! [`decide`] is a pure function, so the whole decision table can be
//! unit tested without touching a live system.

pub mod context;
pub mod diff;
pub mod executor;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{attribute_changes, decide, describe_changes};
pub use executor::reconcile;
pub use resource::{BoxedResource, Resource, redact};
pub use types::{
    Action, ApplyResult, Attributes, Change, Desired, DesiredState, ExecuteSummary,
    Reconciliation, ResourceState,
};
