//! # tcform-sync
//!
//! Entity reconciliation and the manifest apply pipeline.
//!
//! Call [`apply`] to reconcile every resource a manifest declares, [`plan`]
//! to see what that would do, or [`destroy`] to remove everything a
//! workspace recorded. The per-entity operations live in [`reconciler`].

pub mod diff;
pub mod error;
pub mod pipeline;
pub mod reconciler;
pub mod report;
pub mod state;
pub mod status;

pub use diff::{diff_members, FieldChange, SetDiff};
pub use error::{ErrorKind, SyncError};
pub use pipeline::{apply, destroy, plan, Action, ApplyOutcome, ApplyReport, ResourcePlan};
pub use reconciler::{BuildConfigState, ProjectState};
pub use report::{CreateReport, Outcome, SubResource};
pub use state::{ResourceKind, StateFile};
pub use status::{ResourceStatus, StatusRow};
