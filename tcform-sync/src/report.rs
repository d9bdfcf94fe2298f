//! Per-sub-resource bookkeeping for multi-call creation.
//!
//! A create is planned as an ordered list of [`SubResource`]s. Each is
//! marked as it runs; the first failure marks every later entry skipped, so
//! the report says exactly which sub-resources exist remotely.

use std::fmt;

/// One sub-resource call made after the entity itself is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubResource {
    /// Description plus the full parameter set.
    Settings,
    VcsRoot { id: String },
    Step { index: usize, label: String },
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubResource::Settings => f.write_str("settings"),
            SubResource::VcsRoot { id } => write!(f, "vcs root '{id}'"),
            SubResource::Step { index, label } => write!(f, "step #{} ({label})", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Done,
    Failed { message: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub part: SubResource,
    pub outcome: Outcome,
}

/// Ordered outcome list for one entity create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReport {
    /// Server-assigned ID of the created entity.
    pub id: String,
    pub entries: Vec<Entry>,
}

impl CreateReport {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Vec::new(),
        }
    }

    pub fn plan(&mut self, part: SubResource) {
        self.entries.push(Entry {
            part,
            outcome: Outcome::Pending,
        });
    }

    pub(crate) fn mark_done(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.outcome = Outcome::Done;
        }
    }

    /// Mark `index` failed and everything still pending as skipped.
    pub(crate) fn mark_failed(&mut self, index: usize, message: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.outcome = Outcome::Failed {
                message: message.into(),
            };
        }
        for entry in &mut self.entries {
            if entry.outcome == Outcome::Pending {
                entry.outcome = Outcome::Skipped;
            }
        }
    }

    pub fn done(&self) -> impl Iterator<Item = &SubResource> {
        self.with(Outcome::Done)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SubResource> {
        self.with(Outcome::Skipped)
    }

    pub fn failed(&self) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| matches!(e.outcome, Outcome::Failed { .. }))
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.outcome == Outcome::Done)
    }

    fn with(&self, outcome: Outcome) -> impl Iterator<Item = &SubResource> {
        self.entries
            .iter()
            .filter(move |e| e.outcome == outcome)
            .map(|e| &e.part)
    }
}
