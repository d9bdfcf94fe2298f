//! VCS root attachment codec.
//!
//! Checkout rules are an ordered list declaratively and a single
//! newline-joined string remotely.

use tcform_core::{VcsRootEntry, VcsRootId, VcsRootSpec};

/// Separator between checkout rules in the remote representation.
pub const CHECKOUT_RULE_SEPARATOR: &str = "\n";

pub fn expand_vcs_root(spec: &VcsRootSpec) -> VcsRootEntry {
    VcsRootEntry {
        root_id: VcsRootId::from(spec.id.as_str()),
        checkout_rules: spec.checkout_rules.join(CHECKOUT_RULE_SEPARATOR),
    }
}

/// An empty rule string flattens to an empty rule list.
pub fn flatten_vcs_root(entry: &VcsRootEntry) -> VcsRootSpec {
    let checkout_rules = if entry.checkout_rules.is_empty() {
        Vec::new()
    } else {
        entry
            .checkout_rules
            .split(CHECKOUT_RULE_SEPARATOR)
            .map(|rule| rule.trim_end_matches('\r').to_string())
            .collect()
    };
    VcsRootSpec {
        id: entry.root_id.0.clone(),
        checkout_rules,
    }
}
