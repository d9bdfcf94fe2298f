//! Identity fingerprints for unordered collection members.
//!
//! A fingerprint keys a member of a set-valued field (`vcs_root`, `step`)
//! so declared and remote members can be matched regardless of order. It is
//! derived from the first 8 bytes of a SHA-256 digest of a canonical text,
//! which keeps it identical across runs, processes and platforms. It is a
//! set key, not an integrity check.
//!
//! | member   | identity text                          |
//! |----------|----------------------------------------|
//! | VCS root | `<root id>`                            |
//! | step     | `<type>-<name>-<file>-<args>-`         |
//!
//! Checkout rules and inline step code are payload, not identity.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use tcform_core::{StepSpec, VcsRootSpec};

/// Separator written after every field of a step identity.
pub const FIELD_SEPARATOR: char = '-';

/// A stable, order-independent member key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint of an identity text.
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(head))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Types that can be members of a fingerprint-keyed set.
pub trait Identity {
    fn fingerprint(&self) -> Fingerprint;
}

impl Identity for VcsRootSpec {
    fn fingerprint(&self) -> Fingerprint {
        vcs_root_fingerprint(self)
    }
}

impl Identity for StepSpec {
    fn fingerprint(&self) -> Fingerprint {
        step_fingerprint(self)
    }
}

/// Fingerprint of a VCS root attachment: the root ID alone.
pub fn vcs_root_fingerprint(spec: &VcsRootSpec) -> Fingerprint {
    Fingerprint::of(&spec.id)
}

/// Fingerprint of a build step over `(type, name, file, args)`.
///
/// Absent fields contribute an empty string, never nothing, so field
/// boundaries stay unambiguous.
pub fn step_fingerprint(spec: &StepSpec) -> Fingerprint {
    let mut text = String::new();
    for field in [
        Some(spec.step_type.as_str()),
        spec.name.as_deref(),
        spec.file.as_deref(),
        spec.args.as_deref(),
    ] {
        text.push_str(field.unwrap_or_default());
        text.push(FIELD_SEPARATOR);
    }
    Fingerprint::of(&text)
}

/// Collapse members with equal fingerprints.
///
/// The first occurrence keeps its position; a later duplicate replaces its
/// payload, mirroring add-or-replace on parameters.
pub fn dedupe<T: Identity + Clone>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    let mut index: HashMap<Fingerprint, usize> = HashMap::new();
    for item in items {
        match index.get(&item.fingerprint()) {
            Some(&i) => out[i] = item.clone(),
            None => {
                index.insert(item.fingerprint(), out.len());
                out.push(item.clone());
            }
        }
    }
    out
}

/// Indices of members that [`dedupe`] drops: every occurrence followed by a
/// later member with the same fingerprint.
pub fn shadowed<T: Identity>(items: &[T]) -> Vec<usize> {
    let prints: Vec<Fingerprint> = items.iter().map(Identity::fingerprint).collect();
    prints
        .iter()
        .enumerate()
        .filter(|&(i, print)| prints[i + 1..].contains(print))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(step_type: &str, file: &str) -> StepSpec {
        StepSpec {
            step_type: step_type.into(),
            file: Some(file.into()),
            ..Default::default()
        }
    }

    #[test]
    fn display_is_fixed_width_hex() {
        let fp = Fingerprint::of("vcs1");
        assert_eq!(fp.to_string().len(), 16);
        assert_eq!(fp, Fingerprint::of("vcs1"));
    }

    #[test]
    fn absent_and_empty_fields_are_equivalent() {
        let absent = StepSpec {
            step_type: "cmd_line".into(),
            ..Default::default()
        };
        let empty = StepSpec {
            step_type: "cmd_line".into(),
            name: Some(String::new()),
            file: Some(String::new()),
            args: Some(String::new()),
            code: None,
        };
        assert_eq!(step_fingerprint(&absent), step_fingerprint(&empty));
    }

    #[test]
    fn step_identity_text_is_separator_terminated() {
        let s = StepSpec {
            step_type: "cmd_line".into(),
            name: Some("n".into()),
            file: Some("f".into()),
            args: Some("a".into()),
            code: None,
        };
        assert_eq!(step_fingerprint(&s), Fingerprint::of("cmd_line-n-f-a-"));
    }

    #[test]
    fn fields_do_not_bleed_into_each_other() {
        let a = StepSpec {
            name: Some("x".into()),
            ..step("cmd_line", "")
        };
        let b = StepSpec {
            file: Some("x".into()),
            ..step("cmd_line", "")
        };
        assert_ne!(step_fingerprint(&a), step_fingerprint(&b));
    }

    #[test]
    fn dedupe_keeps_first_position_last_payload() {
        let roots = vec![
            VcsRootSpec { id: "a".into(), checkout_rules: vec!["1".into()] },
            VcsRootSpec { id: "b".into(), checkout_rules: vec![] },
            VcsRootSpec { id: "a".into(), checkout_rules: vec!["2".into()] },
        ];
        let out = dedupe(&roots);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "a");
        assert_eq!(out[0].checkout_rules, vec!["2".to_string()]);
        assert_eq!(out[1].id, "b");
    }

    #[test]
    fn shadowed_lists_every_dropped_occurrence() {
        let inline = |code: &str| StepSpec {
            step_type: "cmd_line".into(),
            code: Some(code.into()),
            ..Default::default()
        };
        let steps = vec![
            inline("make"),
            step("cmd_line", "build.sh"),
            inline("make test"),
            inline("make lint"),
        ];
        assert_eq!(shadowed(&steps), vec![0, 2]);
        assert_eq!(dedupe(&steps).len(), steps.len() - shadowed(&steps).len());
        assert!(shadowed(&[step("cmd_line", "a"), step("cmd_line", "b")]).is_empty());
    }
}
