//! Set reconciliation
//!
//! Pure diffing of a persisted association set against its desired state.
//! No I/O: the service decides what to do with the plan.
//!
//! ```rust
//! use molecule_catalog::reconcile::reconcile;
//! use std::collections::BTreeSet;
//!
//! let current = BTreeSet::from(["vague", "vog"]);
//! let desired = BTreeSet::from(["vague"]);
//!
//! let plan = reconcile(&current, &desired);
//! assert_eq!(plan.to_delete, BTreeSet::from(["vog"]));
//! assert!(plan.to_insert.is_empty());
//! ```

use serde::Serialize;
use std::collections::BTreeSet;

/// Elements to delete and to insert to move `current` to `desired`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan<T: Ord> {
    /// `current − desired`
    pub to_delete: BTreeSet<T>,
    /// `desired − current`
    pub to_insert: BTreeSet<T>,
}

impl<T: Ord> Default for ReconciliationPlan<T> {
    fn default() -> Self {
        Self {
            to_delete: BTreeSet::new(),
            to_insert: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> ReconciliationPlan<T> {
    /// Nothing to write: the stored set already equals the desired one
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty() && self.to_insert.is_empty()
    }

    /// `(current − to_delete) ∪ to_insert`
    pub fn apply(&self, current: &BTreeSet<T>) -> BTreeSet<T> {
        current
            .difference(&self.to_delete)
            .chain(self.to_insert.iter())
            .cloned()
            .collect()
    }

    /// "-d +i"
    pub fn summary(&self) -> String {
        format!("-{} +{}", self.to_delete.len(), self.to_insert.len())
    }
}

/// Diff `current` against `desired`
pub fn reconcile<T: Ord + Clone>(current: &BTreeSet<T>, desired: &BTreeSet<T>) -> ReconciliationPlan<T> {
    ReconciliationPlan {
        to_delete: current.difference(desired).cloned().collect(),
        to_insert: desired.difference(current).cloned().collect(),
    }
}
