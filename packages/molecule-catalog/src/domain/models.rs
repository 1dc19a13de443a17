//! Domain Models
//!
//! A molecule owns two association sets: equivalents (ids of other
//! molecules) and synonyms (alternate names). Both are carried as
//! `BTreeSet`s so that diffing never depends on submission order and
//! duplicates collapse on input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Molecule identifier, assigned by the store
pub type MoleculeId = i64;

/// Molecule (central entity)
///
/// # Examples
///
/// ```rust
/// use molecule_catalog::domain::Molecule;
///
/// let m = Molecule::new("voglibose", "C10H21NO7", 267.277)
///     .with_equivalents([0])
///     .with_synonyms(["vog"]);
/// assert!(m.id.is_none());
/// assert!(m.synonyms.contains("vog"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    /// Absent before first persistence
    #[serde(default)]
    pub id: Option<MoleculeId>,
    pub name: String,
    /// Opaque; never validated chemically
    pub formula: String,
    pub mass: f64,
    /// Ids of other molecules considered equivalent (owner -> target)
    #[serde(default)]
    pub equivalents: BTreeSet<MoleculeId>,
    /// Alternate names
    #[serde(default)]
    pub synonyms: BTreeSet<String>,
}

impl Molecule {
    pub fn new(name: impl Into<String>, formula: impl Into<String>, mass: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            formula: formula.into(),
            mass,
            equivalents: BTreeSet::new(),
            synonyms: BTreeSet::new(),
        }
    }

    pub fn with_id(mut self, id: MoleculeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_equivalents(mut self, equivalents: impl IntoIterator<Item = MoleculeId>) -> Self {
        self.equivalents = equivalents.into_iter().collect();
        self
    }

    pub fn with_synonyms<S: Into<String>>(mut self, synonyms: impl IntoIterator<Item = S>) -> Self {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    /// Current association sets carried by this value
    pub fn associations(&self) -> Associations {
        Associations {
            equivalents: self.equivalents.clone(),
            synonyms: self.synonyms.clone(),
        }
    }

    /// True when `equivalents` contains the molecule's own id
    pub fn is_self_equivalent(&self) -> bool {
        self.id.is_some_and(|id| self.equivalents.contains(&id))
    }

    pub fn summary(&self) -> Option<MoleculeSummary> {
        self.id.map(|id| MoleculeSummary {
            id,
            name: self.name.clone(),
            formula: self.formula.clone(),
            mass: self.mass,
        })
    }
}

/// Search row shape: scalar fields only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeSummary {
    pub id: MoleculeId,
    pub name: String,
    pub formula: String,
    pub mass: f64,
}

/// Association sets as currently persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Associations {
    pub equivalents: BTreeSet<MoleculeId>,
    pub synonyms: BTreeSet<String>,
}

impl Associations {
    pub fn is_empty(&self) -> bool {
        self.equivalents.is_empty() && self.synonyms.is_empty()
    }
}
