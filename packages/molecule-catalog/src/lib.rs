//! Molecule Catalog - association reconciliation over a relational store
//!
//! A molecule carries two association sets: equivalents (other molecule
//! ids) and synonyms (alternate names). Updating a molecule diffs the
//! stored sets against the desired ones and issues only the deletes and
//! inserts the difference requires. Unaffected rows are never dropped and
//! recreated.
//!
//! ## Layers
//!
//! ```text
//! service/     (add, update, search, exists, seed; transactions)
//!     ↓
//! reconcile/   (pure set diff)      store/ (SQL primitives)
//!                                       ↓
//! domain/      (models, QueryGateway port)
//!                                       ↓
//! infrastructure/ (SQLite, recording gateway)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use molecule_catalog::{Molecule, MoleculeService, SqliteGateway};
//!
//! let service = MoleculeService::new(SqliteGateway::open("molecules.db")?);
//!
//! let id = service
//!     .add_molecule(&Molecule::new("voglibose", "C10H21NO7", 267.277).with_synonyms(["vog"]))
//!     .await?;
//!
//! // Only the "vague" synonym row is inserted; "vog" stays untouched
//! let report = service
//!     .update_molecule(&Molecule::new("voglibose", "C10H21NO7", 267.277)
//!         .with_id(id)
//!         .with_synonyms(["vog", "vague"]))
//!     .await?;
//! assert!(report.changed());
//! ```

pub mod compat;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod reconcile;
pub mod service;
pub mod store;

pub use config::{CatalogConfig, ConfigError, NotFoundPolicy};
pub use error::{CatalogError, ErrorKind, Result};

pub use domain::{
    Associations, GatewayTransaction, Molecule, MoleculeId, MoleculeSummary, QueryGateway, Row,
    SqlValue,
};
pub use reconcile::{reconcile, ReconciliationPlan};
pub use service::{MoleculeService, SeedOutcome, UpdateReport};

pub use infrastructure::RecordingGateway;
#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteGateway;
