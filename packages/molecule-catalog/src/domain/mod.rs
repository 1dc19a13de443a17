//! Domain layer
//!
//! - `models`: Molecule entity and its association sets
//! - `ports`: Query gateway abstraction (implemented in `infrastructure`)

pub mod models;
pub mod ports;

pub use models::{Associations, Molecule, MoleculeId, MoleculeSummary};
pub use ports::{AutoCommit, GatewayTransaction, QueryGateway, Row, SqlValue, StatementExecutor};
