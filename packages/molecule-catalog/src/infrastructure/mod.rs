//! Infrastructure layer - Query gateway adapters

pub mod recording;
pub use recording::{RecordedStatement, RecordingGateway};

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGateway;
