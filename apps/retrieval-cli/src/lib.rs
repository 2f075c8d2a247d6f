//! Pieces of the `retrieval` binary that are worth testing on their own.

pub mod oracle;
pub mod snapshot;

pub use oracle::{build_oracle, CommandOracle};
pub use snapshot::{Snapshot, SnapshotEntry};
