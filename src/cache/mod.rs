//! Score cache module.
//!
//! Provides:
//! - `ScoreTree`: Fetched scores keyed by given-name characters
//! - `SnapshotStore`: Persistence of the tree and the candidate set
//! - `TreeFlush`: Guard that writes the tree when scoring ends, however it ends

mod snapshot;
mod tree;

pub use snapshot::*;
pub use tree::*;
