//! namer - Score candidate given names against a naming service and curate a shortlist.
//!
//! ## Architecture
//!
//! A run is one sequential job over a small alphabet of given-name characters:
//! - **Scoring**: every single character, then every ordered pair, is scored
//!   by the naming service unless the score tree already holds it
//! - **Reporting**: the tree is bucketed by score and the best buckets printed
//! - **Curation**: the operator accepts or rejects high-scoring names
//!
//! The score tree and the accepted candidates are snapshotted next to the
//! config file, so an interrupted run resumes where it stopped.

pub mod cache;
pub mod client;
pub mod models;
pub mod pipeline;
pub mod session;

// Re-exports for convenience
pub use cache::{Candidates, NameScore, ScoreTree, SnapshotStore, TreeFlush};
pub use client::{ScoreClient, ScoreSource, Throttle};
pub use models::{Config, ConfigError, FetchError, NamerError, PairRule, Result};
pub use pipeline::{Curator, ScoreStats, ScoringDriver, StdinPrompter};
pub use session::{ScoreOutcome, Session, shutdown_signal};
