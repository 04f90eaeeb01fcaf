//! Scoring, reporting and curation passes.

mod curate;
mod report;
mod scoring;

pub use curate::*;
pub use report::*;
pub use scoring::*;
