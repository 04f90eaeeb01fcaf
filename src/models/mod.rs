//! Core configuration and error models for namer.

mod config;
mod error;

pub use config::*;
pub use error::*;
