//! Naming-service client module.

mod scorer;
mod throttle;

pub use scorer::*;
pub use throttle::*;
