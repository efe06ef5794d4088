//! Error types for the Concord protocol layer.

mod agent;
mod port;

pub use agent::*;
pub use port::*;
