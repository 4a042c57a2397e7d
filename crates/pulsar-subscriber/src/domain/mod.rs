//! Domain layer: entities, pure flattening logic, lifecycle and configuration.

pub mod config;
pub mod entities;
pub mod errors;
pub mod flatten;
pub mod lifecycle;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use flatten::*;
pub use lifecycle::*;
