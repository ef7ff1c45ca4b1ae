//! Core types - pure abstractions shared across the codebase.

mod error;
pub mod glob;
mod state;

pub use error::{RegistryError, TransformError};
pub use state::{is_shutdown, setup_shutdown_handler, subscribe_shutdown};
