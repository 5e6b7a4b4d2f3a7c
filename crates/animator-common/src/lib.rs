//! # Animator Common
//!
//! Shared foundations for the Animator document model:
//! - Entity ids and the identity registry that tracks them
//! - Permissive coercion of loosely typed input values
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coerce;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
