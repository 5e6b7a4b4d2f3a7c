//! # Animator Model
//!
//! In-memory model of animation documents.
//!
//! This crate provides:
//! - Entities (parts, state types, states, emitters, particles, groups, sound pools)
//! - The document aggregate with cascading deletes and change notifications
//! - Loading from the name-keyed file format
//! - Encoding at three compression levels, with optional HTML highlighting

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod animation_state;
pub mod document;
pub mod emitter;
pub mod events;
pub mod group;
pub mod loader;
pub mod part;
pub mod part_state;
pub mod particle;
pub mod printer;
pub mod properties;
pub mod sound_pool;
pub mod state;
pub mod state_type;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::animation_state::*;
    pub use crate::document::*;
    pub use crate::emitter::*;
    pub use crate::events::*;
    pub use crate::group::*;
    pub use crate::loader::*;
    pub use crate::part::*;
    pub use crate::part_state::*;
    pub use crate::particle::*;
    pub use crate::printer::*;
    pub use crate::properties::*;
    pub use crate::sound_pool::*;
    pub use crate::state::*;
    pub use crate::state_type::*;
    pub use animator_common::prelude::*;
}

pub use prelude::*;
