//! # Ronin Common
//!
//! Common types, utilities, and shared abstractions for Project Ronin.
//!
//! This crate provides foundational types used across all Ronin subsystems:
//! - Screen-space geometry (`Rect`, `Facing`, `Vec2`)
//! - ID types (`EntityId`, `Team`)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

pub use glam::Vec2;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
    pub use glam::Vec2;
}

pub use prelude::*;
