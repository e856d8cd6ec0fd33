//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod entry;
pub mod status;
pub mod tag;

pub use entry::EntryCommandHandler;
pub use status::StatusCommandHandler;
pub use tag::TagCommandHandler;
