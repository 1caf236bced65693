//! psnake - project workspace manager
//!
//! Lays out analysis projects on disk, keeps track of the current one,
//! imports dated datasets and protocols behind stable aliases, and packages
//! deliverables.

pub mod artifact;
pub mod commands;
pub mod config;
pub mod environment;
pub mod error;
pub mod launch;
pub mod layout;
pub mod package;
pub mod registry;
pub mod report;
pub mod tools;
pub mod workspace;

pub use error::{Result, SnakeError};
