//! Board domain: wire shapes, partial updates and project/task reference sync

pub mod models;
pub mod patch;
pub mod references;

pub use models::*;
pub use patch::Patch;
pub use references::{ReferenceSync, SyncReport};
