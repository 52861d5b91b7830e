//! Persistence adapter: document collections for projects, tasks and users

pub mod error;
pub mod memory;
pub mod models;
pub mod neo4j;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::*;
pub use neo4j::Neo4jStore;
pub use traits::DocumentStore;
