//! Trait seams for the external record store and user directory, plus the
//! in-memory implementation used by tests and local development. Production
//! deployments supply their own `RecordStore` backed by the real database.

pub mod memory;
pub mod store;

pub use memory::{MemoryDirectory, MemoryStore};
pub use store::{Directory, RecordStore};
