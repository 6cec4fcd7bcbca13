//! Directory collaborator: trait, snapshot backend and lookup cache

pub mod cache;
pub mod snapshot;
pub mod traits;

pub use cache::CachedDirectory;
pub use snapshot::{DirectoryEntry, EntryKind, SnapshotDirectory};
pub use traits::Directory;
