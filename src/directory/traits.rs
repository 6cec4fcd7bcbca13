//! The directory collaborator abstraction
//!
//! The engine only ever reads the directory through this trait, so the
//! snapshot backend, a caching wrapper or a live directory client can be
//! used interchangeably.

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::model::{Person, TitleSet};

/// Read-only keyed lookup over an organizational directory
///
/// Implementations must be Send + Sync for use in async contexts.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch a single person by exact directory id
    ///
    /// Returns `Ok(None)` when the id is unknown or names a non-person
    /// entry (shared mailbox, resource).
    async fn lookup_by_id(&self, id: &str) -> Result<Option<Person>, DirectoryError>;

    /// Fetch every person entry carrying `username`
    ///
    /// More than one result means the directory is ambiguous for that name.
    async fn lookup_by_username(&self, username: &str) -> Result<Vec<Person>, DirectoryError>;

    /// Bulk search for every person whose title is in `titles`
    async fn search_principals(&self, titles: &TitleSet) -> Result<Vec<Person>, DirectoryError>;
}
