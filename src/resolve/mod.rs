//! Hierarchy resolution over the directory
//!
//! - [`AscentResolver`]: subject -> sponsoring principal (manager links)
//! - [`DescentCollector`]: principal -> flattened subordinates (report links)

pub mod ascent;
pub mod descent;

pub use ascent::{AscentResolver, Sponsorship, UnresolvedReason};
pub use descent::{DescentCollector, FailedLookup, Subtree};
