//! Fatal error kinds for the library query operations.
//!
//! These propagate uncaught to the caller; there is no retry or recovery.
//! Source-level I/O conditions are handled inside the existence checker
//! and never surface through this type.

use thiserror::Error;

use crate::library::ItemType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LibraryError {
    /// The requested id has no row of the given kind.
    #[error("{item_type} with id {id} was not found")]
    NotFound { item_type: ItemType, id: i64 },

    /// A required identifying parameter was missing or an external item
    /// type code could not be mapped to a known kind.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
