// Storage error shared by every port in the core.
//
// Adapters wrap their driver errors with the operation that failed, so a log
// line reads like "failed to count active mutes: database is locked".

use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Wrap a driver error with the operation that produced it.
    pub fn storage(operation: &'static str, err: impl Display) -> Self {
        StoreError::Storage {
            operation,
            message: err.to_string(),
        }
    }

    /// Build a `map_err` adapter for a given operation.
    pub fn context<E: Display>(operation: &'static str) -> impl FnOnce(E) -> StoreError {
        move |err| StoreError::storage(operation, err)
    }
}
