//! Error types for state stores.

use crate::value::ErrorValue;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store name already registered: {0}")]
    DuplicateName(String),

    #[error("Storage key already registered: {0}")]
    DuplicateStorageKey(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Initial value of store {0} is undefined, use null to start in loading state")]
    UndefinedInitialValue(String),

    #[error("Store {0} is already initialized")]
    AlreadyInitialized(String),

    #[error("Store {0} is not initialized")]
    NotInitialized(String),

    #[error("Store {0} is not resettable")]
    NotResettable(String),

    #[error("Store {0} already has a pending lazy initialization")]
    LazyInitPending(String),

    #[error("Store {0} has been destroyed")]
    Destroyed(String),

    #[error("Duplicate identifier {id} for key {key} in store {store}")]
    DuplicateIdentifier { store: String, key: String, id: String },

    #[error("Sequence contains no elements")]
    EmptySequence,

    #[error("Cannot mutate a frozen value")]
    Frozen,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Async initialization failed: {0}")]
    AsyncInit(ErrorValue),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corrupted storage entry: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("DevTools protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            StateError::Deserialization(e.to_string())
        } else {
            StateError::Serialization(e.to_string())
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StateError>;
