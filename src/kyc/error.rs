//! Errors surfaced by contract operations.
use thiserror::Error;

use crate::kyc::StoreError;

/// Errors that can occur while executing a contract operation.
#[derive(Error, Debug)]
pub enum KycError {
    #[error("Failed to deserialize {what}: {source}")]
    Deserialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize record for {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to read {key} from world state: {source}")]
    StateRead {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("Failed to write {key} into world state: {source}")]
    StateWrite {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("Failed to resolve caller identity: {0}")]
    Identity(String),
    #[error("Counter {key} holds a non-numeric value {value:?}")]
    CorruptCounter { key: String, value: String },
    #[error("Refusing to overwrite the record already stored under {key}")]
    KeyOccupied { key: String },
    #[error("No record stored under {key}")]
    NotFound { key: String },
    #[error("Ledger runtime is no longer accepting invocations")]
    LedgerClosed,
}

impl KycError {
    pub(crate) fn read(key: &str, source: StoreError) -> Self {
        KycError::StateRead {
            key: key.to_string(),
            source,
        }
    }

    pub(crate) fn write(key: &str, source: StoreError) -> Self {
        KycError::StateWrite {
            key: key.to_string(),
            source,
        }
    }

    pub(crate) fn deserialize(what: impl Into<String>, source: serde_json::Error) -> Self {
        KycError::Deserialization {
            what: what.into(),
            source,
        }
    }
}
