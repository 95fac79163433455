//! Reading of the seed batches handed to the ledger at initialization time.
//!
//! Batches are passed on as raw JSON; the contract parses them before it
//! writes anything.
use std::{fs, io, path::Path};

use anyhow::{Context, Result};

/// Batch used when no bank file is present.
const EMPTY_BATCH: &[u8] = b"[]";

fn read_batch(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Reads the customer batch. The file must exist.
pub fn read_customers(path: &Path) -> Result<Vec<u8>> {
    read_batch(path)
}

/// Reads the bank batch. A missing file is an empty batch.
pub fn read_banks(path: &Path) -> Result<Vec<u8>> {
    match fs::metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EMPTY_BATCH.to_vec()),
        _ => read_batch(path),
    }
}
