//! A KYC registry kept in the world state of a replicated key-value ledger.
pub mod kyc;
