//! KYC registry contract: onboarding records, sequential identifiers and
//! provenance checks over a key-value world state.
mod contract;
mod error;
mod identity;
pub mod ledger;
mod records;
mod store;
mod types;

pub use contract::*;
pub use error::*;
pub use identity::*;
pub use records::*;
pub use store::*;
pub use types::*;
