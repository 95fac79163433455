//! Types and key layout used throughout the KYC registry.

/// Sequential identifier assigned to a stored record.
pub type RecordId = u64;

/// Key prefix for customer records.
pub const CUSTOMER_PREFIX: &str = "customer";

/// Key prefix for bank records.
pub const BANK_PREFIX: &str = "bank";

/// Reserved key holding `NextClientID`.
pub const CUSTOMER_COUNTER_KEY: &str = "counter:customer";

/// Reserved key holding `NextBankID`.
pub const BANK_COUNTER_KEY: &str = "counter:bank";

/// The kind of record stored under a key. Each kind owns its own key
/// namespace and its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Customer,
    Bank,
}

impl RecordKind {
    /// The key prefix of this record kind.
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Customer => CUSTOMER_PREFIX,
            RecordKind::Bank => BANK_PREFIX,
        }
    }

    /// The reserved key of the counter for this record kind.
    pub fn counter_key(self) -> &'static str {
        match self {
            RecordKind::Customer => CUSTOMER_COUNTER_KEY,
            RecordKind::Bank => BANK_COUNTER_KEY,
        }
    }

    /// Builds the state key for the record with the given identifier.
    pub fn key(self, id: RecordId) -> String {
        format!("{}:{id}", self.prefix())
    }

    /// Parses a state key back into its kind and identifier.
    pub fn parse_key(key: &str) -> Option<(RecordKind, RecordId)> {
        let (prefix, id) = key.split_once(':')?;
        let kind = match prefix {
            CUSTOMER_PREFIX => RecordKind::Customer,
            BANK_PREFIX => RecordKind::Bank,
            _ => return None,
        };
        Some((kind, id.parse().ok()?))
    }
}
