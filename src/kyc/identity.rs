//! Resolution of the identity of the entity invoking a contract operation.
use crate::kyc::KycError;

/// Source of the authenticated caller identity for the current invocation.
pub trait ClientIdentity {
    /// Returns the caller's identity string, or the context's own failure message.
    fn caller_id(&self) -> Result<String, String>;
}

/// Identity context of a single invocation, as handed over by the ledger runtime.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    id: Option<String>,
}

impl CallerIdentity {
    /// A context authenticated as `id`.
    pub fn new(id: impl Into<String>) -> Self {
        CallerIdentity {
            id: Some(id.into()),
        }
    }

    /// A context without an authenticated caller.
    pub fn anonymous() -> Self {
        CallerIdentity::default()
    }
}

impl ClientIdentity for CallerIdentity {
    fn caller_id(&self) -> Result<String, String> {
        self.id
            .clone()
            .ok_or_else(|| "no client identity in transaction context".to_string())
    }
}

/// Extracts the canonical identity of the caller. The value is returned as the
/// context supplies it; context failures surface as [`KycError::Identity`].
pub fn resolve_caller_identity(ctx: &impl ClientIdentity) -> Result<String, KycError> {
    ctx.caller_id().map_err(KycError::Identity)
}
