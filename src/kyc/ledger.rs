//! A reference ledger runtime that owns the world state and executes contract
//! invocations one at a time.
//!
//! Every invocation works on a write buffer over the committed state. The
//! buffer is applied only when the invocation succeeds, so a failed invocation
//! leaves neither records nor counter updates behind.
use std::collections::BTreeMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::kyc::{
    BankData, CallerIdentity, CustomerData, InitSummary, Kyc, KycError, MemoryStore, Provenance,
    RecordId, StateStore, StoreError,
};

type Reply<T> = oneshot::Sender<Result<T, KycError>>;

/// A contract invocation submitted to the ledger.
pub enum Invocation {
    Initialize {
        customers: Vec<CustomerData>,
        banks: Vec<BankData>,
        reply: Reply<InitSummary>,
    },
    InitializeFromJson {
        customers: Vec<u8>,
        banks: Vec<u8>,
        reply: Reply<InitSummary>,
    },
    Provenance {
        caller: CallerIdentity,
        key: String,
        reply: Reply<Provenance>,
    },
    ReadCustomer {
        id: RecordId,
        reply: Reply<CustomerData>,
    },
    ReadBank {
        id: RecordId,
        reply: Reply<BankData>,
    },
}

/// Writes buffered by one invocation on top of the committed state.
struct Transaction<'a> {
    committed: &'a MemoryStore,
    writes: BTreeMap<String, Vec<u8>>,
}

impl<'a> Transaction<'a> {
    fn new(committed: &'a MemoryStore) -> Self {
        Transaction {
            committed,
            writes: BTreeMap::new(),
        }
    }
}

impl StateStore for Transaction<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => self.committed.get_state(key),
        }
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.insert(key.to_string(), value);
        Ok(())
    }
}

/// The ledger runtime, processing invocations received over a channel.
pub struct Ledger {
    /// Committed world state.
    store: MemoryStore,
    /// A channel receiver for incoming invocations.
    receiver: mpsc::Receiver<Invocation>,
}

/// Creates a ledger over `store` together with a handle for submitting
/// invocations to it.
pub fn channel(store: MemoryStore, size: usize) -> (Ledger, LedgerHandle) {
    let (sender, receiver) = mpsc::channel(size);
    (Ledger { store, receiver }, LedgerHandle { sender })
}

impl Ledger {
    /// Gets the committed world state.
    pub fn get_store(&self) -> &MemoryStore {
        &self.store
    }

    /// Releases the committed world state.
    pub fn into_store(self) -> MemoryStore {
        self.store
    }

    /// Runs invocations until every handle has been dropped.
    pub async fn run(&mut self) {
        while let Some(invocation) = self.receiver.recv().await {
            self.dispatch(invocation);
        }
    }

    fn dispatch(&mut self, invocation: Invocation) {
        // A dropped reply receiver only means the caller stopped waiting.
        match invocation {
            Invocation::Initialize {
                customers,
                banks,
                reply,
            } => {
                let result = self.execute("initialize", |kyc| kyc.initialize(&customers, &banks));
                let _ = reply.send(result);
            }
            Invocation::InitializeFromJson {
                customers,
                banks,
                reply,
            } => {
                let result = self.execute("initialize", |kyc| {
                    kyc.initialize_from_json(&customers, &banks)
                });
                let _ = reply.send(result);
            }
            Invocation::Provenance { caller, key, reply } => {
                let result = self.execute("provenance", |kyc| kyc.provenance(&caller, &key));
                let _ = reply.send(result);
            }
            Invocation::ReadCustomer { id, reply } => {
                let result = self.execute("read_customer", |kyc| kyc.read_customer(id));
                let _ = reply.send(result);
            }
            Invocation::ReadBank { id, reply } => {
                let result = self.execute("read_bank", |kyc| kyc.read_bank(id));
                let _ = reply.send(result);
            }
        }
    }

    /// Executes one invocation and commits its writes if it succeeded.
    fn execute<T>(
        &mut self,
        operation: &str,
        invoke: impl FnOnce(&mut Kyc<Transaction<'_>>) -> Result<T, KycError>,
    ) -> Result<T, KycError> {
        let mut kyc = Kyc::new(Transaction::new(&self.store));
        let result = invoke(&mut kyc);
        let writes = kyc.into_inner().writes;
        match &result {
            Ok(_) => self.store.apply(writes),
            Err(e) if writes.is_empty() => debug!(operation, "invocation failed: {e}"),
            Err(e) => warn!(operation, discarded = writes.len(), "invocation rolled back: {e}"),
        }
        result
    }
}

/// Submits invocations to a running [`Ledger`].
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<Invocation>,
}

impl LedgerHandle {
    /// Seeds the ledger with customer and bank records.
    pub async fn initialize(
        &self,
        customers: Vec<CustomerData>,
        banks: Vec<BankData>,
    ) -> Result<InitSummary, KycError> {
        self.invoke(|reply| Invocation::Initialize {
            customers,
            banks,
            reply,
        })
        .await
    }

    /// Seeds the ledger from JSON arrays of customer and bank records. Both
    /// batches are parsed inside the invocation before anything is written.
    pub async fn initialize_from_json(
        &self,
        customers: Vec<u8>,
        banks: Vec<u8>,
    ) -> Result<InitSummary, KycError> {
        self.invoke(|reply| Invocation::InitializeFromJson {
            customers,
            banks,
            reply,
        })
        .await
    }

    /// Checks who registered the customer under `key`.
    pub async fn provenance(
        &self,
        caller: CallerIdentity,
        key: impl Into<String>,
    ) -> Result<Provenance, KycError> {
        let key = key.into();
        self.invoke(|reply| Invocation::Provenance { caller, key, reply })
            .await
    }

    /// Returns true iff the customer under `key` was registered by `caller`.
    pub async fn is_registered_by(
        &self,
        caller: CallerIdentity,
        key: impl Into<String>,
    ) -> Result<bool, KycError> {
        Ok(self.provenance(caller, key).await? == Provenance::RegisteredByCaller)
    }

    /// Reads the customer stored with the given identifier.
    pub async fn read_customer(&self, id: RecordId) -> Result<CustomerData, KycError> {
        self.invoke(|reply| Invocation::ReadCustomer { id, reply })
            .await
    }

    /// Reads the bank stored with the given identifier.
    pub async fn read_bank(&self, id: RecordId) -> Result<BankData, KycError> {
        self.invoke(|reply| Invocation::ReadBank { id, reply }).await
    }

    async fn invoke<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Invocation,
    ) -> Result<T, KycError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| KycError::LedgerClosed)?;
        response.await.map_err(|_| KycError::LedgerClosed)?
    }
}
