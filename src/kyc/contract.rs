//! The KYC contract: ledger bootstrap and provenance checks over world state.
//!
//! Counters live in world state next to the records they number, so every
//! invocation observes the identifiers left behind by the previous one.
use std::ops::Range;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::kyc::{
    BankData, ClientIdentity, CustomerData, KycError, RecordId, RecordKind, StateStore,
    resolve_caller_identity,
};

/// Identifiers assigned by one call to [`Kyc::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSummary {
    /// Identifiers given to the customer batch, in input order.
    pub customers: Range<RecordId>,
    /// Identifiers given to the bank batch, in input order.
    pub banks: Range<RecordId>,
}

/// Outcome of checking who registered a customer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Nothing is stored under the key.
    Missing,
    /// The record was registered by the calling organization.
    RegisteredByCaller,
    /// The record was registered by some other organization.
    RegisteredByOther,
}

/// The contract, bound to the world state of the current invocation.
pub struct Kyc<S> {
    stub: S,
}

impl<S: StateStore> Kyc<S> {
    /// Binds the contract to a world state.
    pub fn new(stub: S) -> Self {
        Kyc { stub }
    }

    /// Releases the world state.
    pub fn into_inner(self) -> S {
        self.stub
    }

    /// Stores every customer, then every bank, each under the next identifier
    /// of its own counter.
    ///
    /// Records are written one at a time in input order. The first failure
    /// stops the operation and records written before it stay in place. A key
    /// that already holds a record is never overwritten.
    /// Calling this twice with the same input stores the records twice.
    pub fn initialize(
        &mut self,
        customers: &[CustomerData],
        banks: &[BankData],
    ) -> Result<InitSummary, KycError> {
        let customers = self.ingest(RecordKind::Customer, customers)?;
        let banks = self.ingest(RecordKind::Bank, banks)?;
        Ok(InitSummary { customers, banks })
    }

    /// Same as [`Kyc::initialize`], taking both batches as JSON arrays.
    /// Both batches are parsed before anything is written.
    pub fn initialize_from_json(
        &mut self,
        customers: &[u8],
        banks: &[u8],
    ) -> Result<InitSummary, KycError> {
        let customers: Vec<CustomerData> = serde_json::from_slice(customers)
            .map_err(|e| KycError::deserialize("customer batch", e))?;
        let banks: Vec<BankData> =
            serde_json::from_slice(banks).map_err(|e| KycError::deserialize("bank batch", e))?;
        self.initialize(&customers, &banks)
    }

    /// Determines whether the customer stored under `key` was registered by
    /// the caller, comparing the caller identity with `registeredBy.orgName`
    /// exactly.
    pub fn provenance(
        &self,
        ctx: &impl ClientIdentity,
        key: &str,
    ) -> Result<Provenance, KycError> {
        let Some(customer) = self.read::<CustomerData>(key)? else {
            return Ok(Provenance::Missing);
        };
        let caller = resolve_caller_identity(ctx)?;
        if customer.get_registered_by().get_org_name() == caller {
            Ok(Provenance::RegisteredByCaller)
        } else {
            Ok(Provenance::RegisteredByOther)
        }
    }

    /// Returns true iff the customer under `key` was registered by the caller.
    /// A key with nothing stored under it yields `false`.
    pub fn is_registered_by(
        &self,
        ctx: &impl ClientIdentity,
        key: &str,
    ) -> Result<bool, KycError> {
        Ok(self.provenance(ctx, key)? == Provenance::RegisteredByCaller)
    }

    /// Reads the customer stored with the given identifier.
    pub fn read_customer(&self, id: RecordId) -> Result<CustomerData, KycError> {
        let key = RecordKind::Customer.key(id);
        self.read(&key)?.ok_or(KycError::NotFound { key })
    }

    /// Reads the bank stored with the given identifier.
    pub fn read_bank(&self, id: RecordId) -> Result<BankData, KycError> {
        let key = RecordKind::Bank.key(id);
        self.read(&key)?.ok_or(KycError::NotFound { key })
    }

    /// Gets the identifiers the next customer and the next bank would receive.
    pub fn next_ids(&self) -> Result<(RecordId, RecordId), KycError> {
        Ok((
            self.counter(RecordKind::Customer)?,
            self.counter(RecordKind::Bank)?,
        ))
    }

    fn ingest<T: Serialize>(
        &mut self,
        kind: RecordKind,
        records: &[T],
    ) -> Result<Range<RecordId>, KycError> {
        let first = self.counter(kind)?;
        let mut next = first;
        for record in records {
            let key = kind.key(next);
            // Records are write-once: a taken key means the counter lags its records.
            if self.stub.get_state(&key).map_err(|e| KycError::read(&key, e))?.is_some() {
                return Err(KycError::KeyOccupied { key });
            }
            let value = serde_json::to_vec(record).map_err(|source| KycError::Serialization {
                key: key.clone(),
                source,
            })?;
            self.stub
                .put_state(&key, value)
                .map_err(|e| KycError::write(&key, e))?;

            next += 1;
            let counter_key = kind.counter_key();
            self.stub
                .put_state(counter_key, next.to_string().into_bytes())
                .map_err(|e| KycError::write(counter_key, e))?;
            debug!(%key, "stored record");
        }
        info!(kind = kind.prefix(), count = records.len(), first, "ingested batch");
        Ok(first..next)
    }

    fn counter(&self, kind: RecordKind) -> Result<RecordId, KycError> {
        let key = kind.counter_key();
        let Some(raw) = self.stub.get_state(key).map_err(|e| KycError::read(key, e))? else {
            return Ok(0);
        };
        let value = String::from_utf8_lossy(&raw);
        value.parse().map_err(|_| KycError::CorruptCounter {
            key: key.to_string(),
            value: value.into_owned(),
        })
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, KycError> {
        let Some(raw) = self.stub.get_state(key).map_err(|e| KycError::read(key, e))? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| KycError::deserialize(format!("record under {key}"), e))
    }
}

#[cfg(test)]
mod tests {
    use crate::kyc::{
        BankData, CallerIdentity, CustomerData, Kyc, KycError, MemoryStore, OrgCredentials,
        Provenance, StateStore,
    };

    fn customer(name: &str, org: &str) -> CustomerData {
        CustomerData::new(name, 100, OrgCredentials::new(org, 1))
    }

    fn bank(name: &str) -> BankData {
        BankData::new(name, 7, OrgCredentials::new(name, 2))
    }

    #[test]
    fn test_sequential_identifiers() {
        let mut kyc = Kyc::new(MemoryStore::new());
        let customers = vec![
            customer("Alice", "OrgA"),
            customer("Bob", "OrgA"),
            customer("Carol", "OrgB"),
        ];
        let summary = kyc.initialize(&customers, &[]).unwrap();
        assert_eq!(summary.customers, 0..3);
        assert_eq!(kyc.next_ids().unwrap(), (3, 0));
        for (id, expected) in customers.iter().enumerate() {
            assert_eq!(&kyc.read_customer(id as u64).unwrap(), expected);
        }
    }

    #[test]
    fn test_counter_continues_from_previous_call() {
        let mut kyc = Kyc::new(MemoryStore::new());
        kyc.initialize(&[customer("Alice", "OrgA")], &[]).unwrap();
        let summary = kyc
            .initialize(&[customer("Bob", "OrgA"), customer("Carol", "OrgA")], &[])
            .unwrap();
        assert_eq!(summary.customers, 1..3);
        assert_eq!(kyc.read_customer(2).unwrap().get_name(), "Carol");
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let mut kyc = Kyc::new(MemoryStore::new());
        let summary = kyc
            .initialize(&[customer("Alice", "OrgA")], &[bank("First Bank")])
            .unwrap();
        assert_eq!(summary.customers, 0..1);
        assert_eq!(summary.banks, 0..1);
        assert_eq!(kyc.read_customer(0).unwrap().get_name(), "Alice");
        assert_eq!(kyc.read_bank(0).unwrap().get_name(), "First Bank");
        assert_eq!(
            kyc.read_bank(0).unwrap().get_org_credentials().get_org_name(),
            "First Bank"
        );
        assert_eq!(kyc.next_ids().unwrap(), (1, 1));
    }

    #[test]
    fn test_reinitialize_duplicates_records() {
        let mut kyc = Kyc::new(MemoryStore::new());
        let batch = vec![customer("Alice", "OrgA"), customer("Bob", "OrgB")];
        let first = kyc.initialize(&batch, &[]).unwrap();
        let second = kyc.initialize(&batch, &[]).unwrap();
        assert_eq!(first.customers, 0..2);
        assert_eq!(second.customers, 2..4);
        assert_eq!(kyc.read_customer(0).unwrap(), kyc.read_customer(2).unwrap());
        assert_eq!(kyc.into_inner().len(), 4 + 1);
    }

    #[test]
    fn test_write_failure_keeps_earlier_records() {
        let mut store = MemoryStore::new();
        // Alice and her counter update, then Bob's record write fails.
        store.fail_writes_after(2);
        let mut kyc = Kyc::new(&mut store);
        let result = kyc.initialize(&[customer("Alice", "OrgA"), customer("Bob", "OrgA")], &[]);
        match result {
            Err(KycError::StateWrite { key, .. }) => assert_eq!(key, "customer:1"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(kyc.read_customer(0).unwrap().get_name(), "Alice");
        assert!(matches!(kyc.read_customer(1), Err(KycError::NotFound { .. })));
        assert_eq!(kyc.next_ids().unwrap(), (1, 0));
    }

    #[test]
    fn test_counter_write_failure_never_overwrites() {
        let mut store = MemoryStore::new();
        // Alice's record is stored, her counter update fails.
        store.fail_writes_after(1);
        let result = Kyc::new(&mut store).initialize(&[customer("Alice", "OrgA")], &[]);
        match result {
            Err(KycError::StateWrite { key, .. }) => assert_eq!(key, "counter:customer"),
            other => panic!("unexpected result: {other:?}"),
        }

        store.allow_writes();
        let mut kyc = Kyc::new(&mut store);
        assert_eq!(kyc.next_ids().unwrap(), (0, 0));
        match kyc.initialize(&[customer("Bob", "OrgB")], &[]) {
            Err(KycError::KeyOccupied { key }) => assert_eq!(key, "customer:0"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(kyc.read_customer(0).unwrap().get_name(), "Alice");
    }

    #[test]
    fn test_malformed_batch_writes_nothing() {
        let mut kyc = Kyc::new(MemoryStore::new());
        let customers = br#"[{"name":"Alice","dateOfBirth":"1990-01-01","address":"x","idNumber":1,"phoneNumber":"1","registeredBy":{"orgName":"OrgA","orgNum":1}}]"#;
        let result = kyc.initialize_from_json(customers, br#"[{"name":"Broken"}]"#);
        assert!(matches!(result, Err(KycError::Deserialization { .. })));
        assert!(kyc.into_inner().is_empty());
    }

    #[test]
    fn test_initialize_from_json() {
        let mut kyc = Kyc::new(MemoryStore::new());
        let customers = br#"[{"name":"Alice","dateOfBirth":"1990-01-01","address":"x","idNumber":1,"phoneNumber":"1","registeredBy":{"orgName":"OrgA","orgNum":1}}]"#;
        let banks = br#"[{"name":"First Bank","idNumber":5,"orgCredentials":{"orgName":"Org1MSP","orgNum":1}}]"#;
        let summary = kyc.initialize_from_json(customers, banks).unwrap();
        assert_eq!(summary.customers, 0..1);
        assert_eq!(summary.banks, 0..1);
    }

    #[test]
    fn test_provenance_exact_match() {
        let mut kyc = Kyc::new(MemoryStore::new());
        kyc.initialize(&[customer("Alice", "OrgA")], &[]).unwrap();

        assert!(
            kyc.is_registered_by(&CallerIdentity::new("OrgA"), "customer:0")
                .unwrap()
        );
        for other in ["orga", "Org", "OrgAB", " OrgA", "OrgB"] {
            assert!(
                !kyc.is_registered_by(&CallerIdentity::new(other), "customer:0")
                    .unwrap()
            );
        }
        assert_eq!(
            kyc.provenance(&CallerIdentity::new("OrgB"), "customer:0")
                .unwrap(),
            Provenance::RegisteredByOther
        );
    }

    #[test]
    fn test_missing_record_is_not_registered() {
        let kyc = Kyc::new(MemoryStore::new());
        let caller = CallerIdentity::new("OrgA");
        assert!(!kyc.is_registered_by(&caller, "customer:42").unwrap());
        assert_eq!(
            kyc.provenance(&caller, "customer:42").unwrap(),
            Provenance::Missing
        );
    }

    #[test]
    fn test_missing_record_skips_identity() {
        let kyc = Kyc::new(MemoryStore::new());
        assert!(!kyc
            .is_registered_by(&CallerIdentity::anonymous(), "customer:0")
            .unwrap());
    }

    #[test]
    fn test_read_failure_propagates() {
        let mut store = MemoryStore::new();
        Kyc::new(&mut store)
            .initialize(&[customer("Alice", "OrgA")], &[])
            .unwrap();
        store.fail_reads();
        let kyc = Kyc::new(&mut store);
        assert!(matches!(
            kyc.is_registered_by(&CallerIdentity::new("OrgA"), "customer:0"),
            Err(KycError::StateRead { .. })
        ));
    }

    #[test]
    fn test_identity_failure_propagates() {
        let mut kyc = Kyc::new(MemoryStore::new());
        kyc.initialize(&[customer("Alice", "OrgA")], &[]).unwrap();
        assert!(matches!(
            kyc.is_registered_by(&CallerIdentity::anonymous(), "customer:0"),
            Err(KycError::Identity(_))
        ));
    }

    #[test]
    fn test_corrupted_record() {
        let mut store = MemoryStore::new();
        store.put_state("customer:0", b"not json".to_vec()).unwrap();
        let kyc = Kyc::new(store);
        assert!(matches!(
            kyc.is_registered_by(&CallerIdentity::new("OrgA"), "customer:0"),
            Err(KycError::Deserialization { .. })
        ));
    }

    #[test]
    fn test_corrupted_counter() {
        let mut store = MemoryStore::new();
        store.put_state("counter:bank", b"seven".to_vec()).unwrap();
        let mut kyc = Kyc::new(store);
        assert!(matches!(
            kyc.initialize(&[], &[bank("First Bank")]),
            Err(KycError::CorruptCounter { .. })
        ));
    }
}
