//! Test fixtures and ledger helpers.
//!
//! Provides a ready-made ledger for scenario tests, payload builders for
//! the mutating functions and a store wrapper that fails on demand.

use marbles_core::{Config, CoreResult, Invocation, MarblesContract, Response};
use marbles_storage::{InMemoryStore, KeyValue, KeyValueStore, StorageError, StorageResult};
use bytes::Bytes;
use serde_json::{json, Value};

/// An in-memory store paired with a contract.
#[derive(Debug, Default)]
pub struct TestLedger {
    /// The backing store.
    pub store: InMemoryStore,
    /// The contract under test.
    pub contract: MarblesContract,
}

impl TestLedger {
    /// Creates an empty ledger with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger with `config`.
    pub fn with_config(config: Config) -> Self {
        Self {
            store: InMemoryStore::new(),
            contract: MarblesContract::new(config),
        }
    }

    /// Runs an invocation directly against the store.
    pub fn execute(&mut self, invocation: &Invocation) -> CoreResult<Vec<u8>> {
        self.contract.execute(&mut self.store, invocation)
    }

    /// Runs an invocation inside a store transaction, so a failure leaves
    /// no writes behind.
    pub fn execute_atomic(&self, invocation: &Invocation) -> CoreResult<Vec<u8>> {
        self.store
            .transaction(|txn| self.contract.execute(txn, invocation))
    }

    /// Runs an invocation and returns the host-facing response.
    pub fn invoke(&mut self, invocation: &Invocation) -> Response {
        self.contract.invoke(&mut self.store, invocation)
    }

    /// Creates a marble.
    pub fn create(
        &mut self,
        name: &str,
        color: &str,
        size: i64,
        owner: &str,
        price: i64,
    ) -> CoreResult<()> {
        self.execute(&create_invocation(name, color, size, owner, price))
            .map(drop)
    }

    /// Transfers a marble to `owner`.
    pub fn transfer(&mut self, name: &str, owner: &str) -> CoreResult<()> {
        self.execute(&transfer_invocation(name, owner)).map(drop)
    }

    /// Deletes a marble.
    pub fn delete(&mut self, name: &str) -> CoreResult<()> {
        self.execute(&delete_invocation(name)).map(drop)
    }

    /// Reads a marble record as JSON.
    pub fn read_general(&mut self, name: &str) -> CoreResult<Value> {
        let bytes = self.execute(&Invocation::new("readGeneral").arg(name))?;
        Ok(parse(&bytes))
    }

    /// Reads private details as JSON.
    pub fn read_detail(&mut self, name: &str) -> CoreResult<Value> {
        let bytes = self.execute(&Invocation::new("readDetail").arg(name))?;
        Ok(parse(&bytes))
    }

    /// Runs a query and returns the result elements.
    pub fn query(&mut self, invocation: &Invocation) -> CoreResult<Vec<Value>> {
        let bytes = self.execute(invocation)?;
        Ok(serde_json::from_slice(&bytes).expect("query result is not a JSON array"))
    }

    /// Returns the marble names of a query result, in result order.
    pub fn query_keys(&mut self, invocation: &Invocation) -> CoreResult<Vec<String>> {
        Ok(self
            .query(invocation)?
            .iter()
            .filter_map(|element| element["Key"].as_str().map(str::to_string))
            .collect())
    }
}

fn parse(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("stored record is not JSON")
}

/// Builds the `marble` transient payload.
pub fn create_payload(name: &str, color: &str, size: i64, owner: &str, price: i64) -> String {
    json!({
        "name": name,
        "color": color,
        "size": size,
        "owner": owner,
        "price": price,
    })
    .to_string()
}

/// Builds a `create` invocation.
pub fn create_invocation(name: &str, color: &str, size: i64, owner: &str, price: i64) -> Invocation {
    Invocation::new("create").transient("marble", create_payload(name, color, size, owner, price))
}

/// Builds a `transfer` invocation.
pub fn transfer_invocation(name: &str, owner: &str) -> Invocation {
    Invocation::new("transfer").transient(
        "marble_owner",
        json!({ "name": name, "owner": owner }).to_string(),
    )
}

/// Builds a `delete` invocation.
pub fn delete_invocation(name: &str) -> Invocation {
    Invocation::new("delete").transient("marble_delete", json!({ "name": name }).to_string())
}

/// A store wrapper that fails reads or writes on demand.
#[derive(Debug)]
pub struct FailingStore<'a, S: KeyValueStore + ?Sized> {
    inner: &'a mut S,
    writes_allowed: Option<usize>,
    writes: usize,
    fail_reads: bool,
}

impl<'a, S: KeyValueStore + ?Sized> FailingStore<'a, S> {
    /// Wraps `inner` without injecting failures.
    pub fn new(inner: &'a mut S) -> Self {
        Self {
            inner,
            writes_allowed: None,
            writes: 0,
            fail_reads: false,
        }
    }

    /// Lets `count` writes through, then fails every later write.
    #[must_use]
    pub fn fail_after_writes(mut self, count: usize) -> Self {
        self.writes_allowed = Some(count);
        self
    }

    /// Fails every read.
    #[must_use]
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Returns the number of writes that went through.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn check_read(&self) -> StorageResult<()> {
        if self.fail_reads {
            return Err(StorageError::unavailable("injected read failure"));
        }
        Ok(())
    }

    fn check_write(&mut self) -> StorageResult<()> {
        if self.writes_allowed.is_some_and(|allowed| self.writes >= allowed) {
            return Err(StorageError::unavailable("injected write failure"));
        }
        self.writes += 1;
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for FailingStore<'_, S> {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Bytes>> {
        self.check_read()?;
        self.inner.get(collection, key)
    }

    fn put(&mut self, collection: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.check_write()?;
        self.inner.put(collection, key, value)
    }

    fn delete(&mut self, collection: &str, key: &str) -> StorageResult<()> {
        self.check_write()?;
        self.inner.delete(collection, key)
    }

    fn range(&self, collection: &str, start: &str, end: &str) -> StorageResult<Vec<KeyValue>> {
        self.check_read()?;
        self.inner.range(collection, start, end)
    }

    fn query(&self, collection: &str, expression: &str) -> StorageResult<Vec<KeyValue>> {
        self.check_read()?;
        self.inner.query(collection, expression)
    }
}
