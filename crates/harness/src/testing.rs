//! Scripted in-memory driver for exercising the framework without a backend
//!
//! This module provides tools for testing the orchestration layer itself:
//!
//! - **ScriptedDriver**: an in-memory [`Driver`] whose failures are scripted
//!   per operation, so tests can simulate a flaky or unreachable cluster
//! - **MemConnection**: the matching [`Connection`], with a tiny transactional
//!   row store that step bodies reach by downcasting through `as_any`
//!
//! Scripted errors are consumed in FIFO order: each backend operation first
//! checks the script and fails with the queued error if one is pending.
//! Connection setup has its own queue, distinct from operation errors.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use gauntlet_core::{Connection, Driver, DriverError, DriverResult};

type RowStore = HashMap<String, BTreeMap<u32, u32>>;

struct DriverState {
    tables: Mutex<RowStore>,
    connect_errors: Mutex<VecDeque<DriverError>>,
    op_errors: Mutex<VecDeque<DriverError>>,
    connects: AtomicUsize,
}

impl DriverState {
    fn next_op_error(&self) -> DriverResult<()> {
        match self.op_errors.lock().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// In-memory driver with scripted failures.
pub struct ScriptedDriver {
    state: Arc<DriverState>,
}

impl ScriptedDriver {
    /// Driver with no tables and an empty failure script.
    pub fn new() -> Self {
        ScriptedDriver {
            state: Arc::new(DriverState {
                tables: Mutex::new(HashMap::new()),
                connect_errors: Mutex::new(VecDeque::new()),
                op_errors: Mutex::new(VecDeque::new()),
                connects: AtomicUsize::new(0),
            }),
        }
    }

    /// Driver with the given tables pre-created.
    pub fn with_tables(names: &[&str]) -> Self {
        let driver = Self::new();
        {
            let mut tables = driver.state.tables.lock();
            for name in names {
                tables.insert((*name).to_string(), BTreeMap::new());
            }
        }
        driver
    }

    /// Queue an error for the next connection attempt.
    pub fn fail_next_connect(&self, error: DriverError) {
        self.state.connect_errors.lock().push_back(error);
    }

    /// Queue an error to be consumed by the next connection operation
    /// (begin/commit/rollback/row access), in FIFO order.
    pub fn script_op_error(&self, error: DriverError) {
        self.state.op_errors.lock().push_back(error);
    }

    /// Queue `n` copies of the same operation error.
    pub fn script_op_errors(&self, error: DriverError, n: usize) {
        let mut q = self.state.op_errors.lock();
        for _ in 0..n {
            q.push_back(error.clone());
        }
    }

    /// Number of connection attempts made so far (successful or not).
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::Relaxed)
    }

    /// Number of committed rows in `table` (0 if the table is missing).
    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .tables
            .lock()
            .get(table)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for ScriptedDriver {
    fn connect(&self) -> DriverResult<Box<dyn Connection>> {
        self.state.connects.fetch_add(1, Ordering::Relaxed);
        if let Some(e) = self.state.connect_errors.lock().pop_front() {
            return Err(e);
        }
        Ok(Box::new(MemConnection {
            state: Arc::clone(&self.state),
            in_txn: false,
            pending: Vec::new(),
        }))
    }

    fn create_table(&self, name: &str) -> DriverResult<()> {
        let mut tables = self.state.tables.lock();
        if tables.contains_key(name) {
            return Err(DriverError::expected(721, format!("table exists: {}", name)));
        }
        tables.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    fn drop_table(&self, name: &str) -> DriverResult<()> {
        let mut tables = self.state.tables.lock();
        if tables.remove(name).is_none() {
            return Err(DriverError::expected(723, format!("no such table: {}", name)));
        }
        Ok(())
    }

    fn table_exists(&self, name: &str) -> bool {
        self.state.tables.lock().contains_key(name)
    }
}

enum PendingWrite {
    Insert(String, u32, u32),
    Delete(String, u32),
}

/// Connection to a [`ScriptedDriver`]: transactional writes against the
/// in-memory row store.
///
/// Writes are buffered from `begin` and applied atomically at `commit`;
/// `rollback` discards them. Step bodies obtain the concrete type with
/// `run.connection().as_any().downcast_mut::<MemConnection>()`.
pub struct MemConnection {
    state: Arc<DriverState>,
    in_txn: bool,
    pending: Vec<PendingWrite>,
}

impl MemConnection {
    /// Buffer an insert. Duplicate keys (committed or pending) fail with an
    /// `Expected` error, matching an idempotent-load workload.
    pub fn insert_row(&mut self, table: &str, key: u32, value: u32) -> DriverResult<()> {
        self.state.next_op_error()?;
        self.require_txn()?;
        let committed = self
            .state
            .tables
            .lock()
            .get(table)
            .is_some_and(|rows| rows.contains_key(&key));
        let pending = self.pending.iter().any(
            |w| matches!(w, PendingWrite::Insert(t, k, _) if t == table && *k == key),
        );
        if committed || pending {
            return Err(DriverError::expected(
                630,
                format!("row already exists: {}[{}]", table, key),
            ));
        }
        self.pending
            .push(PendingWrite::Insert(table.to_string(), key, value));
        Ok(())
    }

    /// Buffer a delete. A missing row fails with an `Expected` error,
    /// matching a tolerant-delete workload.
    pub fn delete_row(&mut self, table: &str, key: u32) -> DriverResult<()> {
        self.state.next_op_error()?;
        self.require_txn()?;
        let committed = self
            .state
            .tables
            .lock()
            .get(table)
            .is_some_and(|rows| rows.contains_key(&key));
        if !committed {
            return Err(DriverError::expected(
                626,
                format!("row not found: {}[{}]", table, key),
            ));
        }
        self.pending.push(PendingWrite::Delete(table.to_string(), key));
        Ok(())
    }

    /// Read a committed row (pending writes of this transaction are not
    /// visible).
    pub fn read_row(&mut self, table: &str, key: u32) -> DriverResult<Option<u32>> {
        self.state.next_op_error()?;
        Ok(self
            .state
            .tables
            .lock()
            .get(table)
            .and_then(|rows| rows.get(&key).copied()))
    }

    fn require_txn(&self) -> DriverResult<()> {
        if !self.in_txn {
            return Err(DriverError::fatal(4401, "no open transaction"));
        }
        Ok(())
    }
}

impl Connection for MemConnection {
    fn begin(&mut self) -> DriverResult<()> {
        self.state.next_op_error()?;
        if self.in_txn {
            return Err(DriverError::fatal(4400, "transaction already open"));
        }
        self.in_txn = true;
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.state.next_op_error()?;
        self.require_txn()?;
        let mut tables = self.state.tables.lock();
        for write in self.pending.drain(..) {
            match write {
                PendingWrite::Insert(table, key, value) => {
                    tables.entry(table).or_default().insert(key, value);
                }
                PendingWrite::Delete(table, key) => {
                    if let Some(rows) = tables.get_mut(&table) {
                        rows.remove(&key);
                    }
                }
            }
        }
        self.in_txn = false;
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.state.next_op_error()?;
        self.require_txn()?;
        self.pending.clear();
        self.in_txn = false;
        Ok(())
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}
