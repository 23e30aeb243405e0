//! Shared context: the single channel between concurrent steps of a case
//!
//! One `SharedContext` exists per (case, table) execution. All parallel step
//! threads of that execution share it, exchanging state through a named
//! property store and observing the cooperative stop flag through it.
//!
//! Locking: a single mutex guards the property map and the stop flag; every
//! mutation broadcasts on the paired condvar. Waiters always re-check their
//! predicate after waking, since a broadcast is not filtered by the
//! predicate it satisfies.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use gauntlet_core::PropertyValue;

struct ContextInner {
    props: HashMap<String, PropertyValue>,
    stopped: bool,
}

/// Mutex+condvar protected property store plus stop flag, shared by all
/// steps of one test-case execution.
///
/// The stop flag is monotonic within one execution: once set it stays set
/// until the context is discarded. Stopping is advisory: steps observe it
/// via [`SharedContext::is_stopped`] and exit early by convention; nothing
/// interrupts a step that does not poll.
pub struct SharedContext {
    inner: Mutex<ContextInner>,
    cond: Condvar,
    tables: Vec<String>,
    records: u64,
    loops: u64,
}

impl SharedContext {
    /// Create a fresh context for one execution against `table`.
    pub fn new(table: impl Into<String>, records: u64, loops: u64) -> Self {
        Self::with_tables(vec![table.into()], records, loops)
    }

    /// Create a fresh context carrying a fixed table set (run-once mode).
    ///
    /// The first table is the primary one reported by [`SharedContext::table`].
    pub fn with_tables(tables: Vec<String>, records: u64, loops: u64) -> Self {
        assert!(!tables.is_empty(), "a context needs at least one table");
        SharedContext {
            inner: Mutex::new(ContextInner {
                props: HashMap::new(),
                stopped: false,
            }),
            cond: Condvar::new(),
            tables,
            records,
            loops,
        }
    }

    /// The table under test (primary table in run-once mode).
    pub fn table(&self) -> &str {
        &self.tables[0]
    }

    /// All tables of this execution. A single-element slice outside
    /// run-once mode.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Configured record count for operations in this execution.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Configured loop count for operations in this execution.
    pub fn loops(&self) -> u64 {
        self.loops
    }

    /// Read an integer property, or `default` if absent or not an integer.
    pub fn get_u32(&self, name: &str, default: u32) -> u32 {
        let inner = self.inner.lock();
        inner
            .props
            .get(name)
            .and_then(PropertyValue::as_u32)
            .unwrap_or(default)
    }

    /// Read a string property, or `default` if absent or not a string.
    pub fn get_string(&self, name: &str, default: &str) -> String {
        let inner = self.inner.lock();
        inner
            .props
            .get(name)
            .and_then(PropertyValue::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Store a property value and wake all waiters.
    pub fn set(&self, name: &str, value: impl Into<PropertyValue>) {
        let mut inner = self.inner.lock();
        inner.props.insert(name.to_string(), value.into());
        self.cond.notify_all();
    }

    /// Block until the integer property `name` equals `target`, or until the
    /// context is stopped.
    ///
    /// Returns `true` if the property reached the target, `false` if the
    /// context was stopped first.
    pub fn wait_for_u32(&self, name: &str, target: u32) -> bool {
        let mut inner = self.inner.lock();
        loop {
            if inner.props.get(name).and_then(PropertyValue::as_u32) == Some(target) {
                return true;
            }
            if inner.stopped {
                return false;
            }
            self.cond.wait(&mut inner);
        }
    }

    /// Increment an integer counter property, creating it at 1 if absent,
    /// and wake all waiters.
    ///
    /// # Panics
    ///
    /// Panics if the property holds a string; that is a bug in the test,
    /// not an environment condition.
    pub fn increment(&self, name: &str) {
        let mut inner = self.inner.lock();
        let next = match inner.props.get(name) {
            None => 1,
            Some(PropertyValue::Int(v)) => v.checked_add(1).expect("counter property overflow"),
            Some(PropertyValue::Str(_)) => panic!("increment of string property '{}'", name),
        };
        inner.props.insert(name.to_string(), PropertyValue::Int(next));
        self.cond.notify_all();
    }

    /// Decrement an integer counter property and wake all waiters. A
    /// counter reaching zero is removed, so N increments followed by N
    /// decrements restore the unset state.
    ///
    /// # Panics
    ///
    /// Panics if the property is absent or holds a string. Counters never
    /// go negative; decrementing past zero is a bug in the test.
    pub fn decrement(&self, name: &str) {
        let mut inner = self.inner.lock();
        let value = match inner.props.get(name) {
            Some(PropertyValue::Int(v)) => *v,
            Some(PropertyValue::Str(_)) => panic!("decrement of string property '{}'", name),
            None => panic!("decrement of absent counter property '{}'", name),
        };
        assert!(value > 0, "decrement of zero counter property '{}'", name);
        if value == 1 {
            inner.props.remove(name);
        } else {
            inner.props.insert(name.to_string(), PropertyValue::Int(value - 1));
        }
        self.cond.notify_all();
    }

    /// Signal every step of this execution to halt early. Idempotent and
    /// safe to call concurrently from any number of threads.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.stopped = true;
        self.cond.notify_all();
    }

    /// True once [`SharedContext::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// Block until any property change, stop, or explicit wake. Callers
    /// re-check whatever condition they are waiting for.
    pub fn wait(&self) {
        let mut inner = self.inner.lock();
        self.cond.wait(&mut inner);
    }

    /// Like [`SharedContext::wait`], bounded by `timeout`.
    ///
    /// Returns `true` if woken by a notification, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut inner = self.inner.lock();
        !self.cond.wait_for(&mut inner, timeout).timed_out()
    }
}
