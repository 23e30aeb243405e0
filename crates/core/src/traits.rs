//! Driver traits: the seam between the framework and the backend under test
//!
//! The framework never talks to a concrete backend. It sees a [`Driver`]
//! that hands out per-step [`Connection`]s and manages table schemas, so a
//! real clustered backend and the scripted in-memory driver used by the
//! framework's own tests are interchangeable.

use std::any::Any;

use crate::error::DriverResult;

/// Factory for per-step connections and schema management.
///
/// Thread safety: `connect` is called concurrently from every parallel step
/// thread of a test case (requires Send + Sync). Schema operations are only
/// called from the orchestrating thread, between case executions.
pub trait Driver: Send + Sync {
    /// Establish a connection, waiting (bounded) for backend readiness.
    ///
    /// A readiness timeout is a connection failure, not a hang: the driver
    /// decides the bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or not ready within
    /// the driver's bound.
    fn connect(&self) -> DriverResult<Box<dyn Connection>>;

    /// Create the named table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table already exists or creation fails.
    fn create_table(&self, name: &str) -> DriverResult<()>;

    /// Drop the named table.
    ///
    /// # Errors
    ///
    /// Returns an error if the drop fails. Dropping a missing table is a
    /// driver-classified `Expected` error, not a framework failure.
    fn drop_table(&self, name: &str) -> DriverResult<()>;

    /// True if the named table currently exists.
    fn table_exists(&self, name: &str) -> bool;
}

/// A backend connection, exclusively owned by one step between its setup
/// and teardown.
///
/// The framework itself only needs transaction boundaries; step bodies reach
/// driver-specific operations by downcasting through [`Connection::as_any`].
pub trait Connection: Send {
    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the transaction start.
    fn begin(&mut self) -> DriverResult<()>;

    /// Commit the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; temporary errors are the
    /// common case under contention.
    fn commit(&mut self) -> DriverResult<()>;

    /// Roll back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    fn rollback(&mut self) -> DriverResult<()>;

    /// Downcast access for driver-specific operations.
    fn as_any(&mut self) -> &mut dyn Any;
}
