//! The optional live handle (pool or client) owned by a networked adapter.

use std::sync::RwLock;

use crate::db::{DbError, DbResult};

/// Holds zero or one native handle.
///
/// Handles are cheap to clone (pools and clients are reference counted), so
/// readers take a clone and never hold the lock across an await.
pub(crate) struct HandleSlot<T> {
    label: &'static str,
    inner: RwLock<Option<T>>,
}

impl<T: Clone> HandleSlot<T> {
    /// `label` names the backend in error messages, e.g. `PostgreSQL`.
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            label,
            inner: RwLock::new(None),
        }
    }

    fn lock_failed(&self, e: impl std::fmt::Display) -> DbError {
        DbError::connection(format!("Failed to acquire {} handle lock: {}", self.label, e))
    }

    /// The live handle, or a connection error when there is none.
    pub(crate) fn get(&self) -> DbResult<T> {
        let guard = self.inner.read().map_err(|e| self.lock_failed(e))?;
        guard
            .clone()
            .ok_or_else(|| DbError::connection(format!("{} adapter is not connected", self.label)))
    }

    pub(crate) fn is_set(&self) -> bool {
        self.inner.read().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Store `handle` unless one is already live.
    ///
    /// Returns the rejected handle when another caller got there first, so
    /// the caller can close it.
    pub(crate) fn install(&self, handle: T) -> DbResult<Option<T>> {
        let mut guard = self.inner.write().map_err(|e| self.lock_failed(e))?;
        if guard.is_some() {
            return Ok(Some(handle));
        }
        *guard = Some(handle);
        Ok(None)
    }

    /// Remove and return the live handle, if any.
    pub(crate) fn take(&self) -> DbResult<Option<T>> {
        let mut guard = self.inner.write().map_err(|e| self.lock_failed(e))?;
        Ok(guard.take())
    }
}
