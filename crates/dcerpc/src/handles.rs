//! Server-side context handle table
//!
//! Maps the opaque UUID inside a [`ContextHandle`] to the server state it
//! names. A handle stays valid until it is closed or revoked. Handles opened
//! while a call is dispatched remember the connection that opened them, so
//! a disconnect can revoke just that connection's handles. Lookups of nil,
//! unknown, closed or revoked handles all fail with
//! [`RpcError::InvalidHandle`].

use std::collections::HashMap;

use msrpc_ndr::{ContextHandle, Guid};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::connection::{current_connection, ConnectionId};
use crate::error::{Result, RpcError};

struct Entry<T> {
    owner: Option<ConnectionId>,
    value: T,
}

pub struct HandleTable<T> {
    entries: Mutex<HashMap<Guid, Entry<T>>>,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `value` under a fresh handle owned by the calling connection.
    pub fn open(&self, value: T) -> ContextHandle {
        self.open_owned(current_connection(), value)
    }

    /// Store `value` under a fresh handle with an explicit owner. Handles
    /// with no owner are only dropped by [`close`](Self::close) or
    /// [`revoke_all`](Self::revoke_all).
    pub fn open_owned(&self, owner: Option<ConnectionId>, value: T) -> ContextHandle {
        let mut entries = self.entries.lock();
        let uuid = loop {
            let uuid = Guid::from_u128(uuid::Uuid::new_v4().as_u128());
            if !entries.contains_key(&uuid) {
                break uuid;
            }
        };
        entries.insert(uuid, Entry { owner, value });
        let handle = ContextHandle::new(0, uuid);
        match owner {
            Some(owner) => debug!("Opened context handle {} for {}", handle, owner),
            None => debug!("Opened context handle {}", handle),
        }
        handle
    }

    /// Run `f` against the state behind `handle`.
    pub fn with<R>(&self, handle: &ContextHandle, f: impl FnOnce(&T) -> R) -> Result<R> {
        let entries = self.entries.lock();
        let entry = Self::lookup(&entries, handle)?;
        Ok(f(&entry.value))
    }

    pub fn with_mut<R>(&self, handle: &ContextHandle, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut entries = self.entries.lock();
        if handle.is_nil() {
            return Err(RpcError::InvalidHandle);
        }
        match entries.get_mut(&handle.uuid) {
            Some(entry) => Ok(f(&mut entry.value)),
            None => {
                warn!("Unknown context handle {}", handle);
                Err(RpcError::InvalidHandle)
            }
        }
    }

    /// Remove the handle and return its state. A second close fails.
    pub fn close(&self, handle: &ContextHandle) -> Result<T> {
        if handle.is_nil() {
            return Err(RpcError::InvalidHandle);
        }
        let removed = self.entries.lock().remove(&handle.uuid);
        match removed {
            Some(entry) => {
                debug!("Closed context handle {}", handle);
                Ok(entry.value)
            }
            None => {
                warn!("Close of unknown context handle {}", handle);
                Err(RpcError::InvalidHandle)
            }
        }
    }

    /// Connection that opened `handle`
    pub fn owner(&self, handle: &ContextHandle) -> Result<Option<ConnectionId>> {
        let entries = self.entries.lock();
        Ok(Self::lookup(&entries, handle)?.owner)
    }

    /// Drop the handles opened by `owner`, returning how many were live.
    pub fn revoke_owner(&self, owner: ConnectionId) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.owner != Some(owner));
        let revoked = before - entries.len();
        if revoked > 0 {
            debug!("Revoked {} context handles of {}", revoked, owner);
        }
        revoked
    }

    /// Drop every handle, returning how many were live.
    pub fn revoke_all(&self) -> usize {
        let drained: Vec<Entry<T>> = self.entries.lock().drain().map(|(_, e)| e).collect();
        if !drained.is_empty() {
            debug!("Revoked {} context handles", drained.len());
        }
        drained.len()
    }

    pub fn contains(&self, handle: &ContextHandle) -> bool {
        !handle.is_nil() && self.entries.lock().contains_key(&handle.uuid)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn lookup<'a>(entries: &'a HashMap<Guid, Entry<T>>, handle: &ContextHandle) -> Result<&'a Entry<T>> {
        if handle.is_nil() {
            return Err(RpcError::InvalidHandle);
        }
        entries.get(&handle.uuid).ok_or_else(|| {
            warn!("Unknown context handle {}", handle);
            RpcError::InvalidHandle
        })
    }
}

impl<T: Clone> HandleTable<T> {
    pub fn get(&self, handle: &ContextHandle) -> Result<T> {
        self.with(handle, T::clone)
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
