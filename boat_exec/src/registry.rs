//! # Connection Registry
//!
//! Tracks the observers connected to the hub. Each connection owns a bounded outbound queue which
//! is drained by that connection's writer task, so fanning a frame out never waits on a slow
//! observer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use log::{debug, trace};
use tokio::sync::mpsc::{self, error::TrySendError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of frames which may be queued for one connection before further frames are dropped.
pub const OUTBOUND_QUEUE_LEN: usize = 32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Opaque handle to one connected observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

/// A serialised frame, shared between every queue it is sent to.
pub type Frame = Arc<str>;

#[derive(Default)]
pub struct Registry {
    next_id: AtomicU64,
    members: RwLock<HashMap<ConnId, mpsc::Sender<Frame>>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new connection.
    ///
    /// The greeting is queued before the connection is inserted, so it is always the first frame
    /// the connection receives.
    pub fn register(&self, greeting: Frame) -> (ConnId, mpsc::Receiver<Frame>) {
        let id = ConnId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_LEN);

        // Fresh queue so this can't fail
        tx.try_send(greeting).ok();

        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        members.insert(id, tx);

        debug!("Connection {} registered ({} total)", id, members.len());

        (id, rx)
    }

    /// Remove a connection, returning whether it was a member.
    pub fn unregister(&self, id: ConnId) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let removed = members.remove(&id).is_some();

        if removed {
            debug!("Connection {} unregistered ({} remaining)", id, members.len());
        }

        removed
    }

    /// Queue a frame for a single connection.
    ///
    /// Returns `false` if the frame could not be queued. A closed connection is removed.
    pub fn send_to(&self, id: ConnId, frame: Frame) -> bool {
        let result = {
            let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
            match members.get(&id) {
                Some(tx) => tx.try_send(frame),
                None => return false,
            }
        };

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue for {} full, frame dropped", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.unregister(id);
                false
            }
        }
    }

    /// Queue the same frame on every connection, returning the number of connections it was
    /// queued for.
    pub fn broadcast(&self, frame: Frame) -> usize {
        let mut sent = 0;
        let mut closed = Vec::new();

        {
            let members = self.members.read().unwrap_or_else(PoisonError::into_inner);

            for (id, tx) in members.iter() {
                match tx.try_send(frame.clone()) {
                    Ok(()) => sent += 1,
                    Err(TrySendError::Full(_)) => trace!("Outbound queue for {} full", id),
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        for id in closed {
            self.unregister(id);
        }

        sent
    }

    pub fn len(&self) -> usize {
        self.members.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
