//! State container: owns the current snapshot and tells subscribers about
//! each replacement after it has happened.

use crate::error::Result;
use crate::model::AppState;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOrigin {
    /// A mutation operation requested by the front-end.
    Local,
    /// A remote document accepted by the sync coordinator.
    Remote,
    /// A user-supplied backup file.
    Import,
    /// The local cache loaded at workspace selection.
    Restore,
}

#[derive(Debug, Clone)]
pub struct Change {
    pub version: u64,
    pub origin: ChangeOrigin,
    pub state: Arc<AppState>,
}

pub struct Store {
    state: Arc<AppState>,
    version: u64,
    subscribers: Vec<UnboundedSender<Change>>,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        Self {
            state: Arc::new(initial),
            version: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<Change> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Runs a mutation against the current snapshot. On error the snapshot
    /// is untouched and nobody is notified; a result equal to the current
    /// snapshot is not a replacement either.
    pub fn apply<F>(&mut self, op: F) -> Result<Arc<AppState>>
    where
        F: FnOnce(&AppState) -> Result<AppState>,
    {
        let next = op(&self.state)?;
        if next == *self.state {
            return Ok(self.snapshot());
        }
        Ok(self.replace(next, ChangeOrigin::Local))
    }

    /// Swaps in a whole new snapshot and notifies subscribers.
    pub fn replace(&mut self, state: AppState, origin: ChangeOrigin) -> Arc<AppState> {
        self.state = Arc::new(state);
        self.version += 1;
        let change = Change {
            version: self.version,
            origin,
            state: self.snapshot(),
        };
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        self.snapshot()
    }
}
