//! Remote document store: one `{data, updatedAt}` document per user id.
//!
//! Stores keep documents as encoded JSON and decode on every read, so no
//! caller ever shares a live value with the store. Subscribers receive the
//! current document as soon as they subscribe and again after every write.

use crate::error::{GradebookError, Result};
use crate::model::AppState;
use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub data: AppState,
    pub updated_at: String,
}

impl RemoteDocument {
    pub fn stamped(data: AppState) -> Self {
        Self {
            data,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// `None` when the user has no document yet.
    Snapshot {
        uid: String,
        document: Option<RemoteDocument>,
    },
    Error {
        uid: String,
        message: String,
    },
}

impl RemoteEvent {
    pub fn uid(&self) -> &str {
        match self {
            RemoteEvent::Snapshot { uid, .. } | RemoteEvent::Error { uid, .. } => uid,
        }
    }
}

/// A live subscription to one user's document. Dropping it unsubscribes.
pub struct Subscription {
    uid: String,
    rx: UnboundedReceiver<RemoteEvent>,
}

impl Subscription {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub async fn recv(&mut self) -> Option<RemoteEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RemoteEvent> {
        self.rx.try_recv().ok()
    }
}

pub trait DocumentStore {
    fn fetch(&self, uid: &str) -> Result<Option<RemoteDocument>>;
    fn write(&self, uid: &str, document: &RemoteDocument) -> Result<()>;
    fn subscribe(&self, uid: &str) -> Result<Subscription>;
    /// Re-reads the document and delivers it to current subscribers.
    fn refresh(&self, uid: &str) -> Result<()>;
}

fn unreadable(uid: &str, e: serde_json::Error) -> GradebookError {
    GradebookError::Remote(format!("document for {} is unreadable: {}", uid, e))
}

/// Decoded documents are normalized like cached and imported state, so a
/// remote copy can never install an empty class list.
fn decode(uid: &str, text: &str) -> Result<RemoteDocument> {
    let doc: RemoteDocument = serde_json::from_str(text).map_err(|e| unreadable(uid, e))?;
    Ok(RemoteDocument {
        data: doc.data.normalize(),
        ..doc
    })
}

#[derive(Default, Clone)]
struct Subscribers {
    inner: Arc<Mutex<HashMap<String, Vec<UnboundedSender<RemoteEvent>>>>>,
}

impl Subscribers {
    fn add(&self, uid: &str) -> Result<Subscription> {
        let (tx, rx) = unbounded_channel();
        let mut map = self
            .inner
            .lock()
            .map_err(|_| GradebookError::Remote("subscriber registry poisoned".into()))?;
        map.entry(uid.to_string()).or_default().push(tx);
        Ok(Subscription {
            uid: uid.to_string(),
            rx,
        })
    }

    fn notify(&self, event: RemoteEvent) {
        let Ok(mut map) = self.inner.lock() else {
            warn!("subscriber registry poisoned; dropping remote event");
            return;
        };
        if let Some(list) = map.get_mut(event.uid()) {
            list.retain(|tx| tx.send(event.clone()).is_ok());
            debug!("remote event for {} delivered to {} subscriber(s)", event.uid(), list.len());
        }
    }

    fn snapshot_event(uid: &str, fetched: Result<Option<RemoteDocument>>) -> RemoteEvent {
        match fetched {
            Ok(document) => RemoteEvent::Snapshot {
                uid: uid.to_string(),
                document,
            },
            Err(e) => RemoteEvent::Error {
                uid: uid.to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// In-process store. Cheap to clone; clones share documents and subscribers,
/// which lets tests play a second device against the same store.
#[derive(Default, Clone)]
pub struct MemoryDocumentStore {
    docs: Arc<Mutex<HashMap<String, String>>>,
    subscribers: Subscribers,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock_docs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.docs
            .lock()
            .map_err(|_| GradebookError::Remote("document map poisoned".into()))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn fetch(&self, uid: &str) -> Result<Option<RemoteDocument>> {
        let text = self.lock_docs()?.get(uid).cloned();
        text.map(|t| decode(uid, &t)).transpose()
    }

    fn write(&self, uid: &str, document: &RemoteDocument) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GradebookError::Remote("write rejected by store".into()));
        }
        let text = serde_json::to_string(document)
            .map_err(|e| GradebookError::Remote(e.to_string()))?;
        self.lock_docs()?.insert(uid.to_string(), text);
        self.refresh(uid)
    }

    fn subscribe(&self, uid: &str) -> Result<Subscription> {
        let sub = self.subscribers.add(uid)?;
        self.refresh(uid)?;
        Ok(sub)
    }

    fn refresh(&self, uid: &str) -> Result<()> {
        let event = Subscribers::snapshot_event(uid, self.fetch(uid));
        self.subscribers.notify(event);
        Ok(())
    }
}

/// Store backed by a SQLite file, e.g. one kept in a folder shared between
/// machines. Changes made by other processes show up on `refresh`.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
    subscribers: Subscribers,
}

impl SqliteDocumentStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents(
                uid TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Subscribers::default(),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| GradebookError::Remote("connection poisoned".into()))?;
        f(&conn).map_err(|e| GradebookError::Remote(e.to_string()))
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn fetch(&self, uid: &str) -> Result<Option<RemoteDocument>> {
        let row: Option<(String, String)> = self.with_conn(|c| {
            c.query_row(
                "SELECT data, updated_at FROM documents WHERE uid = ?",
                [uid],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()
        })?;
        let Some((data, updated_at)) = row else {
            return Ok(None);
        };
        let data: AppState = serde_json::from_str(&data).map_err(|e| unreadable(uid, e))?;
        Ok(Some(RemoteDocument {
            data: data.normalize(),
            updated_at,
        }))
    }

    fn write(&self, uid: &str, document: &RemoteDocument) -> Result<()> {
        let data = serde_json::to_string(&document.data)
            .map_err(|e| GradebookError::Remote(e.to_string()))?;
        self.with_conn(|c| {
            c.execute(
                "INSERT INTO documents(uid, data, updated_at) VALUES(?, ?, ?)
                 ON CONFLICT(uid) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                (uid, &data, &document.updated_at),
            )
        })?;
        self.refresh(uid)
    }

    fn subscribe(&self, uid: &str) -> Result<Subscription> {
        let sub = self.subscribers.add(uid)?;
        self.refresh(uid)?;
        Ok(sub)
    }

    fn refresh(&self, uid: &str) -> Result<()> {
        let event = Subscribers::snapshot_event(uid, self.fetch(uid));
        self.subscribers.notify(event);
        Ok(())
    }
}

/// Opens the store named on the command line: `memory`, or a SQLite path.
pub fn open_store(location: &str) -> anyhow::Result<Box<dyn DocumentStore>> {
    if location == "memory" {
        return Ok(Box::new(MemoryDocumentStore::new()));
    }
    Ok(Box::new(SqliteDocumentStore::open(Path::new(location))?))
}
