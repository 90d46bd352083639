//! Session: the daemon-side owner of the store, the local cache, the sync
//! coordinator and the remote store handle.
//!
//! Every replacement of the store snapshot is observed here through the
//! store's change channel. `pump` fans each change out to the cache writer
//! and the coordinator; remote observations and due pushes are fed in by the
//! main loop.

use crate::cache::LocalCache;
use crate::config::Config;
use crate::error::{GradebookError, Result};
use crate::model::{default_state, AppState};
use crate::remote::{open_store, DocumentStore, RemoteDocument, RemoteEvent, Subscription};
use crate::store::{Change, ChangeOrigin, Store};
use crate::sync::{RemoteDecision, SyncCoordinator, SyncPhase, SyncStatus};
use anyhow::Context;
use log::{info, warn};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Session {
    store: Store,
    changes: UnboundedReceiver<Change>,
    cache: Option<LocalCache>,
    workspace: Option<PathBuf>,
    remote: Box<dyn DocumentStore>,
    sync: SyncCoordinator,
    subscription: Option<Subscription>,
    reported_phase: SyncPhase,
    events: Vec<Value>,
}

impl Session {
    pub fn new(remote: Box<dyn DocumentStore>, push_delay: Duration) -> Self {
        let mut store = Store::new(default_state());
        let changes = store.subscribe();
        Self {
            store,
            changes,
            cache: None,
            workspace: None,
            remote,
            sync: SyncCoordinator::new(push_delay),
            subscription: None,
            reported_phase: SyncPhase::LoggedOut,
            events: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let remote = open_store(&config.remote)
            .with_context(|| format!("failed to open remote store {}", config.remote))?;
        let mut session = Self::new(remote, config.push_delay);
        if let Some(ws) = &config.workspace {
            session.select_workspace(ws, Instant::now())?;
        }
        Ok(session)
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    pub fn state(&self) -> Arc<AppState> {
        self.store.snapshot()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// Opens the workspace cache. A cached state replaces the in-memory one;
    /// an empty cache is seeded with the current state.
    pub fn select_workspace(&mut self, path: &Path, now: Instant) -> anyhow::Result<()> {
        let cache = LocalCache::open(path).with_context(|| {
            format!("failed to open workspace {}", path.to_string_lossy())
        })?;
        let cached = cache.load().context("failed to read local cache")?;
        match &cached {
            Some(_) => info!("restoring cached state from {}", path.to_string_lossy()),
            None => cache
                .save(&self.store.snapshot())
                .context("failed to seed local cache")?,
        }
        self.cache = Some(cache);
        self.workspace = Some(path.to_path_buf());
        if let Some(state) = cached {
            self.store.replace(state, ChangeOrigin::Restore);
        }
        self.pump(now);
        Ok(())
    }

    pub fn apply<F>(&mut self, op: F, now: Instant) -> Result<Arc<AppState>>
    where
        F: FnOnce(&AppState) -> Result<AppState>,
    {
        let next = self.store.apply(op)?;
        self.pump(now);
        Ok(next)
    }

    /// Replaces the whole state with an imported document.
    pub fn import(&mut self, state: AppState, now: Instant) -> Arc<AppState> {
        let next = self.store.replace(state, ChangeOrigin::Import);
        self.pump(now);
        next
    }

    /// Delivers pending store changes to the cache and the coordinator.
    pub fn pump(&mut self, now: Instant) {
        while let Ok(change) = self.changes.try_recv() {
            if let Some(cache) = &self.cache {
                if let Err(e) = cache.save(&change.state) {
                    warn!("local cache write failed: {}", e);
                }
            }
            if change.origin != ChangeOrigin::Remote {
                self.sync.on_local_change(Arc::clone(&change.state), now);
            }
            if change.origin != ChangeOrigin::Local {
                self.events.push(json!({
                    "event": "state.replaced",
                    "version": change.version,
                    "origin": change.origin,
                }));
            }
        }
        self.report_status();
    }

    pub fn login(&mut self, uid: &str, now: Instant) -> Result<SyncStatus> {
        if uid.trim().is_empty() {
            return Err(GradebookError::validation("uid must not be empty"));
        }
        if self.sync.login(uid) {
            // Drop the previous identity's feed before opening the new one.
            self.subscription = None;
            match self.remote.subscribe(uid) {
                Ok(sub) => self.subscription = Some(sub),
                Err(e) => {
                    self.sync.logout();
                    self.report_status();
                    return Err(e);
                }
            }
            info!("logged in as {}", uid);
        }
        self.drain_remote(now);
        self.report_status();
        Ok(self.sync.status())
    }

    pub fn logout(&mut self) -> SyncStatus {
        self.subscription = None;
        self.sync.logout();
        self.report_status();
        self.sync.status()
    }

    /// Handles every remote event already queued on the subscription.
    pub fn drain_remote(&mut self, now: Instant) {
        while let Some(event) = self.subscription.as_mut().and_then(|s| s.try_recv()) {
            self.handle_remote(event, now);
        }
    }

    pub fn handle_remote(&mut self, event: RemoteEvent, now: Instant) {
        let local = self.store.snapshot();
        match self.sync.on_remote(event, &local) {
            RemoteDecision::Ignore | RemoteDecision::AlreadyCurrent | RemoteDecision::Failed(_) => {}
            RemoteDecision::Bootstrap => {
                if let Some(uid) = self.sync.uid().map(str::to_string) {
                    let doc = RemoteDocument::stamped((*local).clone());
                    match self.remote.write(&uid, &doc) {
                        Ok(()) => self.sync.bootstrap_done(&doc.data, &doc.updated_at),
                        Err(e) => self.sync.bootstrap_failed(&e.to_string()),
                    }
                }
            }
            RemoteDecision::Accept(data) => {
                self.store.replace(data, ChangeOrigin::Remote);
                self.pump(now);
            }
        }
        self.report_status();
    }

    /// Waits for the next remote event. Never resolves while logged out.
    pub async fn next_remote_event(&mut self) -> Option<RemoteEvent> {
        match self.subscription.as_mut() {
            Some(sub) => {
                let event = sub.recv().await;
                if event.is_none() {
                    warn!("remote subscription closed by store");
                    self.subscription = None;
                }
                event
            }
            None => std::future::pending().await,
        }
    }

    pub fn push_deadline(&self) -> Option<Instant> {
        self.sync.push_deadline()
    }

    /// Pushes the pending state once its quiet period has elapsed.
    pub fn flush_due(&mut self, now: Instant) {
        let Some((uid, state)) = self.sync.take_due_push(now) else {
            return;
        };
        let doc = RemoteDocument::stamped((*state).clone());
        match self.remote.write(&uid, &doc) {
            Ok(()) => {
                info!("cloud save done for {}", uid);
                self.sync.push_succeeded(&doc.data, &doc.updated_at);
            }
            Err(e) => self.sync.push_failed(&e.to_string()),
        }
        self.drain_remote(now);
        self.report_status();
    }

    /// Asks the remote store to re-deliver the current document.
    pub fn refresh(&mut self, now: Instant) -> Result<SyncStatus> {
        if let Some(uid) = self.sync.uid().map(str::to_string) {
            self.remote.refresh(&uid)?;
            self.drain_remote(now);
        }
        Ok(self.sync.status())
    }

    pub fn status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn take_events(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.events)
    }

    fn report_status(&mut self) {
        let phase = self.sync.phase();
        if phase != self.reported_phase {
            self.reported_phase = phase;
            self.events.push(json!({
                "event": "sync.status",
                "status": self.sync.status(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::remote::MemoryDocumentStore;
    use crate::sync::DEFAULT_PUSH_DELAY;

    fn session(store: &MemoryDocumentStore) -> Session {
        Session::new(Box::new(store.clone()), DEFAULT_PUSH_DELAY)
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn first_login_bootstraps_remote_document() {
        let store = MemoryDocumentStore::new();
        let mut s = session(&store);
        let status = s.login("u1", Instant::now()).expect("login");
        assert_eq!(status.phase, SyncPhase::Synced);
        let doc = store.fetch("u1").expect("fetch").expect("bootstrapped");
        assert!(doc.data.same_content(&s.state()));
    }

    #[test]
    fn local_edits_push_after_quiet_period() {
        let store = MemoryDocumentStore::new();
        let mut s = session(&store);
        let t0 = Instant::now();
        s.login("u1", t0).expect("login");

        s.apply(|st| ops::add_class(st, "六年1班"), t0).expect("add");
        assert_eq!(s.status().phase, SyncPhase::Dirty);
        s.flush_due(t0 + Duration::from_secs(1));
        assert_eq!(store.fetch("u1").expect("fetch").expect("doc").data.classes.len(), 1);

        s.flush_due(t0 + DEFAULT_PUSH_DELAY);
        let doc = store.fetch("u1").expect("fetch").expect("doc");
        assert_eq!(doc.data.classes.len(), 2);
        assert_eq!(s.status().phase, SyncPhase::Synced);
    }

    #[test]
    fn other_device_write_replaces_local_state() {
        let store = MemoryDocumentStore::new();
        let mut s = session(&store);
        let t0 = Instant::now();
        s.login("u1", t0).expect("login");
        s.take_events();

        let theirs = ops::add_class(&s.state(), "其他裝置").expect("add");
        store
            .write("u1", &RemoteDocument::stamped(theirs.clone()))
            .expect("device b write");
        s.drain_remote(t0);

        assert_eq!(*s.state(), theirs);
        assert_eq!(s.status().phase, SyncPhase::Synced);
        assert!(s.push_deadline().is_none());
        let events = s.take_events();
        assert!(events
            .iter()
            .any(|e| e["event"] == "state.replaced" && e["origin"] == "remote"));
    }

    #[test]
    fn remote_document_without_classes_is_repaired() {
        let store = MemoryDocumentStore::new();
        let mut s = session(&store);
        let t0 = Instant::now();
        s.login("u1", t0).expect("login");

        let mut theirs = ops::add_class(&s.state(), "另一班").expect("add");
        theirs.classes.clear();
        theirs.students[0].note = "遠端".into();
        store
            .write("u1", &RemoteDocument::stamped(theirs))
            .expect("device b write");
        s.drain_remote(t0);

        let state = s.state();
        assert_eq!(state.students[0].note, "遠端");
        assert!(!state.classes.is_empty());
        assert!(state.has_class(&state.current_class_id));
    }

    #[test]
    fn stale_subscription_is_dropped_on_identity_change() {
        let store = MemoryDocumentStore::new();
        let mut s = session(&store);
        let t0 = Instant::now();
        s.login("u1", t0).expect("login u1");
        s.login("u2", t0).expect("login u2");
        let before = s.state();

        let theirs = ops::add_class(&before, "u1 only").expect("add");
        store
            .write("u1", &RemoteDocument::stamped(theirs))
            .expect("write u1");
        s.drain_remote(t0);
        assert!(Arc::ptr_eq(&before, &s.state()));
        assert_eq!(s.status().uid.as_deref(), Some("u2"));
    }

    #[test]
    fn failed_push_keeps_local_state_dirty() {
        let store = MemoryDocumentStore::new();
        let mut s = session(&store);
        let t0 = Instant::now();
        s.login("u1", t0).expect("login");
        store.set_fail_writes(true);

        s.apply(|st| ops::add_class(st, "x"), t0).expect("add");
        s.flush_due(t0 + DEFAULT_PUSH_DELAY);
        let status = s.status();
        assert_eq!(status.phase, SyncPhase::Dirty);
        assert!(status.last_error.is_some());
        assert_eq!(s.state().classes.len(), 2);
    }

    #[test]
    fn logged_out_edits_only_reach_cache() {
        let store = MemoryDocumentStore::new();
        let ws = temp_dir("classbookd-session");
        let mut s = session(&store);
        let t0 = Instant::now();
        s.select_workspace(&ws, t0).expect("workspace");
        s.apply(|st| ops::add_class(st, "離線"), t0).expect("add");
        assert!(s.push_deadline().is_none());
        assert_eq!(store.fetch("u1").expect("fetch"), None);

        let mut reopened = session(&store);
        reopened.select_workspace(&ws, t0).expect("reopen");
        assert_eq!(*reopened.state(), *s.state());
        assert!(reopened
            .take_events()
            .iter()
            .any(|e| e["origin"] == "restore"));
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn logout_leaves_state_and_stops_pushing() {
        let store = MemoryDocumentStore::new();
        let mut s = session(&store);
        let t0 = Instant::now();
        s.login("u1", t0).expect("login");
        s.apply(|st| ops::add_class(st, "y"), t0).expect("add");
        let status = s.logout();
        assert_eq!(status.phase, SyncPhase::LoggedOut);
        s.flush_due(t0 + Duration::from_secs(10));
        assert_eq!(store.fetch("u1").expect("fetch").expect("doc").data.classes.len(), 1);
        assert_eq!(s.state().classes.len(), 2);
    }
}
