//! Sync coordinator.
//!
//! Decides, for every local change and every remote observation, whether to
//! push the local state, accept the remote document, or do nothing. It owns
//! no I/O: the session performs writes and replacements and reports back.
//!
//! Concurrent edits from two devices are resolved by whole-document
//! replacement: the last remote write observed wins.

use crate::debounce::Debouncer;
use crate::model::AppState;
use crate::remote::RemoteEvent;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_PUSH_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    LoggedOut,
    /// Subscribed, first remote observation not seen yet.
    Loading,
    Synced,
    /// Local changes not yet pushed.
    Dirty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteDecision {
    /// Logged out, or the event belongs to another identity.
    Ignore,
    /// The user has no document: write the local state as the first one.
    Bootstrap,
    /// Remote content differs: replace local state with it.
    Accept(AppState),
    /// Remote content equals local state, or is our own last push.
    AlreadyCurrent,
    /// The subscription reported an error.
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub uid: Option<String>,
    pub push_pending: bool,
    pub last_error: Option<String>,
    pub last_pushed_at: Option<String>,
}

pub struct SyncCoordinator {
    phase: SyncPhase,
    uid: Option<String>,
    push: Debouncer<Arc<AppState>>,
    last_pushed: Option<Vec<u8>>,
    last_pushed_at: Option<String>,
    last_error: Option<String>,
}

impl SyncCoordinator {
    pub fn new(push_delay: Duration) -> Self {
        Self {
            phase: SyncPhase::LoggedOut,
            uid: None,
            push: Debouncer::new(push_delay),
            last_pushed: None,
            last_pushed_at: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn push_deadline(&self) -> Option<Instant> {
        self.push.deadline()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            phase: self.phase,
            uid: self.uid.clone(),
            push_pending: self.push.is_pending(),
            last_error: self.last_error.clone(),
            last_pushed_at: self.last_pushed_at.clone(),
        }
    }

    /// Starts a session for `uid`. Returns true when the caller must open a
    /// fresh subscription (new login or identity change).
    pub fn login(&mut self, uid: &str) -> bool {
        if self.uid.as_deref() == Some(uid) && self.phase != SyncPhase::LoggedOut {
            return false;
        }
        if let Some(old) = &self.uid {
            info!("identity changed from {} to {}", old, uid);
        }
        self.reset();
        self.uid = Some(uid.to_string());
        self.phase = SyncPhase::Loading;
        true
    }

    pub fn logout(&mut self) {
        if let Some(dropped) = self.reset() {
            debug!("discarding unpushed state version on logout ({} students)", dropped.students.len());
        }
    }

    /// Back to logged out. Returns the push that was still pending, if any.
    fn reset(&mut self) -> Option<Arc<AppState>> {
        let dropped = self.push.cancel();
        self.phase = SyncPhase::LoggedOut;
        self.uid = None;
        self.last_pushed = None;
        self.last_error = None;
        dropped
    }

    pub fn on_remote(&mut self, event: RemoteEvent, local: &AppState) -> RemoteDecision {
        if self.phase == SyncPhase::LoggedOut || self.uid.as_deref() != Some(event.uid()) {
            debug!("dropping remote event for {}", event.uid());
            return RemoteDecision::Ignore;
        }

        match event {
            RemoteEvent::Error { message, .. } => {
                warn!("remote subscription error: {}", message);
                self.last_error = Some(message.clone());
                if self.phase == SyncPhase::Loading {
                    // Loading ends; local edits may push from here on.
                    self.phase = SyncPhase::Dirty;
                }
                RemoteDecision::Failed(message)
            }
            RemoteEvent::Snapshot { document: None, .. } => RemoteDecision::Bootstrap,
            RemoteEvent::Snapshot {
                document: Some(doc),
                ..
            } => {
                let remote = doc.data.encode().ok();
                let current = local.encode().ok();
                if remote.is_some() && remote == current {
                    if self.phase == SyncPhase::Loading {
                        self.phase = SyncPhase::Synced;
                    }
                    return RemoteDecision::AlreadyCurrent;
                }
                if remote.is_some() && remote == self.last_pushed && self.phase != SyncPhase::Loading {
                    // Echo of our own earlier push, older than local edits made since.
                    return RemoteDecision::AlreadyCurrent;
                }
                self.push.cancel();
                self.phase = SyncPhase::Synced;
                self.last_pushed = remote;
                info!("accepting remote document updated at {}", doc.updated_at);
                RemoteDecision::Accept(doc.data)
            }
        }
    }

    pub fn bootstrap_done(&mut self, written: &AppState, updated_at: &str) {
        info!("wrote first remote document");
        self.mark_pushed(written, updated_at);
        if self.phase == SyncPhase::Loading || !self.push.is_pending() {
            self.phase = SyncPhase::Synced;
        }
    }

    pub fn bootstrap_failed(&mut self, err: &str) {
        warn!("first remote write failed: {}", err);
        self.last_error = Some(err.to_string());
        if self.phase == SyncPhase::Loading {
            self.phase = SyncPhase::Dirty;
        }
    }

    /// Records a local change. Pushing waits for the quiet period and is
    /// suppressed entirely while logged out or loading.
    pub fn on_local_change(&mut self, state: Arc<AppState>, now: Instant) {
        match self.phase {
            SyncPhase::LoggedOut | SyncPhase::Loading => {}
            SyncPhase::Synced | SyncPhase::Dirty => {
                self.phase = SyncPhase::Dirty;
                self.push.schedule(state, now);
            }
        }
    }

    /// The state to push now, if the quiet period has elapsed.
    pub fn take_due_push(&mut self, now: Instant) -> Option<(String, Arc<AppState>)> {
        if self.phase != SyncPhase::Dirty {
            return None;
        }
        let uid = self.uid.clone()?;
        self.push.take_due(now).map(|state| (uid, state))
    }

    pub fn push_succeeded(&mut self, pushed: &AppState, updated_at: &str) {
        self.mark_pushed(pushed, updated_at);
        if !self.push.is_pending() && self.phase == SyncPhase::Dirty {
            self.phase = SyncPhase::Synced;
        }
    }

    /// Stays dirty; the next local change schedules another attempt.
    pub fn push_failed(&mut self, err: &str) {
        warn!("cloud save failed: {}", err);
        self.last_error = Some(err.to_string());
    }

    fn mark_pushed(&mut self, state: &AppState, updated_at: &str) {
        self.last_pushed = state.encode().ok();
        self.last_pushed_at = Some(updated_at.to_string());
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::default_state;
    use crate::ops;
    use crate::remote::RemoteDocument;

    fn snapshot(uid: &str, data: Option<AppState>) -> RemoteEvent {
        RemoteEvent::Snapshot {
            uid: uid.into(),
            document: data.map(RemoteDocument::stamped),
        }
    }

    fn synced(uid: &str, local: &AppState) -> SyncCoordinator {
        let mut c = SyncCoordinator::new(DEFAULT_PUSH_DELAY);
        assert!(c.login(uid));
        assert_eq!(
            c.on_remote(snapshot(uid, Some(local.clone())), local),
            RemoteDecision::AlreadyCurrent
        );
        assert_eq!(c.phase(), SyncPhase::Synced);
        c
    }

    #[test]
    fn missing_document_requests_bootstrap() {
        let local = default_state();
        let mut c = SyncCoordinator::new(DEFAULT_PUSH_DELAY);
        c.login("u1");
        assert_eq!(c.phase(), SyncPhase::Loading);
        assert_eq!(c.on_remote(snapshot("u1", None), &local), RemoteDecision::Bootstrap);
        c.bootstrap_done(&local, "t");
        assert_eq!(c.phase(), SyncPhase::Synced);
    }

    #[test]
    fn local_changes_while_loading_never_push() {
        let local = Arc::new(default_state());
        let t0 = Instant::now();
        let mut c = SyncCoordinator::new(DEFAULT_PUSH_DELAY);
        c.login("u1");
        c.on_local_change(Arc::clone(&local), t0);
        assert_eq!(c.phase(), SyncPhase::Loading);
        assert!(c.take_due_push(t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn burst_of_changes_pushes_once_with_last_value() {
        let base = default_state();
        let mut c = synced("u1", &base);
        let t0 = Instant::now();

        let mut state = base.clone();
        for i in 0..5u64 {
            state = ops::update_student_score(&state, &ops::ScoreTarget::One("s1".into()), 1)
                .expect("score");
            c.on_local_change(Arc::new(state.clone()), t0 + Duration::from_millis(500 * i));
        }
        let last_change = t0 + Duration::from_millis(2000);
        assert_eq!(c.phase(), SyncPhase::Dirty);
        assert_eq!(c.push_deadline(), Some(last_change + DEFAULT_PUSH_DELAY));
        assert!(c.take_due_push(last_change + Duration::from_millis(2999)).is_none());

        let (uid, pushed) = c
            .take_due_push(last_change + DEFAULT_PUSH_DELAY)
            .expect("push due");
        assert_eq!(uid, "u1");
        assert_eq!(pushed.student("s1").map(|s| s.score), Some(7));
        assert!(c.take_due_push(last_change + Duration::from_secs(60)).is_none());

        c.push_succeeded(&pushed, "t");
        assert_eq!(c.phase(), SyncPhase::Synced);
    }

    #[test]
    fn identical_remote_is_not_reapplied() {
        let local = default_state();
        let mut c = synced("u1", &local);
        assert_eq!(
            c.on_remote(snapshot("u1", Some(local.clone())), &local),
            RemoteDecision::AlreadyCurrent
        );
    }

    #[test]
    fn different_remote_replaces_and_cancels_pending_push() {
        let local = default_state();
        let mut c = synced("u1", &local);
        let t0 = Instant::now();
        let edited = ops::add_class(&local, "六年1班").expect("add");
        c.on_local_change(Arc::new(edited.clone()), t0);

        let other = ops::add_class(&local, "七年3班").expect("other device");
        match c.on_remote(snapshot("u1", Some(other.clone())), &edited) {
            RemoteDecision::Accept(data) => assert_eq!(data, other),
            d => panic!("expected accept, got {:?}", d),
        }
        assert_eq!(c.phase(), SyncPhase::Synced);
        assert!(c.take_due_push(t0 + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn stale_echo_of_own_push_does_not_clobber_newer_edit() {
        let local = default_state();
        let mut c = synced("u1", &local);
        let t0 = Instant::now();

        let first = ops::add_class(&local, "A").expect("a");
        c.on_local_change(Arc::new(first.clone()), t0);
        let (_, pushed) = c.take_due_push(t0 + DEFAULT_PUSH_DELAY).expect("push");
        c.push_succeeded(&pushed, "t1");

        let second = ops::add_class(&first, "B").expect("b");
        c.on_local_change(Arc::new(second.clone()), t0 + Duration::from_secs(4));
        assert_eq!(
            c.on_remote(snapshot("u1", Some(first)), &second),
            RemoteDecision::AlreadyCurrent
        );
        assert_eq!(c.phase(), SyncPhase::Dirty);
    }

    #[test]
    fn push_failure_stays_dirty_until_next_change() {
        let local = default_state();
        let mut c = synced("u1", &local);
        let t0 = Instant::now();
        c.on_local_change(Arc::new(local.clone()), t0);
        let _ = c.take_due_push(t0 + DEFAULT_PUSH_DELAY).expect("push");
        c.push_failed("offline");
        assert_eq!(c.phase(), SyncPhase::Dirty);
        assert_eq!(c.status().last_error.as_deref(), Some("offline"));
        assert!(c.take_due_push(t0 + Duration::from_secs(30)).is_none());

        c.on_local_change(Arc::new(local), t0 + Duration::from_secs(31));
        assert!(c.take_due_push(t0 + Duration::from_secs(34)).is_some());
    }

    #[test]
    fn events_for_other_identity_are_ignored() {
        let local = default_state();
        let mut c = synced("u1", &local);
        assert!(c.login("u2"));
        assert_eq!(c.phase(), SyncPhase::Loading);
        let other = ops::add_class(&local, "x").expect("x");
        assert_eq!(
            c.on_remote(snapshot("u1", Some(other)), &local),
            RemoteDecision::Ignore
        );
        assert!(!c.login("u2"));
    }

    #[test]
    fn logout_discards_pending_push() {
        let local = default_state();
        let mut c = synced("u1", &local);
        let t0 = Instant::now();
        c.on_local_change(Arc::new(local.clone()), t0);
        c.logout();
        assert_eq!(c.phase(), SyncPhase::LoggedOut);
        assert!(c.push_deadline().is_none());
        assert_eq!(
            c.on_remote(snapshot("u1", None), &local),
            RemoteDecision::Ignore
        );
        c.on_local_change(Arc::new(local), t0);
        assert!(c.push_deadline().is_none());
    }

    #[test]
    fn identity_change_drops_pending_push() {
        let local = default_state();
        let mut c = synced("u1", &local);
        let t0 = Instant::now();
        c.on_local_change(Arc::new(local.clone()), t0);
        assert!(c.push_deadline().is_some());
        assert!(c.login("u2"));
        assert_eq!(c.phase(), SyncPhase::Loading);
        assert!(c.push_deadline().is_none());
        assert!(c.take_due_push(t0 + DEFAULT_PUSH_DELAY).is_none());
    }

    #[test]
    fn subscription_error_while_loading_ends_loading() {
        let local = Arc::new(default_state());
        let mut c = SyncCoordinator::new(DEFAULT_PUSH_DELAY);
        c.login("u1");
        let d = c.on_remote(
            RemoteEvent::Error {
                uid: "u1".into(),
                message: "denied".into(),
            },
            &local,
        );
        assert_eq!(d, RemoteDecision::Failed("denied".into()));
        assert_eq!(c.phase(), SyncPhase::Dirty);
        let t0 = Instant::now();
        c.on_local_change(local, t0);
        assert!(c.take_due_push(t0 + DEFAULT_PUSH_DELAY).is_some());
    }
}
