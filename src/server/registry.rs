//! Process-wide directory of live sessions
//!
//! The registry weakly observes every connected session and owns the
//! exclusive store guard. Its one interesting operation is
//! `stop_database`: the cross-client quiesce that destructive commands
//! run before touching a logical database.

use crate::session::SessionShared;
use crate::store::Store;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Directory of live sessions plus the exclusive store guard
pub struct SessionRegistry {
    sessions: Mutex<Vec<Weak<SessionShared>>>,
    store: Arc<Mutex<Store>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Wraps a store into a registry; the mutex around the store is the
    /// DatabaseLock every schema change and multi-row write runs under
    pub fn new(store: Store) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(Vec::new()),
            store: Arc::new(Mutex::new(store)),
            next_id: AtomicU64::new(1),
        })
    }

    /// The exclusive store guard shared by all sessions and workers
    pub fn store(&self) -> &Arc<Mutex<Store>> {
        &self.store
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, session: &Arc<SessionShared>) {
        self.sessions.lock().unwrap().push(Arc::downgrade(session));
    }

    pub fn unregister(&self, id: u64) {
        self.sessions
            .lock()
            .unwrap()
            .retain(|weak| match weak.upgrade() {
                Some(session) => session.id != id,
                None => false,
            });
    }

    /// Number of currently connected sessions
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Quiesces every session bound to `db`
    ///
    /// Each target session is drained to completion before the next one is
    /// considered; when this returns, no worker of any session on `db` is
    /// still running. Idempotent: sessions with no workers drain to zero.
    pub async fn stop_database(&self, db: &str) {
        let targets: Vec<Arc<SessionShared>> = {
            let mut sessions = self.sessions.lock().unwrap();
            sessions.retain(|weak| weak.strong_count() > 0);
            sessions
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|session| session.current_database() == db)
                .collect()
        };

        for session in targets {
            let joined = session.stop().await;
            if joined > 0 {
                tracing::info!(
                    session = session.id,
                    "quiesced {joined} workers on database {db}"
                );
            }
        }
    }
}
