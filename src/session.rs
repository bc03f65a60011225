use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use serde::Serialize;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::mind::{MindError, MindLoader};

pub const STALE_SESSION_AFTER: Duration = Duration::from_secs(8 * 60 * 60);

/// Snapshot of one session. Every session of a manager holds the same mind.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub mind: Arc<MindLoader>,
    pub created_at: OffsetDateTime,
    pub last_accessed: Instant,
    pub request_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub resident_bytes: Option<u64>,
    pub virtual_bytes: Option<u64>,
    pub active_sessions: usize,
    pub shared_mind_loaded: bool,
}

struct SessionEntry {
    created_at: OffsetDateTime,
    last_accessed: Instant,
    request_count: u64,
}

pub struct SessionManager {
    mind: Arc<MindLoader>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionManager {
    pub fn new(mind: Arc<MindLoader>) -> Arc<Self> {
        Arc::new(Self {
            mind,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn mind(&self) -> &Arc<MindLoader> {
        &self.mind
    }

    /// Returns the session, creating it on first use. The shared mind is
    /// loaded before the first session is registered.
    pub async fn get_session(&self, id: &str) -> Result<Session, MindError> {
        if let Some(session) = self.touch(id) {
            return Ok(session);
        }

        self.mind.load().await?;

        let mut sessions = self.sessions.lock().expect("lock poisoned");
        let now = Instant::now();
        let entry = sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::info!(target: "session", session_id = %id, "session_created");
            SessionEntry {
                created_at: OffsetDateTime::now_utc(),
                last_accessed: now,
                request_count: 0,
            }
        });
        entry.last_accessed = now;
        Ok(self.snapshot(id, entry))
    }

    pub fn end_session(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .lock()
            .expect("lock poisoned")
            .remove(id)
            .is_some();
        if removed {
            tracing::info!(target: "session", session_id = %id, "session_ended");
        }
        removed
    }

    /// Drops sessions idle for longer than eight hours as seen from `now`.
    pub fn cleanup_stale_sessions_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().expect("lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_accessed) <= STALE_SESSION_AFTER);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(target: "session", removed = removed, remaining = sessions.len(), "stale_sessions_removed");
        }
        removed
    }

    pub fn cleanup_stale_sessions(&self) -> usize {
        self.cleanup_stale_sessions_at(Instant::now())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("lock poisoned").len()
    }

    /// Forgets every session and resets the shared mind.
    pub fn destroy_all(&self) {
        self.sessions.lock().expect("lock poisoned").clear();
        self.mind.reset();
        tracing::info!(target: "session", "sessions_destroyed");
    }

    pub fn memory_stats(&self) -> MemoryStats {
        let (resident_bytes, virtual_bytes) = process_memory().unzip();
        MemoryStats {
            resident_bytes,
            virtual_bytes,
            active_sessions: self.session_count(),
            shared_mind_loaded: self.mind.is_loaded(),
        }
    }

    /// Periodic stale-session sweep until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        manager.cleanup_stale_sessions();
                    }
                }
            }
            tracing::debug!(target: "session", "session_sweeper_stopped");
        })
    }

    fn touch(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().expect("lock poisoned");
        let entry = sessions.get_mut(id)?;
        entry.last_accessed = Instant::now();
        entry.request_count += 1;
        Some(self.snapshot(id, entry))
    }

    fn snapshot(&self, id: &str, entry: &SessionEntry) -> Session {
        Session {
            id: id.to_string(),
            mind: Arc::clone(&self.mind),
            created_at: entry.created_at,
            last_accessed: entry.last_accessed,
            request_count: entry.request_count,
        }
    }
}

fn process_memory() -> Option<(u64, u64)> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
    );
    let process = system.process(pid)?;
    Some((process.memory(), process.virtual_memory()))
}
