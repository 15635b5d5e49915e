//! In-memory session registry.
//!
//! Each live interview is wrapped in a [`SessionHandle`]: the stable API id,
//! a generation counter, and the runtime behind an async mutex so turns for
//! one session serialize. Reset does not wait for an in-flight turn; it swaps
//! in a fresh handle with a bumped generation. The old handle stays valid for
//! whoever still holds it, but the store no longer recognizes it, so a turn
//! that raced the reset reports as stale instead of leaking its result into
//! the new session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use retrospect_agent::runtime::InterviewRuntime;

pub struct SessionHandle {
    pub id: Uuid,
    pub generation: u64,
    pub runtime: tokio::sync::Mutex<InterviewRuntime>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, runtime: InterviewRuntime) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle {
            id: Uuid::new_v4(),
            generation: 0,
            runtime: tokio::sync::Mutex::new(runtime),
        });
        self.lock().insert(handle.id, handle.clone());
        handle
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        self.lock().get(&id).cloned()
    }

    /// Swap in a fresh runtime under the same session id. Returns the new
    /// handle, or `None` when the session does not exist.
    pub fn replace(&self, id: Uuid, runtime: InterviewRuntime) -> Option<Arc<SessionHandle>> {
        let mut sessions = self.lock();
        let current = sessions.get(&id)?;
        let replacement = Arc::new(SessionHandle {
            id,
            generation: current.generation + 1,
            runtime: tokio::sync::Mutex::new(runtime),
        });
        sessions.insert(id, replacement.clone());
        Some(replacement)
    }

    /// Whether `handle` is still the registered handle for its session.
    pub fn is_current(&self, handle: &Arc<SessionHandle>) -> bool {
        self.lock()
            .get(&handle.id)
            .map(|current| Arc::ptr_eq(current, handle))
            .unwrap_or(false)
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<SessionHandle>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
