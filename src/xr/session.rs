use std::sync::Arc;

use crate::xr::XrSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
    Ended,
}

/// Tracks which AR session, if any, is live.
///
/// Every session gets a fresh generation so work started for an earlier
/// session can be told apart when it completes.
#[derive(Default)]
pub struct SessionLifecycle {
    state: SessionState,
    generation: u64,
    session: Option<Arc<dyn XrSession>>,
}

impl SessionLifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `Active` with `session` and returns its generation.
    pub fn begin(&mut self, session: Arc<dyn XrSession>) -> u64 {
        if self.state == SessionState::Active {
            log::warn!("New AR session started while another was active");
        }
        self.generation += 1;
        self.state = SessionState::Active;
        self.session = Some(session);
        self.generation
    }

    /// Enters `Ended` and drops the session handle. Returns whether a session
    /// was active.
    pub fn end(&mut self) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        self.state = SessionState::Ended;
        self.session = None;
        true
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` names the session that is active right now.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_active() && self.generation == generation
    }

    #[must_use]
    pub fn session(&self) -> Option<&Arc<dyn XrSession>> {
        self.session.as_ref()
    }
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
