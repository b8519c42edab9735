// ABOUTME: Shared per-session state and the helpers every asynchronous operation goes through
// ABOUTME: Generation token, pipeline state, busy flags and bounded backend calls

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::PlanBackend;
use crate::checklist::{ChecklistTracker, CompletionKeying};
use crate::conversation::TurnLog;
use crate::error::{PlannerError, Result};
use crate::language::Language;
use crate::schema::BusinessPlan;

/// Where the conversation pipeline currently is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Analyzing,
    Researching {
        business: String,
        location: String,
    },
    Generating,
}

impl PipelineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, PipelineState::Idle)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Researching { .. } => "researching",
            PipelineState::Generating => "generating",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Researching { business, location } => {
                write!(f, "researching {} in {}", business, location)
            }
            other => f.write_str(other.label()),
        }
    }
}

/// Everything a session owns. Guarded by one lock; never held across an await.
pub(crate) struct SessionState {
    /// Bumped by reset; results tagged with an older value are dropped
    pub generation: u64,
    pub pipeline: PipelineState,
    pub turns: TurnLog,
    pub plan: Option<BusinessPlan>,
    pub refinement_turns: TurnLog,
    pub refining: bool,
    pub scripting: bool,
    pub verifying: HashSet<usize>,
    pub language: Language,
    pub checklist: ChecklistTracker<Box<dyn CompletionKeying>>,
}

impl SessionState {
    pub fn new(language: Language, keying: Box<dyn CompletionKeying>) -> Self {
        Self {
            generation: 0,
            pipeline: PipelineState::Idle,
            turns: TurnLog::new(),
            plan: None,
            refinement_turns: TurnLog::new(),
            refining: false,
            scripting: false,
            verifying: HashSet::new(),
            language,
            checklist: ChecklistTracker::new(keying),
        }
    }

    /// Drop the conversation and plan. Language selection survives.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.pipeline = PipelineState::Idle;
        self.turns.clear();
        self.plan = None;
        self.refinement_turns.clear();
        self.refining = false;
        self.scripting = false;
        self.verifying.clear();
        self.checklist.clear();
    }

    pub fn plan(&self) -> Result<&BusinessPlan> {
        self.plan.as_ref().ok_or(PlannerError::NoPlan)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

/// Handle shared by the engines of one session
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub state: Arc<RwLock<SessionState>>,
    pub backend: Arc<dyn PlanBackend>,
    pub call_timeout: Duration,
}

impl SessionContext {
    pub fn new(state: SessionState, backend: Arc<dyn PlanBackend>, call_timeout: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            backend,
            call_timeout,
        }
    }

    /// Run one backend call under the session's time budget
    pub async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!(operation, timeout = ?self.call_timeout, "Backend call started");
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                info!(operation, timeout = ?self.call_timeout, "Backend call timed out");
                Err(PlannerError::BackendTimeout(self.call_timeout))
            }
        }
    }

    /// Arm a guard that runs `release` if the calling operation is dropped before it
    /// applies its own result. Call [`BusyGuard::disarm`] once the result is applied.
    pub fn busy_guard(
        &self,
        generation: u64,
        operation: &'static str,
        release: impl FnOnce(&mut SessionState) + Send + 'static,
    ) -> BusyGuard {
        BusyGuard {
            state: Arc::clone(&self.state),
            generation,
            operation,
            release: Some(Box::new(release)),
        }
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Apply `update` only if the session has not been reset since `generation`.
    /// Returns `None` when the result was discarded.
    pub async fn apply_if_current<R>(
        &self,
        generation: u64,
        operation: &'static str,
        update: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let mut state = self.state.write().await;
        if !state.is_current(generation) {
            info!(
                operation,
                session_generation = generation,
                current_generation = state.generation,
                "Discarding stale result after reset"
            );
            return None;
        }
        Some(update(&mut state))
    }
}

type Release = Box<dyn FnOnce(&mut SessionState) + Send>;

/// Restores an operation's busy marker when its future is cancelled mid-flight.
/// A reset in the meantime already cleared the marker, so stale guards do nothing.
pub(crate) struct BusyGuard {
    state: Arc<RwLock<SessionState>>,
    generation: u64,
    operation: &'static str,
    release: Option<Release>,
}

impl BusyGuard {
    pub fn disarm(&mut self) {
        self.release = None;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let Some(release) = self.release.take() else {
            return;
        };
        let (generation, operation) = (self.generation, self.operation);

        if let Ok(mut state) = self.state.try_write() {
            release_if_current(&mut state, generation, operation, release);
            return;
        }

        // Lock is contended; finish the release on the runtime
        let state = Arc::clone(&self.state);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut state = state.write().await;
                    release_if_current(&mut state, generation, operation, release);
                });
            }
            Err(_) => warn!(operation, "Cancelled outside a runtime; busy marker left set"),
        }
    }
}

fn release_if_current(
    state: &mut SessionState,
    generation: u64,
    operation: &'static str,
    release: Release,
) {
    if state.is_current(generation) {
        warn!(
            operation,
            session_generation = generation,
            "Operation cancelled before completion; releasing busy marker"
        );
        release(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::IndexKeying;
    use crate::test_support::MockBackend;

    fn fresh() -> SessionState {
        SessionState::new(Language::Kannada, Box::new(IndexKeying))
    }

    #[test]
    fn test_reset_bumps_generation_and_keeps_language() {
        let mut state = fresh();
        state.turns.push_user("coffee");
        state.pipeline = PipelineState::Generating;
        state.verifying.insert(2);

        state.reset();

        assert_eq!(state.generation, 1);
        assert!(state.turns.is_empty());
        assert!(state.pipeline.is_idle());
        assert!(state.verifying.is_empty());
        assert_eq!(state.language, Language::Kannada);
        assert!(matches!(state.plan(), Err(PlannerError::NoPlan)));
    }

    fn context() -> SessionContext {
        SessionContext::new(fresh(), Arc::new(MockBackend::new()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_dropped_guard_releases_marker() {
        let ctx = context();
        ctx.state.write().await.pipeline = PipelineState::Generating;

        let guard = ctx.busy_guard(0, "submit", |state| state.pipeline = PipelineState::Idle);
        drop(guard);

        assert!(ctx.state.read().await.pipeline.is_idle());
    }

    #[tokio::test]
    async fn test_disarmed_guard_leaves_state_alone() {
        let ctx = context();
        let mut guard = ctx.busy_guard(0, "refine", |state| state.refining = false);
        ctx.state.write().await.refining = true;

        guard.disarm();
        drop(guard);

        assert!(ctx.state.read().await.refining);
    }

    #[tokio::test]
    async fn test_guard_from_previous_generation_is_ignored() {
        let ctx = context();
        let guard = ctx.busy_guard(0, "verify", |state| {
            state.verifying.remove(&3);
        });
        {
            let mut state = ctx.state.write().await;
            state.reset();
            state.verifying.insert(3);
        }

        drop(guard);

        assert!(ctx.state.read().await.verifying.contains(&3));
    }

    #[test]
    fn test_pipeline_state_display() {
        let state = PipelineState::Researching {
            business: "coffee".into(),
            location: "Koramangala".into(),
        };
        assert_eq!(state.label(), "researching");
        assert_eq!(state.to_string(), "researching coffee in Koramangala");
        assert_eq!(PipelineState::default().to_string(), "idle");
    }
}
