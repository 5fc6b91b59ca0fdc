//! Progress tracking against a self-declared reduction goal.
//!
//! ```text
//!   Unloaded ──fetch──▶ NoGoal ─────────┐
//!       │                               │ set_goal
//!       ├────fetch────▶ Unavailable ────┤
//!       │                               ▼
//!       └────fetch────▶ GoalActive ◀── set_goal (overwrites)
//! ```
//!
//! `NoGoal` and `Unavailable` render the same goal-entry affordance; they
//! are kept apart so a failed fetch is not mistaken for a first-time user in
//! logs and in the view payload. There is no "achieved" state: the
//! percentage is the service's and is shown as-is.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ClientError;
use crate::model::{Goal, SessionId, ViewState};
use crate::remote::RemoteService;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "goal", rename_all = "snake_case")]
pub enum ProgressState {
    Unloaded,
    /// The service has no goal for this session.
    NoGoal,
    /// The goal could not be fetched.
    Unavailable,
    GoalActive(Goal),
}

impl ProgressState {
    /// Whether the view should offer goal entry.
    pub fn needs_goal_entry(&self) -> bool {
        matches!(self, ProgressState::NoGoal | ProgressState::Unavailable)
    }

    pub fn goal(&self) -> Option<&Goal> {
        match self {
            ProgressState::GoalActive(goal) => Some(goal),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ProgressTracker {
    state: ProgressState,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            state: ProgressState::Unloaded,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Fetch the current goal. Never fails; failure lands in `Unavailable`.
    pub async fn fetch(
        &mut self,
        remote: &dyn RemoteService,
        session: &SessionId,
    ) -> &ProgressState {
        self.state = match remote.get_progress(session).await {
            Ok(Some(goal)) => {
                info!(progress = goal.progress_percentage, "Goal loaded");
                ProgressState::GoalActive(goal)
            }
            Ok(None) => ProgressState::NoGoal,
            Err(e) => {
                warn!(error = %e, "Failed to fetch progress");
                ProgressState::Unavailable
            }
        };
        &self.state
    }

    /// Set or replace the goal.
    ///
    /// On failure the previous state is kept.
    pub async fn set_goal(
        &mut self,
        remote: &dyn RemoteService,
        session: &SessionId,
        goal_text: &str,
    ) -> Result<Goal, ClientError> {
        let goal_text = goal_text.trim();
        if goal_text.is_empty() {
            return Err(ClientError::validation("Please enter a goal."));
        }

        let goal = remote.set_goal(session, goal_text).await?;
        info!(goal = %goal.goal, "Goal set");
        self.state = ProgressState::GoalActive(goal.clone());
        Ok(goal)
    }

    pub fn reset(&mut self) {
        self.state = ProgressState::Unloaded;
    }

    pub fn view(&self) -> ViewState<ProgressState> {
        match &self.state {
            ProgressState::Unloaded => ViewState::Loading,
            other => ViewState::Ready(other.clone()),
        }
    }
}
