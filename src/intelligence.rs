//! Predictions, recommendations, feedback and chat.
//!
//! # Prediction sequencing
//!
//! The remote predictor has no answer for a user with no trips, so the
//! prediction view runs in two stages:
//!
//! ```text
//! Idle → LedgerLoading → LedgerLoaded ─(ledger non-empty)→ PredictionLoading → PredictionReady
//!                              ▲                                   │
//!                              └──────────(ledger empty)           └→ PredictionFailed
//! ```
//!
//! Stage 2 is only considered once stage 1 has completed, and a request is
//! issued exactly once per transition of the ledger length from 0 to
//! non-zero. [`PredictionOrchestrator::ledger_changed`] is how the owner of
//! the ledger reports growth.
//!
//! Feedback is write-only: submitting it changes nothing held locally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::ClientError;
use crate::ledger::TripLedger;
use crate::model::{Ack, FeedbackRequest, Prediction, Recommendation, SessionId, ViewState};
use crate::remote::RemoteService;

/// Shown when a prediction cannot be displayed.
pub const NO_PREDICTION: &str = "No prediction data available.";

/// Shown when the service has no recommendations.
pub const NO_RECOMMENDATIONS: &str = "No recommendations available yet.";

/// Recorded when the assistant gives no answer.
pub const NO_REPLY: &str = "No response from AI.";

/// Follow-up prompts offered after an assistant turn.
pub const QUICK_REPLIES: [&str; 3] = [
    "Tell me about electric vehicles.",
    "How do I reduce plastic waste?",
    "What are some energy-saving tips?",
];

/// A prediction and when it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub prediction: Prediction,
    /// Ledger length the prediction was requested for.
    pub trips: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", content = "data", rename_all = "snake_case")]
pub enum PredictionStage {
    Idle,
    LedgerLoading,
    LedgerLoaded { trips: usize },
    PredictionLoading,
    PredictionReady(PredictionReport),
    PredictionFailed(String),
}

#[derive(Debug)]
pub struct PredictionOrchestrator {
    stage: PredictionStage,
    /// Ledger length at the last evaluation.
    observed_len: usize,
    requests_issued: usize,
}

impl Default for PredictionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionOrchestrator {
    pub fn new() -> Self {
        Self {
            stage: PredictionStage::Idle,
            observed_len: 0,
            requests_issued: 0,
        }
    }

    pub fn stage(&self) -> &PredictionStage {
        &self.stage
    }

    /// Prediction requests issued since creation.
    pub fn requests_issued(&self) -> usize {
        self.requests_issued
    }

    /// Enter the prediction view: load the ledger, then evaluate stage 2.
    ///
    /// A prediction that is already ready is kept as long as the reloaded
    /// ledger still has trips. Any other stage starts a fresh cycle, so a
    /// failed prediction is retried.
    pub async fn start(
        &mut self,
        remote: &dyn RemoteService,
        ledger: &mut TripLedger,
        session: &SessionId,
    ) -> &PredictionStage {
        let previous = std::mem::replace(&mut self.stage, PredictionStage::LedgerLoading);

        ledger.load(remote, session).await;
        let trips = ledger.len();

        if let PredictionStage::PredictionReady(report) = previous {
            if trips > 0 {
                debug!(trips, "Prediction already settled");
                self.observed_len = trips;
                self.stage = PredictionStage::PredictionReady(report);
                return &self.stage;
            }
        }

        self.observed_len = 0;
        self.stage = PredictionStage::LedgerLoaded { trips };
        self.ledger_changed(remote, ledger, session).await
    }

    /// Re-evaluate stage 2 after the ledger changed size.
    pub async fn ledger_changed(
        &mut self,
        remote: &dyn RemoteService,
        ledger: &TripLedger,
        session: &SessionId,
    ) -> &PredictionStage {
        if matches!(
            self.stage,
            PredictionStage::Idle | PredictionStage::LedgerLoading
        ) {
            debug!("Ledger not loaded yet; prediction suppressed");
            return &self.stage;
        }

        let trips = ledger.len();
        let previous = std::mem::replace(&mut self.observed_len, trips);

        if trips == 0 {
            debug!("Ledger empty; prediction suppressed");
            self.stage = PredictionStage::LedgerLoaded { trips: 0 };
            return &self.stage;
        }

        if previous == 0 {
            self.requests_issued += 1;
            self.stage = PredictionStage::PredictionLoading;

            self.stage = match remote.predict(session).await {
                Ok(prediction) => {
                    info!(
                        trips,
                        predicted = prediction.predicted_co2_emissions_lbs,
                        "Prediction ready"
                    );
                    PredictionStage::PredictionReady(PredictionReport {
                        prediction,
                        trips,
                        updated_at: Utc::now(),
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Prediction failed");
                    PredictionStage::PredictionFailed(e.to_string())
                }
            };
        }

        &self.stage
    }

    pub fn reset(&mut self) {
        self.stage = PredictionStage::Idle;
        self.observed_len = 0;
    }

    pub fn view(&self) -> ViewState<PredictionReport> {
        match &self.stage {
            PredictionStage::PredictionReady(report) => ViewState::Ready(report.clone()),
            PredictionStage::LedgerLoaded { trips: 0 } | PredictionStage::PredictionFailed(_) => {
                ViewState::Empty(NO_PREDICTION.to_string())
            }
            _ => ViewState::Loading,
        }
    }
}

/// Fetch recommendations for the recommendations view.
pub async fn recommendations(
    remote: &dyn RemoteService,
    session: &SessionId,
) -> ViewState<Vec<Recommendation>> {
    let result = remote.get_recommendations(session).await;
    if let Err(e) = &result {
        warn!(error = %e, "Failed to fetch recommendations");
    }
    ViewState::settle_list(result, NO_RECOMMENDATIONS)
}

/// Send feedback on a recommendation.
///
/// Succeeds only when the service acknowledges with a message.
#[instrument(skip(remote, session, note))]
pub async fn submit_feedback(
    remote: &dyn RemoteService,
    session: &SessionId,
    recommendation_id: &str,
    accepted: bool,
    note: &str,
) -> Result<Ack, ClientError> {
    let recommendation_id = recommendation_id.trim();
    let note = note.trim();
    if recommendation_id.is_empty() || note.is_empty() {
        return Err(ClientError::validation(
            "Please enter recommendation ID and feedback.",
        ));
    }

    let request = FeedbackRequest {
        user_id: session.clone(),
        recommendation_id: recommendation_id.to_string(),
        accepted,
        feedback: note.to_string(),
    };

    let ack = remote.submit_feedback(&request).await?;
    if ack.message.as_deref().is_none_or(|m| m.trim().is_empty()) {
        return Err(ClientError::empty("submit-feedback"));
    }

    info!("Feedback submitted");
    Ok(ack)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub sender: Speaker,
    pub text: String,
}

/// Chat transcript for one session.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a message and record the reply.
    ///
    /// A failed or empty reply is recorded as [`NO_REPLY`] rather than
    /// surfaced as an error.
    pub async fn send(
        &mut self,
        remote: &dyn RemoteService,
        session: &SessionId,
        message: &str,
    ) -> Result<ChatMessage, ClientError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ClientError::validation("Please enter a message."));
        }

        self.messages.push(ChatMessage {
            sender: Speaker::User,
            text: message.to_string(),
        });

        let text = match remote.chat(session, message).await {
            Ok(reply) => reply
                .response
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| NO_REPLY.to_string()),
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                NO_REPLY.to_string()
            }
        };

        let reply = ChatMessage {
            sender: Speaker::Assistant,
            text,
        };
        self.messages.push(reply.clone());
        Ok(reply)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Quick replies are offered only right after an assistant turn.
    pub fn quick_replies(&self) -> &'static [&'static str] {
        match self.messages.last() {
            Some(ChatMessage {
                sender: Speaker::Assistant,
                ..
            }) => &QUICK_REPLIES,
            _ => &[],
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
