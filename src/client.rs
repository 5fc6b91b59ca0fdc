//! The footprint client: every component wired to one remote service and
//! one session.
//!
//! The ledger and the prediction share a lock so a logged trip and the
//! prediction re-evaluation it triggers are observed together. The goal and
//! the chat transcript are locked on their own. All of it is dropped on
//! logout and whenever a different session shows up.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::dispatch::EmissionsDispatcher;
use crate::error::ClientError;
use crate::intelligence::{
    self, ChatMessage, Conversation, PredictionOrchestrator, PredictionReport,
};
use crate::ledger::TripLedger;
use crate::model::{
    Ack, CalculationResult, Credentials, Goal, NewAccount, Recommendation, RouteEmissions,
    RouteMode, RoutePlan, SessionId, Trip, TripInput, ViewState,
};
use crate::progress::{ProgressState, ProgressTracker};
use crate::remote::RemoteService;
use crate::routes::RoutePlanner;
use crate::session::{Access, SessionManager, SessionStore};

/// Shown on the dashboard when the ledger is empty.
pub const NO_TRIPS: &str = "No trips logged yet.";

/// Dashboard payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub trips: ViewState<Vec<Trip>>,
    pub total_emissions_lbs: f64,
}

/// Result of one chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub reply: ChatMessage,
    pub transcript: Vec<ChatMessage>,
    pub quick_replies: Vec<&'static str>,
}

/// The ledger and the prediction that depends on it move together.
#[derive(Default)]
struct TripViews {
    ledger: TripLedger,
    prediction: PredictionOrchestrator,
}

impl TripViews {
    fn reset(&mut self) {
        self.ledger.reset();
        self.prediction.reset();
    }
}

pub struct FootprintClient {
    remote: Arc<dyn RemoteService>,
    sessions: SessionManager,
    dispatcher: EmissionsDispatcher,
    routes: RoutePlanner,
    /// Session the views below belong to.
    owner: Mutex<Option<SessionId>>,
    trips: Mutex<TripViews>,
    progress: Mutex<ProgressTracker>,
    conversation: Mutex<Conversation>,
}

impl FootprintClient {
    pub fn new(remote: Arc<dyn RemoteService>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            dispatcher: EmissionsDispatcher::new(remote.clone()),
            routes: RoutePlanner::new(remote.clone()),
            sessions: SessionManager::new(store),
            owner: Mutex::new(None),
            trips: Mutex::new(TripViews::default()),
            progress: Mutex::new(ProgressTracker::new()),
            conversation: Mutex::new(Conversation::new()),
            remote,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Pick up a persisted session, if any.
    pub async fn restore(&self) -> anyhow::Result<Option<SessionId>> {
        self.sessions.restore().await
    }

    pub async fn gate(&self) -> Access {
        self.sessions.gate().await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<SessionId, ClientError> {
        let session = self.sessions.login(self.remote.as_ref(), credentials).await?;
        self.reset_views(None).await;
        Ok(session)
    }

    pub async fn create_account(&self, account: &NewAccount) -> Result<SessionId, ClientError> {
        let session = self
            .sessions
            .create_account(self.remote.as_ref(), account)
            .await?;
        self.reset_views(None).await;
        Ok(session)
    }

    /// Clear the session and everything derived from it.
    pub async fn logout(&self) {
        self.sessions.clear().await;
        self.reset_views(None).await;
        info!("Logged out");
    }

    async fn reset_views(&self, owner: Option<SessionId>) {
        let mut current = self.owner.lock().await;
        self.trips.lock().await.reset();
        self.progress.lock().await.reset();
        self.conversation.lock().await.clear();
        *current = owner;
    }

    /// Drop every view if they belong to another session.
    ///
    /// Each view has its own lock, so a slow chat reply does not hold up
    /// the ledger or the goal.
    async fn claim(&self, session: &SessionId) {
        let mut owner = self.owner.lock().await;
        if owner.as_ref() == Some(session) {
            return;
        }
        debug!("Session changed; resetting views");
        self.trips.lock().await.reset();
        self.progress.lock().await.reset();
        self.conversation.lock().await.clear();
        *owner = Some(session.clone());
    }

    async fn trip_views(&self, session: &SessionId) -> MutexGuard<'_, TripViews> {
        self.claim(session).await;
        self.trips.lock().await
    }

    /// Reload the ledger from the service.
    pub async fn dashboard(&self, session: &SessionId) -> Dashboard {
        let mut views = self.trip_views(session).await;
        let TripViews { ledger, prediction } = &mut *views;

        ledger.load(self.remote.as_ref(), session).await;
        prediction
            .ledger_changed(self.remote.as_ref(), ledger, session)
            .await;

        Dashboard {
            trips: ViewState::settle_list(Ok(ledger.trips().to_vec()), NO_TRIPS),
            total_emissions_lbs: ledger.total_emissions(),
        }
    }

    /// The local ledger, without contacting the service.
    pub async fn trips(&self, session: &SessionId) -> Vec<Trip> {
        self.trip_views(session).await.ledger.trips().to_vec()
    }

    pub async fn log_trip(&self, session: &SessionId, input: &TripInput) -> Result<Trip, ClientError> {
        let mut views = self.trip_views(session).await;
        let TripViews { ledger, prediction } = &mut *views;

        let trip = ledger.log_trip(self.remote.as_ref(), session, input).await?;
        prediction
            .ledger_changed(self.remote.as_ref(), ledger, session)
            .await;
        Ok(trip)
    }

    pub async fn calculate(&self, input: &TripInput) -> Result<CalculationResult, ClientError> {
        self.dispatcher.dispatch(input).await
    }

    pub async fn progress(&self, session: &SessionId) -> ViewState<ProgressState> {
        self.claim(session).await;
        let mut progress = self.progress.lock().await;
        progress.fetch(self.remote.as_ref(), session).await;
        progress.view()
    }

    pub async fn set_goal(&self, session: &SessionId, goal: &str) -> Result<Goal, ClientError> {
        self.claim(session).await;
        self.progress
            .lock()
            .await
            .set_goal(self.remote.as_ref(), session, goal)
            .await
    }

    /// Enter the prediction view.
    pub async fn prediction(&self, session: &SessionId) -> ViewState<PredictionReport> {
        let mut views = self.trip_views(session).await;
        let TripViews { ledger, prediction } = &mut *views;

        prediction.start(self.remote.as_ref(), ledger, session).await;
        prediction.view()
    }

    pub async fn recommendations(&self, session: &SessionId) -> ViewState<Vec<Recommendation>> {
        intelligence::recommendations(self.remote.as_ref(), session).await
    }

    pub async fn submit_feedback(
        &self,
        session: &SessionId,
        recommendation_id: &str,
        accepted: bool,
        note: &str,
    ) -> Result<Ack, ClientError> {
        intelligence::submit_feedback(
            self.remote.as_ref(),
            session,
            recommendation_id,
            accepted,
            note,
        )
        .await
    }

    pub async fn chat(&self, session: &SessionId, message: &str) -> Result<ChatTurn, ClientError> {
        self.claim(session).await;
        let mut conversation = self.conversation.lock().await;
        let reply = conversation
            .send(self.remote.as_ref(), session, message)
            .await?;

        Ok(ChatTurn {
            reply,
            transcript: conversation.messages().to_vec(),
            quick_replies: conversation.quick_replies().to_vec(),
        })
    }

    pub async fn eco_routes(
        &self,
        session: &SessionId,
        origin: &str,
        destination: &str,
        mode: RouteMode,
    ) -> ViewState<RoutePlan> {
        self.routes.view(session, origin, destination, mode).await
    }

    pub async fn route_emissions(
        &self,
        session: &SessionId,
        origin: &str,
        destination: &str,
        mode: RouteMode,
    ) -> Result<RouteEmissions, ClientError> {
        self.routes
            .route_emissions(session, origin, destination, mode)
            .await
    }
}
