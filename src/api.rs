//! HTTP gateway for the footprint client.
//!
//! Each view of the client is an endpoint. Protected endpoints go through
//! [`require_session`]; without a session they answer `303 See Other` to
//! `/login` and never touch the remote service.
//!
//! # Status mapping
//!
//! | Outcome                   | Response                                   |
//! |---------------------------|--------------------------------------------|
//! | validation failure        | `422` with `{"error": message}`            |
//! | remote service failure    | `502` with `{"error": message}`            |
//! | no usable data            | `200` with `{"state": "empty", "data": …}` |
//! | no session                | `303` to `/login`                          |
//!
//! Views that settle into a [`ViewState`] always answer `200`.
//!
//! # Logging
//!
//! Handlers log outcomes, never credentials. Session ids appear only at
//! debug level.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use crate::client::{ChatTurn, Dashboard, FootprintClient};
use crate::error::ClientError;
use crate::intelligence::PredictionReport;
use crate::model::{
    Ack, CalculationResult, Credentials, Goal, NewAccount, Recommendation, RouteEmissions,
    RoutePlan, SessionGrant, SessionId, Trip, TripInput, ViewState,
};
use crate::progress::ProgressState;
use crate::routes::parse_route_mode;
use crate::session::Access;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<FootprintClient>,
}

/// Handler failure.
#[derive(Debug)]
pub enum ApiError {
    /// No session; redirect to the given view.
    Unauthenticated(&'static str),
    Client(ClientError),
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        ApiError::Client(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated(view) => Redirect::to(view).into_response(),
            ApiError::Client(ClientError::Validation(message)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Client(e @ ClientError::Transport { .. }) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
            ApiError::Client(e @ ClientError::EmptyResult(_)) => {
                Json(ViewState::<()>::Empty(e.to_string())).into_response()
            }
        }
    }
}

/// Resolve the session for a protected endpoint.
pub async fn require_session(state: &AppState) -> Result<SessionId, ApiError> {
    match state.client.gate().await {
        Access::Granted(session) => {
            debug!(session = %session, "Access granted");
            Ok(session)
        }
        Access::Redirect(view) => {
            info!("No session; redirecting to login");
            Err(ApiError::Unauthenticated(view))
        }
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

// ============================================================================
// Session
// ============================================================================

/// POST /login - Log in and start a session.
#[instrument(skip_all)]
pub async fn post_login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionGrant>, ApiError> {
    match state.client.login(&credentials).await {
        Ok(user_id) => Ok(Json(SessionGrant { user_id })),
        Err(e) => {
            warn!(error = %e, "Login failed");
            Err(e.into())
        }
    }
}

/// POST /create-user - Create an account and start a session.
#[instrument(skip_all)]
pub async fn post_create_user(
    State(state): State<AppState>,
    Json(account): Json<NewAccount>,
) -> Result<Json<SessionGrant>, ApiError> {
    match state.client.create_account(&account).await {
        Ok(user_id) => Ok(Json(SessionGrant { user_id })),
        Err(e) => {
            warn!(error = %e, "Account creation failed");
            Err(e.into())
        }
    }
}

/// POST /logout - End the session and return to the login view.
#[instrument(skip_all)]
pub async fn post_logout(State(state): State<AppState>) -> Redirect {
    state.client.logout().await;
    Redirect::to(crate::session::LOGIN_VIEW)
}

// ============================================================================
// Trips and calculations
// ============================================================================

/// GET /dashboard - Reload the ledger from the service.
#[instrument(skip_all)]
pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<Dashboard>, ApiError> {
    let session = require_session(&state).await?;
    let dashboard = state.client.dashboard(&session).await;
    info!(total = dashboard.total_emissions_lbs, "Dashboard loaded");
    Ok(Json(dashboard))
}

/// GET /trips - The local ledger, as last loaded and appended.
#[instrument(skip_all)]
pub async fn get_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, ApiError> {
    let session = require_session(&state).await?;
    Ok(Json(state.client.trips(&session).await))
}

/// POST /trips - Log a trip.
///
/// # Request Body
///
/// ```json
/// {
///     "origin": "Home",
///     "destination": "Work",
///     "mode": "driving",
///     "fuel_type": "gasoline",
///     "passengers": 1,
///     "distance": 10
/// }
/// ```
///
/// Returns `201 Created` with the recorded trip.
#[instrument(skip_all)]
pub async fn post_trip(
    State(state): State<AppState>,
    Json(input): Json<TripInput>,
) -> Result<(StatusCode, Json<Trip>), ApiError> {
    let session = require_session(&state).await?;
    match state.client.log_trip(&session, &input).await {
        Ok(trip) => {
            info!(mode = %trip.transport_mode, "Trip recorded");
            Ok((StatusCode::CREATED, Json(trip)))
        }
        Err(e) => {
            warn!(error = %e, "Failed to log trip");
            Err(e.into())
        }
    }
}

/// POST /calculate - Run a standalone emissions calculation.
#[instrument(skip_all)]
pub async fn post_calculate(
    State(state): State<AppState>,
    Json(input): Json<TripInput>,
) -> Result<Json<CalculationResult>, ApiError> {
    require_session(&state).await?;
    let result = state.client.calculate(&input).await?;
    info!(mode = %input.mode, emissions = result.emissions_lbs_per_person, "Calculation served");
    Ok(Json(result))
}

// ============================================================================
// Progress
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GoalForm {
    #[serde(default)]
    pub goal: String,
}

/// GET /progress - Fetch the current goal.
#[instrument(skip_all)]
pub async fn get_progress(
    State(state): State<AppState>,
) -> Result<Json<ViewState<ProgressState>>, ApiError> {
    let session = require_session(&state).await?;
    Ok(Json(state.client.progress(&session).await))
}

/// POST /progress/goal - Set or replace the goal.
#[instrument(skip_all)]
pub async fn post_goal(
    State(state): State<AppState>,
    Json(form): Json<GoalForm>,
) -> Result<Json<Goal>, ApiError> {
    let session = require_session(&state).await?;
    Ok(Json(state.client.set_goal(&session, &form.goal).await?))
}

// ============================================================================
// Predictions, recommendations, chat
// ============================================================================

/// GET /prediction - Load the ledger, then predict if there is anything to
/// predict from.
#[instrument(skip_all)]
pub async fn get_prediction(
    State(state): State<AppState>,
) -> Result<Json<ViewState<PredictionReport>>, ApiError> {
    let session = require_session(&state).await?;
    Ok(Json(state.client.prediction(&session).await))
}

/// GET /recommendations
#[instrument(skip_all)]
pub async fn get_recommendations(
    State(state): State<AppState>,
) -> Result<Json<ViewState<Vec<Recommendation>>>, ApiError> {
    let session = require_session(&state).await?;
    Ok(Json(state.client.recommendations(&session).await))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub recommendation_id: String,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub feedback: String,
}

/// POST /feedback - Accept or reject a recommendation.
#[instrument(skip_all)]
pub async fn post_feedback(
    State(state): State<AppState>,
    Json(form): Json<FeedbackForm>,
) -> Result<Json<Ack>, ApiError> {
    let session = require_session(&state).await?;
    let ack = state
        .client
        .submit_feedback(
            &session,
            &form.recommendation_id,
            form.accepted,
            &form.feedback,
        )
        .await?;
    Ok(Json(ack))
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

/// POST /chat - Send a message to the assistant.
#[instrument(skip_all)]
pub async fn post_chat(
    State(state): State<AppState>,
    Json(form): Json<ChatForm>,
) -> Result<Json<ChatTurn>, ApiError> {
    let session = require_session(&state).await?;
    Ok(Json(state.client.chat(&session, &form.message).await?))
}

// ============================================================================
// Routes
// ============================================================================

/// Query parameters of the routing endpoints.
#[derive(Debug, Deserialize)]
pub struct RouteForm {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    /// driving, transit, bicycling or walking (default: driving).
    pub mode: Option<String>,
}

/// GET /route-emissions - Estimate emissions between two places.
#[instrument(skip_all)]
pub async fn get_route_emissions(
    State(state): State<AppState>,
    Query(form): Query<RouteForm>,
) -> Result<Json<RouteEmissions>, ApiError> {
    let session = require_session(&state).await?;
    let mode = parse_route_mode(form.mode.as_deref())?;
    let estimate = state
        .client
        .route_emissions(&session, &form.origin, &form.destination, mode)
        .await?;
    Ok(Json(estimate))
}

/// GET /eco-routes - Route alternatives with the optimal one split out.
#[instrument(skip_all)]
pub async fn get_eco_routes(
    State(state): State<AppState>,
    Query(form): Query<RouteForm>,
) -> Result<Json<ViewState<RoutePlan>>, ApiError> {
    let session = require_session(&state).await?;
    let mode = parse_route_mode(form.mode.as_deref())?;
    let view = state
        .client
        .eco_routes(&session, &form.origin, &form.destination, mode)
        .await;
    Ok(Json(view))
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(post_login))
        .route("/create-user", post(post_create_user))
        .route("/logout", post(post_logout))
        .route("/dashboard", get(get_dashboard))
        .route("/trips", get(get_trips).post(post_trip))
        .route("/calculate", post(post_calculate))
        .route("/progress", get(get_progress))
        .route("/progress/goal", post(post_goal))
        .route("/prediction", get(get_prediction))
        .route("/recommendations", get(get_recommendations))
        .route("/feedback", post(post_feedback))
        .route("/chat", post(post_chat))
        .route("/route-emissions", get(get_route_emissions))
        .route("/eco-routes", get(get_eco_routes))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
