//! Route planning and route emissions.
//!
//! The service ranks the alternatives; [`RoutePlanner::plan_routes`] only
//! separates its designated optimal route from the candidate list. Unlike
//! the other views, the route view keeps "could not fetch" and "nothing
//! found" apart.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::ClientError;
use crate::model::{
    RouteEmissions, RouteMode, RoutePlan, RouteQuery, SessionId, TransportMode, ViewState,
};
use crate::remote::RemoteService;

pub const ROUTES_FAILED: &str = "Failed to fetch eco-routes.";
pub const NO_ROUTES: &str = "No routes found.";

/// Parse a route mode. Accepts the routing names and any transport mode;
/// absent means driving.
pub fn parse_route_mode(raw: Option<&str>) -> Result<RouteMode, ClientError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(RouteMode::default()),
        Some(raw) => raw.to_ascii_lowercase(),
    };

    match raw.as_str() {
        "driving" => Ok(RouteMode::Driving),
        "transit" => Ok(RouteMode::Transit),
        "bicycling" => Ok(RouteMode::Bicycling),
        "walking" => Ok(RouteMode::Walking),
        other => TransportMode::classify(other, None)
            .map(RouteMode::from)
            .ok_or_else(|| ClientError::validation(format!("Unknown route mode '{}'.", other))),
    }
}

fn route_query(
    session: &SessionId,
    origin: &str,
    destination: &str,
    mode: RouteMode,
) -> Result<RouteQuery, ClientError> {
    let origin = origin.trim();
    let destination = destination.trim();
    if origin.is_empty() || destination.is_empty() {
        return Err(ClientError::validation(
            "Please enter both origin and destination.",
        ));
    }

    Ok(RouteQuery {
        user_id: session.clone(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        mode,
    })
}

#[derive(Clone)]
pub struct RoutePlanner {
    remote: Arc<dyn RemoteService>,
}

impl RoutePlanner {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self { remote }
    }

    /// Fetch route alternatives and split out the optimal one.
    ///
    /// `candidates` keeps the service's order and still contains the
    /// optimal route.
    #[instrument(skip(self, session))]
    pub async fn plan_routes(
        &self,
        session: &SessionId,
        origin: &str,
        destination: &str,
        mode: RouteMode,
    ) -> Result<RoutePlan, ClientError> {
        let query = route_query(session, origin, destination, mode)?;
        let response = self.remote.eco_routes(&query).await?;

        if response.all_routes.is_empty() && response.optimal_route.is_none() {
            return Err(ClientError::empty("eco-routes"));
        }

        info!(
            candidates = response.all_routes.len(),
            optimal = response.optimal_route.is_some(),
            "Routes planned"
        );
        Ok(RoutePlan {
            candidates: response.all_routes,
            optimal: response.optimal_route,
        })
    }

    /// Estimate emissions for travelling between two places.
    #[instrument(skip(self, session))]
    pub async fn route_emissions(
        &self,
        session: &SessionId,
        origin: &str,
        destination: &str,
        mode: RouteMode,
    ) -> Result<RouteEmissions, ClientError> {
        let query = route_query(session, origin, destination, mode)?;
        let estimate = self.remote.route_emissions(&query).await?;

        if !estimate.estimated_emissions_lbs.is_finite() || estimate.estimated_emissions_lbs < 0.0 {
            warn!(value = estimate.estimated_emissions_lbs, "Discarding invalid route estimate");
            return Err(ClientError::empty("route-emissions"));
        }
        Ok(estimate)
    }

    /// Route view: validation and fetch failures are shown as failures,
    /// no routes as empty.
    pub async fn view(
        &self,
        session: &SessionId,
        origin: &str,
        destination: &str,
        mode: RouteMode,
    ) -> ViewState<RoutePlan> {
        match self.plan_routes(session, origin, destination, mode).await {
            Ok(plan) => ViewState::Ready(plan),
            Err(ClientError::Validation(message)) => ViewState::Failed(message),
            Err(ClientError::EmptyResult(_)) => ViewState::Empty(NO_ROUTES.to_string()),
            Err(e) => {
                warn!(error = %e, "Route planning failed");
                ViewState::Failed(ROUTES_FAILED.to_string())
            }
        }
    }
}
