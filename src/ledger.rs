//! Trip ledger.
//!
//! The ledger is the in-memory, ordered list of a session's trips. It is a
//! pure accumulation:
//!
//! - [`TripLedger::load`] replaces the contents with the service's list.
//!   A failed load leaves an empty ledger, never an unknown one.
//! - [`TripLedger::append`] adds a trip after a successful log, in arrival
//!   order. Nothing is re-sorted or deduplicated, so the local copy may
//!   diverge from the server until the next explicit load.

use tracing::{debug, info, warn};

use crate::dispatch::EmissionsDispatcher;
use crate::error::ClientError;
use crate::model::{SessionId, Trip, TripInput};
use crate::remote::RemoteService;

#[derive(Debug, Default)]
pub struct TripLedger {
    owner: Option<SessionId>,
    trips: Vec<Trip>,
    loaded: bool,
}

impl TripLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ledger with every trip the service holds for `session`.
    pub async fn load(&mut self, remote: &dyn RemoteService, session: &SessionId) -> &[Trip] {
        self.owner = Some(session.clone());
        self.trips = match remote.get_trips(session).await {
            Ok(trips) => {
                info!(count = trips.len(), "Trip ledger loaded");
                trips
            }
            Err(e) => {
                warn!(error = %e, "Trip ledger load failed; treating as empty");
                Vec::new()
            }
        };
        self.loaded = true;
        &self.trips
    }

    /// Record a trip confirmed by the service.
    pub fn append(&mut self, trip: Trip) {
        debug!(
            origin = %trip.origin,
            destination = %trip.destination,
            mode = %trip.transport_mode,
            "Trip appended"
        );
        self.trips.push(trip);
    }

    /// Validate, log and append a trip.
    ///
    /// The ledger only grows when the service accepts the trip.
    pub async fn log_trip(
        &mut self,
        remote: &dyn RemoteService,
        session: &SessionId,
        input: &TripInput,
    ) -> Result<Trip, ClientError> {
        let submission = EmissionsDispatcher::prepare_trip(session, input)?;

        if self.owner.as_ref().is_some_and(|owner| owner != session) {
            self.reset();
        }
        self.owner = Some(session.clone());

        let trip = remote.log_trip(&submission.log).await?;
        info!(
            mode = %trip.transport_mode,
            contract = submission.request.kind().path(),
            emission = ?trip.emission_value,
            "Trip logged"
        );

        self.append(trip.clone());
        Ok(trip)
    }

    /// Drop everything, e.g. on logout.
    pub fn reset(&mut self) {
        self.owner = None;
        self.trips.clear();
        self.loaded = false;
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Whether a load has completed since the last reset.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn owner(&self) -> Option<&SessionId> {
        self.owner.as_ref()
    }

    /// Sum of the emission values of confirmed trips, in pounds of CO₂.
    pub fn total_emissions(&self) -> f64 {
        self.trips.iter().filter_map(|t| t.emission_value).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransportMode;
    use crate::remote::fake::FakeRemote;

    fn session() -> SessionId {
        SessionId::new("u123").unwrap()
    }

    fn trip_input(origin: &str, destination: &str, distance: &str) -> TripInput {
        TripInput {
            origin: origin.to_string(),
            destination: destination.to_string(),
            mode: "driving".to_string(),
            fuel_type: Some("gasoline".to_string()),
            passengers: Some("1".to_string()),
            distance: Some(distance.to_string()),
            ..TripInput::default()
        }
    }

    fn server_trip(origin: &str) -> Trip {
        Trip {
            id: None,
            origin: origin.to_string(),
            destination: "Elsewhere".to_string(),
            transport_mode: TransportMode::Biking,
            fuel_type: None,
            passengers: 1,
            miles_per_kwh: None,
            distance_miles: 3.0,
            emission_value: Some(0.0),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_appends_preserve_submission_order() {
        let remote = FakeRemote::new();
        let mut ledger = TripLedger::new();

        for (i, origin) in ["A", "B", "C", "D"].iter().enumerate() {
            ledger
                .log_trip(remote.as_ref(), &session(), &trip_input(origin, "Z", "10"))
                .await
                .unwrap();
            assert_eq!(ledger.len(), i + 1);
        }

        let origins: Vec<&str> = ledger.trips().iter().map(|t| t.origin.as_str()).collect();
        assert_eq!(origins, vec!["A", "B", "C", "D"]);
        assert!(ledger.trips().iter().all(Trip::is_confirmed));
    }

    #[tokio::test]
    async fn test_scenario_driving_trip_gains_one_entry() {
        let remote = FakeRemote::new();
        let mut ledger = TripLedger::new();

        let trip = ledger
            .log_trip(remote.as_ref(), &session(), &trip_input("Home", "Work", "10"))
            .await
            .unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(trip.transport_mode, TransportMode::Driving);
        assert!((ledger.total_emissions() - 8.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_log_does_not_append() {
        let remote = FakeRemote::new();
        remote.fail("log-trip");
        let mut ledger = TripLedger::new();

        let err = ledger
            .log_trip(remote.as_ref(), &session(), &trip_input("Home", "Work", "10"))
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_trip_is_not_sent() {
        let remote = FakeRemote::new();
        let mut ledger = TripLedger::new();

        let err = ledger
            .log_trip(remote.as_ref(), &session(), &trip_input("Home", "Work", ""))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(remote.total_calls(), 0);
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_is_empty_not_unknown() {
        let remote = FakeRemote::new();
        remote.fail("get-trips");
        let mut ledger = TripLedger::new();

        let trips = ledger.load(remote.as_ref(), &session()).await;

        assert!(trips.is_empty());
        assert!(ledger.is_loaded());
        assert_eq!(ledger.total_emissions(), 0.0);
    }

    #[tokio::test]
    async fn test_post_submit_and_post_reload_views_can_diverge() {
        let remote = FakeRemote::new();
        let mut ledger = TripLedger::new();
        ledger.load(remote.as_ref(), &session()).await;

        ledger
            .log_trip(remote.as_ref(), &session(), &trip_input("Home", "Work", "10"))
            .await
            .unwrap();

        // Another client adds a trip server-side; the local copy does not see it.
        remote.with(|s| s.trips.insert(0, server_trip("Gym")));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.trips()[0].origin, "Home");

        // Reload adopts the server's order wholesale.
        let reloaded = ledger.load(remote.as_ref(), &session()).await;
        let origins: Vec<&str> = reloaded.iter().map(|t| t.origin.as_str()).collect();
        assert_eq!(origins, vec!["Gym", "Home"]);
    }

    #[tokio::test]
    async fn test_appended_trips_survive_first_log() {
        let remote = FakeRemote::new();
        let mut ledger = TripLedger::new();
        ledger.append(server_trip("Old"));

        ledger
            .log_trip(remote.as_ref(), &session(), &trip_input("Home", "Work", "2"))
            .await
            .unwrap();

        let origins: Vec<&str> = ledger.trips().iter().map(|t| t.origin.as_str()).collect();
        assert_eq!(origins, vec!["Old", "Home"]);
        assert_eq!(ledger.owner(), Some(&session()));
    }

    #[tokio::test]
    async fn test_switching_session_resets_ledger() {
        let remote = FakeRemote::new();
        remote.with(|s| s.trips.push(server_trip("Old")));
        let mut ledger = TripLedger::new();
        ledger.load(remote.as_ref(), &session()).await;
        assert_eq!(ledger.len(), 1);

        let other = SessionId::new("u999").unwrap();
        ledger
            .log_trip(remote.as_ref(), &other, &trip_input("Home", "Work", "2"))
            .await
            .unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.trips()[0].origin, "Home");
        assert_eq!(ledger.owner(), Some(&other));
    }
}
