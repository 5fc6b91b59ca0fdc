//! Client for the remote footprint service.
//!
//! The service does the emissions arithmetic, generates recommendations,
//! predictions and chat replies, and resolves routes. This module only
//! speaks its contracts; it never computes anything itself.
//!
//! [`RemoteService`] is the seam every component depends on. [`HttpRemote`]
//! is the production implementation over `reqwest`.
//!
//! # Contracts
//!
//! | Contract                 | Request                                        |
//! |--------------------------|------------------------------------------------|
//! | create-account           | `POST /create_user/` (JSON)                    |
//! | login                    | `POST /login_user/` (JSON)                     |
//! | log-trip                 | `POST /log_trip/` (JSON)                       |
//! | get-trips                | `GET /get_user_trips/{user_id}`                |
//! | calculate-*              | `POST /calculate/{fuel,electric,public}_…`     |
//! | get-progress             | `GET /progress/track_progress/{user_id}`       |
//! | set-goal                 | `POST /progress/set_goal/?user_id&goal`        |
//! | get-recommendations      | `GET /get_ai_recommendations/{user_id}`        |
//! | submit-feedback          | `POST /update_recommendation_feedback?…`       |
//! | chat                     | `POST /chatbot/?user_id&query`                 |
//! | predict                  | `GET /predict_carbon_footprint/{user_id}`      |
//! | route-emissions          | `GET /route_emissions/?…`                      |
//! | eco-routes               | `GET /eco_friendly_routes/?…`                  |

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::model::{
    Ack, CalculationRequest, CalculationResult, ChatReply, Credentials, EcoRoutesResponse,
    FeedbackRequest, Goal, LogTripRequest, NewAccount, Prediction, Recommendation,
    RecommendationsResponse, RouteEmissions, RouteQuery, SessionGrant, SessionId, Trip,
};

/// The fixed set of request contracts offered by the remote service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn create_account(&self, account: &NewAccount) -> Result<SessionGrant, ClientError>;

    async fn login(&self, credentials: &Credentials) -> Result<SessionGrant, ClientError>;

    async fn log_trip(&self, request: &LogTripRequest) -> Result<Trip, ClientError>;

    async fn get_trips(&self, session: &SessionId) -> Result<Vec<Trip>, ClientError>;

    async fn calculate(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, ClientError>;

    /// `Ok(None)` when no goal has been recorded for the session.
    async fn get_progress(&self, session: &SessionId) -> Result<Option<Goal>, ClientError>;

    async fn set_goal(&self, session: &SessionId, goal: &str) -> Result<Goal, ClientError>;

    async fn get_recommendations(
        &self,
        session: &SessionId,
    ) -> Result<Vec<Recommendation>, ClientError>;

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<Ack, ClientError>;

    async fn chat(&self, session: &SessionId, message: &str) -> Result<ChatReply, ClientError>;

    async fn predict(&self, session: &SessionId) -> Result<Prediction, ClientError>;

    async fn route_emissions(&self, query: &RouteQuery) -> Result<RouteEmissions, ClientError>;

    async fn eco_routes(&self, query: &RouteQuery) -> Result<EcoRoutesResponse, ClientError>;
}

/// `reqwest` implementation of [`RemoteService`].
#[derive(Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    /// Create a client for the configured service, with the configured
    /// per-request timeout.
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client with a custom base URL and no timeout (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn session_url(&self, prefix: &str, session: &SessionId) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            prefix,
            urlencoding::encode(session.as_str())
        )
    }
}

/// Turn a sent request into a decoded body, mapping every failure to
/// [`ClientError::Transport`].
async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    sent: reqwest::Result<reqwest::Response>,
) -> Result<T, ClientError> {
    let response = sent.map_err(|e| {
        warn!(endpoint, error = %e, "Remote service unreachable");
        ClientError::transport(endpoint, e)
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!(endpoint, status = status.as_u16(), "Remote service rejected request");
        return Err(ClientError::transport(endpoint, format!("status {}", status)));
    }

    response.json::<T>().await.map_err(|e| {
        warn!(endpoint, error = %e, "Malformed response from remote service");
        ClientError::transport(endpoint, e)
    })
}

/// Decode trip records one at a time. A record that does not fit is logged
/// and skipped so it cannot take the rest of the ledger with it.
fn decode_trips(records: Vec<serde_json::Value>) -> Vec<Trip> {
    let total = records.len();
    let trips: Vec<Trip> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Trip>(record) {
            Ok(trip) => Some(trip),
            Err(e) => {
                warn!(error = %e, "Skipping malformed trip record");
                None
            }
        })
        .collect();

    if trips.len() < total {
        warn!(kept = trips.len(), total, "Some trip records were skipped");
    }
    trips
}

#[async_trait]
impl RemoteService for HttpRemote {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn create_account(&self, account: &NewAccount) -> Result<SessionGrant, ClientError> {
        let sent = self
            .client
            .post(self.url("create_user/"))
            .json(account)
            .send()
            .await;
        decode("create-account", sent).await
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<SessionGrant, ClientError> {
        let sent = self
            .client
            .post(self.url("login_user/"))
            .json(credentials)
            .send()
            .await;
        decode("login", sent).await
    }

    async fn log_trip(&self, request: &LogTripRequest) -> Result<Trip, ClientError> {
        debug!(mode = %request.transport_mode, distance = request.distance_miles, "Logging trip");
        let sent = self
            .client
            .post(self.url("log_trip/"))
            .json(request)
            .send()
            .await;
        decode("log-trip", sent).await
    }

    async fn get_trips(&self, session: &SessionId) -> Result<Vec<Trip>, ClientError> {
        let sent = self
            .client
            .get(self.session_url("get_user_trips", session))
            .send()
            .await;
        let records: Vec<serde_json::Value> = decode("get-trips", sent).await?;
        Ok(decode_trips(records))
    }

    async fn calculate(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, ClientError> {
        let kind = request.kind();
        let sent = self
            .client
            .post(self.url(kind.path()))
            .json(request)
            .send()
            .await;
        decode(kind.path(), sent).await
    }

    async fn get_progress(&self, session: &SessionId) -> Result<Option<Goal>, ClientError> {
        let sent = self
            .client
            .get(self.session_url("progress/track_progress", session))
            .send()
            .await;

        // The service answers 404 for a user who never set a goal.
        if let Ok(response) = &sent {
            if response.status() == StatusCode::NOT_FOUND {
                debug!("No goal recorded");
                return Ok(None);
            }
        }

        decode("get-progress", sent).await
    }

    async fn set_goal(&self, session: &SessionId, goal: &str) -> Result<Goal, ClientError> {
        let sent = self
            .client
            .post(self.url("progress/set_goal/"))
            .query(&[("user_id", session.as_str()), ("goal", goal)])
            .send()
            .await;
        decode("set-goal", sent).await
    }

    async fn get_recommendations(
        &self,
        session: &SessionId,
    ) -> Result<Vec<Recommendation>, ClientError> {
        let sent = self
            .client
            .get(self.session_url("get_ai_recommendations", session))
            .send()
            .await;
        let body: RecommendationsResponse = decode("get-recommendations", sent).await?;
        Ok(body.recommendations)
    }

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<Ack, ClientError> {
        let sent = self
            .client
            .post(self.url("update_recommendation_feedback"))
            .query(request)
            .send()
            .await;
        decode("submit-feedback", sent).await
    }

    async fn chat(&self, session: &SessionId, message: &str) -> Result<ChatReply, ClientError> {
        let sent = self
            .client
            .post(self.url("chatbot/"))
            .query(&[("user_id", session.as_str()), ("query", message)])
            .send()
            .await;
        decode("chat", sent).await
    }

    async fn predict(&self, session: &SessionId) -> Result<Prediction, ClientError> {
        let sent = self
            .client
            .get(self.session_url("predict_carbon_footprint", session))
            .send()
            .await;
        decode("predict", sent).await
    }

    async fn route_emissions(&self, query: &RouteQuery) -> Result<RouteEmissions, ClientError> {
        let sent = self
            .client
            .get(self.url("route_emissions/"))
            .query(query)
            .send()
            .await;
        decode("route-emissions", sent).await
    }

    async fn eco_routes(&self, query: &RouteQuery) -> Result<EcoRoutesResponse, ClientError> {
        let sent = self
            .client
            .get(self.url("eco_friendly_routes/"))
            .query(query)
            .send()
            .await;
        let body: EcoRoutesResponse = decode("eco-routes", sent).await?;

        match &body.error {
            Some(message) => Err(ClientError::transport("eco-routes", message)),
            None => Ok(body),
        }
    }
}

/// In-memory stand-in for the remote service, used by unit tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::model::RouteCandidate;

    #[derive(Default)]
    pub struct FakeState {
        /// Contract names in call order.
        pub calls: Vec<&'static str>,
        /// Contracts that answer with a transport failure.
        pub failing: HashSet<&'static str>,
        /// Trips as the server sees them.
        pub trips: Vec<Trip>,
        pub goal: Option<Goal>,
        pub recommendations: Vec<Recommendation>,
        pub routes: EcoRoutesResponse,
        pub chat_reply: Option<String>,
        /// How long chat takes to answer.
        pub chat_delay: Option<std::time::Duration>,
        pub calculations: Vec<CalculationRequest>,
        pub feedback: Vec<FeedbackRequest>,
    }

    pub struct FakeRemote {
        pub state: Mutex<FakeState>,
    }

    impl FakeRemote {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(FakeState {
                    chat_reply: Some("Try cycling to work.".to_string()),
                    ..FakeState::default()
                }),
            })
        }

        pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
            f(&mut self.state.lock().unwrap())
        }

        pub fn fail(&self, contract: &'static str) {
            self.with(|s| s.failing.insert(contract));
        }

        pub fn calls(&self, contract: &str) -> usize {
            self.with(|s| s.calls.iter().filter(|c| **c == contract).count())
        }

        pub fn total_calls(&self) -> usize {
            self.with(|s| s.calls.len())
        }

        fn enter(&self, contract: &'static str) -> Result<(), ClientError> {
            self.with(|s| {
                s.calls.push(contract);
                if s.failing.contains(contract) {
                    Err(ClientError::transport(contract, "status 500 Internal Server Error"))
                } else {
                    Ok(())
                }
            })
        }
    }

    pub fn route(summary: &str, distance_miles: f64, duration_minutes: f64) -> RouteCandidate {
        RouteCandidate {
            summary: summary.to_string(),
            distance_miles,
            duration_minutes,
        }
    }

    #[async_trait]
    impl RemoteService for FakeRemote {
        async fn create_account(&self, _account: &NewAccount) -> Result<SessionGrant, ClientError> {
            self.enter("create-account")?;
            Ok(SessionGrant {
                user_id: SessionId::new("u124").unwrap(),
            })
        }

        async fn login(&self, credentials: &Credentials) -> Result<SessionGrant, ClientError> {
            self.enter("login")?;
            if credentials.password == "secret" {
                Ok(SessionGrant {
                    user_id: SessionId::new("u123").unwrap(),
                })
            } else {
                Err(ClientError::transport("login", "status 401 Unauthorized"))
            }
        }

        async fn log_trip(&self, request: &LogTripRequest) -> Result<Trip, ClientError> {
            self.enter("log-trip")?;
            let trip = Trip {
                id: Some(self.with(|s| s.trips.len() as i64 + 1)),
                origin: request.origin.clone(),
                destination: request.destination.clone(),
                transport_mode: request.transport_mode,
                fuel_type: request.fuel_type.clone(),
                passengers: request.passengers,
                miles_per_kwh: request.miles_per_kwh,
                distance_miles: request.distance_miles,
                emission_value: Some(request.distance_miles * 0.89 / request.passengers as f64),
                timestamp: None,
            };
            self.with(|s| s.trips.push(trip.clone()));
            Ok(trip)
        }

        async fn get_trips(&self, _session: &SessionId) -> Result<Vec<Trip>, ClientError> {
            self.enter("get-trips")?;
            Ok(self.with(|s| s.trips.clone()))
        }

        async fn calculate(
            &self,
            request: &CalculationRequest,
        ) -> Result<CalculationResult, ClientError> {
            self.enter("calculate")?;
            self.with(|s| s.calculations.push(request.clone()));
            let echo = match serde_json::to_value(request).unwrap() {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            Ok(CalculationResult {
                emissions_lbs_per_person: request.miles() * 0.5 / request.passengers() as f64,
                echo,
            })
        }

        async fn get_progress(&self, _session: &SessionId) -> Result<Option<Goal>, ClientError> {
            self.enter("get-progress")?;
            Ok(self.with(|s| s.goal.clone()))
        }

        async fn set_goal(&self, _session: &SessionId, goal: &str) -> Result<Goal, ClientError> {
            self.enter("set-goal")?;
            let goal = Goal {
                goal: goal.to_string(),
                baseline_emissions: 120.0,
                current_emissions: 108.0,
                progress_percentage: 10.0,
            };
            self.with(|s| s.goal = Some(goal.clone()));
            Ok(goal)
        }

        async fn get_recommendations(
            &self,
            _session: &SessionId,
        ) -> Result<Vec<Recommendation>, ClientError> {
            self.enter("get-recommendations")?;
            Ok(self.with(|s| s.recommendations.clone()))
        }

        async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<Ack, ClientError> {
            self.enter("submit-feedback")?;
            self.with(|s| s.feedback.push(request.clone()));
            Ok(Ack {
                message: Some("Feedback recorded".to_string()),
            })
        }

        async fn chat(&self, _session: &SessionId, _message: &str) -> Result<ChatReply, ClientError> {
            self.enter("chat")?;
            if let Some(delay) = self.with(|s| s.chat_delay) {
                tokio::time::sleep(delay).await;
            }
            Ok(ChatReply {
                response: self.with(|s| s.chat_reply.clone()),
            })
        }

        async fn predict(&self, _session: &SessionId) -> Result<Prediction, ClientError> {
            self.enter("predict")?;
            let total: f64 = self.with(|s| s.trips.iter().filter_map(|t| t.emission_value).sum());
            Ok(Prediction {
                predicted_co2_emissions_lbs: total * 4.0,
            })
        }

        async fn route_emissions(&self, query: &RouteQuery) -> Result<RouteEmissions, ClientError> {
            self.enter("route-emissions")?;
            Ok(RouteEmissions {
                estimated_emissions_lbs: (query.origin.len() + query.destination.len()) as f64,
            })
        }

        async fn eco_routes(&self, _query: &RouteQuery) -> Result<EcoRoutesResponse, ClientError> {
            self.enter("eco-routes")?;
            Ok(self.with(|s| s.routes.clone()))
        }
    }
}
