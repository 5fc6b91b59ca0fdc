//! Data models for the footprint client.
//!
//! Types in this module fall into three groups:
//!
//! - Domain values the client reasons about: [`TransportMode`], [`Trip`],
//!   [`Goal`], [`Recommendation`], [`RouteCandidate`].
//! - Request/response shapes of the remote footprint service. Field names
//!   follow the service's JSON (`emissions_lbs_per_person`, `all_routes`, ...).
//! - [`ViewState`], the envelope every fetch-driven view renders.
//!
//! # Credentials
//!
//! [`Credentials`] and [`NewAccount`] carry passwords. Their `Debug`
//! implementations redact the password so they are safe to pass to `tracing`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;

// ============================================================================
// Session
// ============================================================================

/// Opaque session identifier issued by the remote service.
///
/// The service hands out numeric user ids; the client never interprets them
/// and stores them as text. An empty identifier is not a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a raw identifier. Returns `None` for blank input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserialize_string_or_number(deserializer)?;
        SessionId::new(raw).ok_or_else(|| serde::de::Error::custom("empty session identifier"))
    }
}

/// Accept either a JSON string or a JSON integer and return it as text.
fn deserialize_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

/// Form fields arrive as text, but JSON callers may send numbers directly.
fn deserialize_form_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Text(text)) => Some(text),
        Some(Raw::Integer(n)) => Some(n.to_string()),
        Some(Raw::Float(n)) => Some(n.to_string()),
    })
}

/// Login request body.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account creation request body.
#[derive(Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of the login and create-account contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGrant {
    pub user_id: SessionId,
}

// ============================================================================
// Transport modes
// ============================================================================

/// How a trip was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Fuel-burning car or motorcycle.
    Driving,
    /// Battery electric car, scooter or bike.
    Electric,
    /// Bus, subway, train or airplane.
    PublicTransport,
    Biking,
    Walking,
}

impl TransportMode {
    /// Classify a raw mode string, optionally refined by a vehicle type.
    ///
    /// A vehicle type containing `electric` (e.g. `electric_scooter`) always
    /// classifies as [`TransportMode::Electric`], whatever the mode says.
    /// This is the only place vehicle-type strings are inspected; everything
    /// downstream matches on the enum.
    pub fn classify(mode: &str, vehicle_type: Option<&str>) -> Option<Self> {
        let electric_vehicle = vehicle_type
            .map(|v| v.to_ascii_lowercase().contains("electric"))
            .unwrap_or(false);
        if electric_vehicle {
            return Some(TransportMode::Electric);
        }

        match mode.trim().to_ascii_lowercase().as_str() {
            "driving" | "drive" | "fuel_vehicle" => Some(TransportMode::Driving),
            "electric" | "electric_vehicle" => Some(TransportMode::Electric),
            "public_transport" | "transit" => Some(TransportMode::PublicTransport),
            "biking" | "bicycling" => Some(TransportMode::Biking),
            "walking" => Some(TransportMode::Walking),
            _ => None,
        }
    }

    /// Wire name, as accepted by the remote service.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Driving => "driving",
            TransportMode::Electric => "electric",
            TransportMode::PublicTransport => "public_transport",
            TransportMode::Biking => "biking",
            TransportMode::Walking => "walking",
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TransportMode::Driving => "Driving",
            TransportMode::Electric => "Electric Vehicle",
            TransportMode::PublicTransport => "Public Transport",
            TransportMode::Biking => "Biking",
            TransportMode::Walking => "Walking",
        }
    }

    /// Emission factor name used when the caller gives no vehicle type.
    ///
    /// Driving and public transport have no sensible default; the caller
    /// must say which vehicle was used.
    pub fn default_vehicle_type(&self) -> Option<&'static str> {
        match self {
            TransportMode::Electric => Some("electric_car"),
            TransportMode::Biking => Some("bike"),
            TransportMode::Walking => Some("walking"),
            TransportMode::Driving | TransportMode::PublicTransport => None,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Travel mode understood by the routing contracts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    #[default]
    Driving,
    Transit,
    Bicycling,
    Walking,
}

impl RouteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMode::Driving => "driving",
            RouteMode::Transit => "transit",
            RouteMode::Bicycling => "bicycling",
            RouteMode::Walking => "walking",
        }
    }
}

impl From<TransportMode> for RouteMode {
    fn from(mode: TransportMode) -> Self {
        match mode {
            TransportMode::Driving | TransportMode::Electric => RouteMode::Driving,
            TransportMode::PublicTransport => RouteMode::Transit,
            TransportMode::Biking => RouteMode::Bicycling,
            TransportMode::Walking => RouteMode::Walking,
        }
    }
}

// ============================================================================
// Trips
// ============================================================================

/// A trip as entered by the user, before validation.
///
/// Every numeric field is kept as the text the user typed. The dispatcher
/// coerces and validates them; nothing here has been checked yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripInput {
    #[serde(default)]
    pub origin: String,

    #[serde(default)]
    pub destination: String,

    /// Raw transport mode, e.g. "driving" or "public_transport".
    #[serde(default)]
    pub mode: String,

    /// Vehicle kind selected in a calculator form, e.g. "diesel_car",
    /// "electric_scooter" or "subway".
    #[serde(default)]
    pub vehicle_type: Option<String>,

    #[serde(default)]
    pub fuel_type: Option<String>,

    #[serde(default, deserialize_with = "deserialize_form_text")]
    pub mpg: Option<String>,

    #[serde(default, deserialize_with = "deserialize_form_text")]
    pub miles_per_kwh: Option<String>,

    #[serde(default, deserialize_with = "deserialize_form_text")]
    pub passengers: Option<String>,

    /// Distance in miles.
    #[serde(default, deserialize_with = "deserialize_form_text")]
    pub distance: Option<String>,
}

fn default_passengers() -> u32 {
    1
}

/// Passenger count as stored by the service; null or zero count as one.
fn deserialize_passengers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let passengers = Option::<u32>::deserialize(deserializer)?;
    Ok(passengers.unwrap_or_else(default_passengers).max(1))
}

/// A trip recorded by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub origin: String,

    pub destination: String,

    pub transport_mode: TransportMode,

    #[serde(default)]
    pub fuel_type: Option<String>,

    /// Always at least 1.
    #[serde(default = "default_passengers", deserialize_with = "deserialize_passengers")]
    pub passengers: u32,

    #[serde(default)]
    pub miles_per_kwh: Option<f64>,

    pub distance_miles: f64,

    /// Pounds of CO₂; `None` until the calculation has completed.
    #[serde(default)]
    pub emission_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Trip {
    /// A trip is confirmed once the service has attached its emission value.
    pub fn is_confirmed(&self) -> bool {
        self.emission_value.is_some()
    }
}

/// Body of the log-trip contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogTripRequest {
    pub user_id: SessionId,
    pub origin: String,
    pub destination: String,
    pub transport_mode: TransportMode,
    pub fuel_type: Option<String>,
    pub passengers: u32,
    pub miles_per_kwh: Option<f64>,
    pub distance_miles: f64,
}

// ============================================================================
// Emission calculations
// ============================================================================

/// Payload for the fuel-vehicle calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelVehicleRequest {
    /// Vehicle or fuel kind, e.g. "gasoline_car", "diesel" or "bike".
    pub fuel_type: String,

    /// Miles per gallon. Absent when logging a trip; the service then uses
    /// its per-mile factor for `fuel_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpg: Option<f64>,

    pub miles: f64,

    pub passengers: u32,
}

/// Payload for the electric-vehicle calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricVehicleRequest {
    pub electric_type: String,
    pub miles_per_kwh: f64,
    pub miles: f64,
    pub passengers: u32,
}

/// Payload for the public-transport calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTransportRequest {
    pub transport_type: String,
    pub miles: f64,
    pub passengers: u32,
}

/// Exactly one calculation contract, chosen by transport mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalculationRequest {
    FuelVehicle(FuelVehicleRequest),
    ElectricVehicle(ElectricVehicleRequest),
    PublicTransport(PublicTransportRequest),
}

impl CalculationRequest {
    pub fn kind(&self) -> CalculationKind {
        match self {
            CalculationRequest::FuelVehicle(_) => CalculationKind::FuelVehicle,
            CalculationRequest::ElectricVehicle(_) => CalculationKind::ElectricVehicle,
            CalculationRequest::PublicTransport(_) => CalculationKind::PublicTransport,
        }
    }

    pub fn miles(&self) -> f64 {
        match self {
            CalculationRequest::FuelVehicle(r) => r.miles,
            CalculationRequest::ElectricVehicle(r) => r.miles,
            CalculationRequest::PublicTransport(r) => r.miles,
        }
    }

    pub fn passengers(&self) -> u32 {
        match self {
            CalculationRequest::FuelVehicle(r) => r.passengers,
            CalculationRequest::ElectricVehicle(r) => r.passengers,
            CalculationRequest::PublicTransport(r) => r.passengers,
        }
    }
}

/// The three calculation contracts of the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationKind {
    FuelVehicle,
    ElectricVehicle,
    PublicTransport,
}

impl CalculationKind {
    /// Path of the contract, relative to the service base URL.
    pub fn path(&self) -> &'static str {
        match self {
            CalculationKind::FuelVehicle => "calculate/fuel_vehicle",
            CalculationKind::ElectricVehicle => "calculate/electric_vehicle",
            CalculationKind::PublicTransport => "calculate/public_transport",
        }
    }
}

/// Result of a calculation contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Pounds of CO₂ per passenger. Never negative.
    pub emissions_lbs_per_person: f64,

    /// Input fields echoed back by the service.
    #[serde(flatten)]
    pub echo: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Progress
// ============================================================================

/// A self-declared reduction goal and the service's view of progress on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Free text, e.g. "reduce by 10%".
    pub goal: String,

    #[serde(default)]
    pub baseline_emissions: f64,

    #[serde(default)]
    pub current_emissions: f64,

    /// Computed server-side; displayed as-is.
    #[serde(default)]
    pub progress_percentage: f64,
}

// ============================================================================
// Intelligence
// ============================================================================

/// An AI-generated reduction strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,

    #[serde(default)]
    pub category: String,

    #[serde(default, alias = "recommendation_text")]
    pub strategy: String,

    /// Pounds of CO₂ the strategy could save.
    #[serde(default)]
    pub potential_savings: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Feedback on a recommendation. Sent as query parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRequest {
    pub user_id: SessionId,
    pub recommendation_id: String,
    pub accepted: bool,
    pub feedback: String,
}

/// Acknowledgement of a write-only submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted pounds of CO₂ for the next month.
    pub predicted_co2_emissions_lbs: f64,
}

// ============================================================================
// Routing
// ============================================================================

/// Query parameters shared by the two routing contracts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteQuery {
    pub user_id: SessionId,
    pub origin: String,
    pub destination: String,
    pub mode: RouteMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEmissions {
    pub estimated_emissions_lbs: f64,
}

/// One route alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    #[serde(default)]
    pub summary: String,
    pub distance_miles: f64,
    pub duration_minutes: f64,
}

/// Raw eco-routes response. The service reports failure with `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcoRoutesResponse {
    #[serde(default)]
    pub all_routes: Vec<RouteCandidate>,

    #[serde(default)]
    pub optimal_route: Option<RouteCandidate>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Route alternatives with the service-designated optimal one split out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub candidates: Vec<RouteCandidate>,
    pub optimal: Option<RouteCandidate>,
}

// ============================================================================
// Views
// ============================================================================

/// What a fetch-driven view renders.
///
/// A view starts in `Loading` and always settles on one of the other three.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    /// Nothing to show. Carries the message displayed in place of content.
    Empty(String),
    /// The fetch failed and the view says so explicitly.
    Failed(String),
}

impl<T> ViewState<T> {
    /// Settle a view from a fetch result, folding transport failures into
    /// the generic empty state.
    pub fn settle(result: Result<T, ClientError>, empty_message: &str) -> Self {
        match result {
            Ok(value) => ViewState::Ready(value),
            Err(ClientError::Validation(message)) => ViewState::Failed(message),
            Err(_) => ViewState::Empty(empty_message.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> ViewState<Vec<T>> {
    /// Like [`ViewState::settle`], but an empty list is also `Empty`.
    pub fn settle_list(result: Result<Vec<T>, ClientError>, empty_message: &str) -> Self {
        match result {
            Ok(items) if items.is_empty() => ViewState::Empty(empty_message.to_string()),
            other => ViewState::settle(other, empty_message),
        }
    }
}
