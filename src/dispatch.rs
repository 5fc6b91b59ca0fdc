//! Emissions dispatcher.
//!
//! Turns a raw [`TripInput`] into exactly one calculation contract:
//!
//! 1. [`TransportMode::Electric`] → electric-vehicle request. Needs miles and
//!    miles per kWh; passengers default to 1.
//! 2. [`TransportMode::PublicTransport`] → public-transport request. Needs a
//!    transport type, miles and passengers.
//! 3. Anything else → fuel-vehicle request. Needs a fuel type (biking and
//!    walking use their zero-emission factor names), miles and, for the
//!    standalone calculator, mpg; passengers default to 1.
//!
//! Classification happens once, in [`TransportMode::classify`]. Numeric text
//! is coerced here; a missing or malformed field is a
//! [`ClientError::Validation`] and nothing is sent.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::ClientError;
use crate::model::{
    CalculationRequest, CalculationResult, ElectricVehicleRequest, FuelVehicleRequest,
    LogTripRequest, PublicTransportRequest, SessionId, TransportMode, TripInput,
};
use crate::remote::RemoteService;

/// Which flow is dispatching. The trip-logging flow has no mpg field, so
/// mpg is only mandatory for the standalone calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchContext {
    Calculator,
    TripLog,
}

/// A validated trip, ready for the log-trip contract.
#[derive(Debug, Clone, PartialEq)]
pub struct TripSubmission {
    pub mode: TransportMode,
    /// Calculation contract the trip maps onto.
    pub request: CalculationRequest,
    pub log: LogTripRequest,
}

/// Routes trips to the matching calculation contract.
#[derive(Clone)]
pub struct EmissionsDispatcher {
    remote: Arc<dyn RemoteService>,
}

impl EmissionsDispatcher {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self { remote }
    }

    /// Classify and normalize a trip into its calculation request.
    pub fn prepare(
        input: &TripInput,
        context: DispatchContext,
    ) -> Result<CalculationRequest, ClientError> {
        let mode = classify(input)?;
        build_request(mode, input, context)
    }

    /// Validate a trip for the log-trip contract.
    pub fn prepare_trip(
        session: &SessionId,
        input: &TripInput,
    ) -> Result<TripSubmission, ClientError> {
        let origin = input.origin.trim();
        let destination = input.destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return Err(ClientError::validation(
                "Please enter an origin and a destination.",
            ));
        }

        let mode = classify(input)?;
        let request = build_request(mode, input, DispatchContext::TripLog)?;

        let (fuel_type, miles_per_kwh) = match &request {
            CalculationRequest::FuelVehicle(r) if mode == TransportMode::Driving => {
                (Some(r.fuel_type.clone()), None)
            }
            CalculationRequest::FuelVehicle(_) => (None, None),
            CalculationRequest::ElectricVehicle(r) => {
                (non_blank(input.fuel_type.as_deref()), Some(r.miles_per_kwh))
            }
            CalculationRequest::PublicTransport(r) => (Some(r.transport_type.clone()), None),
        };

        let log = LogTripRequest {
            user_id: session.clone(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            transport_mode: mode,
            fuel_type,
            passengers: request.passengers(),
            miles_per_kwh,
            distance_miles: request.miles(),
        };

        Ok(TripSubmission { mode, request, log })
    }

    /// Run a standalone calculation.
    ///
    /// Validation failures never reach the service. A negative or non-finite
    /// emission value is treated as no usable result.
    #[instrument(skip(self, input), fields(mode = %input.mode))]
    pub async fn dispatch(&self, input: &TripInput) -> Result<CalculationResult, ClientError> {
        let request = Self::prepare(input, DispatchContext::Calculator)?;
        let kind = request.kind();

        let result = self.remote.calculate(&request).await?;

        if !result.emissions_lbs_per_person.is_finite() || result.emissions_lbs_per_person < 0.0 {
            warn!(
                contract = kind.path(),
                value = result.emissions_lbs_per_person,
                "Discarding invalid emission value"
            );
            return Err(ClientError::empty(kind.path()));
        }

        info!(
            contract = kind.path(),
            emissions = result.emissions_lbs_per_person,
            "Emissions calculated"
        );
        Ok(result)
    }
}

fn classify(input: &TripInput) -> Result<TransportMode, ClientError> {
    TransportMode::classify(&input.mode, input.vehicle_type.as_deref()).ok_or_else(|| {
        ClientError::validation(format!("Unknown transport mode '{}'.", input.mode.trim()))
    })
}

fn build_request(
    mode: TransportMode,
    input: &TripInput,
    context: DispatchContext,
) -> Result<CalculationRequest, ClientError> {
    let miles = required_distance(input.distance.as_deref())?;

    match mode {
        TransportMode::Electric => {
            let miles_per_kwh = required_positive(input.miles_per_kwh.as_deref(), "Miles per kWh")?;
            let electric_type = non_blank(input.vehicle_type.as_deref())
                .or_else(|| mode.default_vehicle_type().map(str::to_string))
                .unwrap_or_default();

            Ok(CalculationRequest::ElectricVehicle(ElectricVehicleRequest {
                electric_type,
                miles_per_kwh,
                miles,
                passengers: passengers(input.passengers.as_deref(), Some(1))?,
            }))
        }
        TransportMode::PublicTransport => {
            let transport_type = non_blank(input.vehicle_type.as_deref())
                .or_else(|| non_blank(input.fuel_type.as_deref()))
                .ok_or_else(|| ClientError::validation("Transport type is required."))?;

            Ok(CalculationRequest::PublicTransport(PublicTransportRequest {
                transport_type,
                miles,
                passengers: passengers(input.passengers.as_deref(), None)?,
            }))
        }
        TransportMode::Driving | TransportMode::Biking | TransportMode::Walking => {
            let fuel_type = non_blank(input.vehicle_type.as_deref())
                .or_else(|| non_blank(input.fuel_type.as_deref()))
                .or_else(|| mode.default_vehicle_type().map(str::to_string))
                .ok_or_else(|| ClientError::validation("Fuel type is required."))?;

            let mpg = match context {
                DispatchContext::Calculator => Some(required_positive(input.mpg.as_deref(), "MPG")?),
                DispatchContext::TripLog => optional_positive(input.mpg.as_deref(), "MPG")?,
            };

            Ok(CalculationRequest::FuelVehicle(FuelVehicleRequest {
                fuel_type,
                mpg,
                miles,
                passengers: passengers(input.passengers.as_deref(), Some(1))?,
            }))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number(text: &str, label: &str) -> Result<f64, ClientError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ClientError::validation(format!("{} must be a number.", label)))
}

fn required_distance(value: Option<&str>) -> Result<f64, ClientError> {
    let text = non_blank(value).ok_or_else(|| ClientError::validation("Distance is required."))?;
    let miles = parse_number(&text, "Distance")?;
    if miles < 0.0 {
        return Err(ClientError::validation("Distance cannot be negative."));
    }
    Ok(miles)
}

fn required_positive(value: Option<&str>, label: &str) -> Result<f64, ClientError> {
    optional_positive(value, label)?
        .ok_or_else(|| ClientError::validation(format!("{} is required.", label)))
}

fn optional_positive(value: Option<&str>, label: &str) -> Result<Option<f64>, ClientError> {
    let Some(text) = non_blank(value) else {
        return Ok(None);
    };
    let number = parse_number(&text, label)?;
    if number <= 0.0 {
        return Err(ClientError::validation(format!(
            "{} must be greater than zero.",
            label
        )));
    }
    Ok(Some(number))
}

/// Parse a passenger count. `default` applies only when the field is absent.
fn passengers(value: Option<&str>, default: Option<u32>) -> Result<u32, ClientError> {
    let Some(text) = non_blank(value) else {
        return default.ok_or_else(|| ClientError::validation("Passengers is required."));
    };

    match text.parse::<u32>() {
        Ok(count) if count >= 1 => Ok(count),
        _ => Err(ClientError::validation(
            "Passengers must be a whole number of at least 1.",
        )),
    }
}
