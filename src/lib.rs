//! Footprint - a client for tracking personal transportation emissions.
//!
//! # Overview
//!
//! Footprint talks to a remote footprint service that does the emissions
//! arithmetic, AI recommendations, predictions and route lookups. The client
//! owns everything around those calls:
//!
//! - classifying a trip and sending it to the right calculation contract
//! - holding the session and gating authenticated views
//! - keeping the trip ledger for the session
//! - sequencing derived views (progress, prediction) behind the ledger
//!
//! A small axum gateway exposes each view as an HTTP endpoint.
//!
//! # Modules
//!
//! - [`model`]: Trips, goals, recommendations, routes and the wire shapes of the service
//! - [`error`]: The client error taxonomy
//! - [`config`]: Environment configuration
//! - [`remote`]: The remote service contracts and their reqwest implementation
//! - [`session`]: Session identity, persistence and gating
//! - [`dispatch`]: Trip classification and calculation dispatch
//! - [`ledger`]: The per-session trip ledger
//! - [`progress`]: Goal tracking
//! - [`intelligence`]: Predictions, recommendations, feedback and chat
//! - [`routes`]: Route planning and route emissions
//! - [`client`]: All of the above wired together
//! - [`api`]: HTTP gateway handlers

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod intelligence;
pub mod ledger;
pub mod model;
pub mod progress;
pub mod remote;
pub mod routes;
pub mod session;
