//! A stand-in footprint service served on an ephemeral port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default)]
pub struct MockState {
    pub trips: Vec<Value>,
    pub goal: Option<Value>,
    /// Request paths in arrival order.
    pub hits: Vec<String>,
    pub feedback: Vec<HashMap<String, String>>,
    pub fail_predict: bool,
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockService {
    pub base_url: String,
    pub state: Shared,
}

impl MockService {
    pub fn hits(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .hits
            .iter()
            .filter(|h| h.starts_with(prefix))
            .count()
    }
}

fn hit(state: &Shared, path: impl Into<String>) {
    state.lock().unwrap().hits.push(path.into());
}

async fn create_user(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    hit(&state, "/create_user/");
    assert!(body["username"].is_string());
    Json(json!({ "user_id": 124 }))
}

async fn login_user(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    hit(&state, "/login_user/");
    if body["password"] == "secret" {
        (StatusCode::OK, Json(json!({ "user_id": 123 })))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid credentials" })),
        )
    }
}

async fn log_trip(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    hit(&state, "/log_trip/");
    let distance = body["distance_miles"].as_f64().unwrap_or(0.0);
    let passengers = body["passengers"].as_f64().unwrap_or(1.0);

    let mut state = state.lock().unwrap();
    let mut trip = body.clone();
    let object = trip.as_object_mut().unwrap();
    object.remove("user_id");
    object.insert("id".to_string(), json!(state.trips.len() + 1));
    object.insert("emission_value".to_string(), json!(distance * 0.89 / passengers));
    object.insert("timestamp".to_string(), json!("2024-01-15T10:30:00Z"));
    state.trips.push(trip.clone());

    Json(trip)
}

async fn get_user_trips(State(state): State<Shared>, Path(user_id): Path<String>) -> impl IntoResponse {
    hit(&state, format!("/get_user_trips/{}", user_id));
    let trips = state.lock().unwrap().trips.clone();
    Json(Value::Array(trips))
}

async fn calculate(State(state): State<Shared>, Path(kind): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    hit(&state, format!("/calculate/{}", kind));
    let miles = body["miles"].as_f64().unwrap_or(0.0);
    let passengers = body["passengers"].as_f64().unwrap_or(1.0);
    let factor = match kind.as_str() {
        "fuel_vehicle" => 0.89,
        "electric_vehicle" => 0.2,
        _ => 0.3,
    };

    let mut result = body.clone();
    result
        .as_object_mut()
        .unwrap()
        .insert("emissions_lbs_per_person".to_string(), json!(miles * factor / passengers));
    Json(result)
}

async fn track_progress(State(state): State<Shared>, Path(user_id): Path<String>) -> impl IntoResponse {
    hit(&state, format!("/progress/track_progress/{}", user_id));
    match state.lock().unwrap().goal.clone() {
        Some(goal) => (StatusCode::OK, Json(goal)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "No goal set" })),
        ),
    }
}

async fn set_goal(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    hit(&state, "/progress/set_goal/");
    let goal = json!({
        "goal": query.get("goal").cloned().unwrap_or_default(),
        "baseline_emissions": 120.0,
        "current_emissions": 108.0,
        "progress_percentage": 10.0,
    });
    state.lock().unwrap().goal = Some(goal.clone());
    Json(goal)
}

async fn recommendations(State(state): State<Shared>, Path(user_id): Path<String>) -> impl IntoResponse {
    hit(&state, format!("/get_ai_recommendations/{}", user_id));
    Json(json!({
        "recommendations": [
            {
                "id": 1,
                "category": "transport",
                "recommendation_text": "Carpool for work commutes",
                "potential_savings": 50.0
            }
        ]
    }))
}

async fn feedback(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    hit(&state, "/update_recommendation_feedback");
    state.lock().unwrap().feedback.push(query);
    Json(json!({ "message": "Feedback updated" }))
}

async fn chatbot(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    hit(&state, "/chatbot/");
    let asked = query.get("query").cloned().unwrap_or_default();
    Json(json!({ "response": format!("You asked: {}", asked) }))
}

async fn predict(State(state): State<Shared>, Path(user_id): Path<String>) -> impl IntoResponse {
    hit(&state, format!("/predict_carbon_footprint/{}", user_id));
    let state = state.lock().unwrap();
    if state.fail_predict {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "model unavailable" })),
        );
    }
    let total: f64 = state
        .trips
        .iter()
        .filter_map(|t| t["emission_value"].as_f64())
        .sum();
    (
        StatusCode::OK,
        Json(json!({ "predicted_co2_emissions_lbs": total * 4.0 })),
    )
}

async fn route_emissions(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    hit(&state, "/route_emissions/");
    let estimate = match query.get("mode").map(String::as_str) {
        Some("walking") | Some("bicycling") => 0.0,
        _ => 4.2,
    };
    Json(json!({ "estimated_emissions_lbs": estimate }))
}

async fn eco_routes(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    hit(&state, "/eco_friendly_routes/");
    match query.get("destination").map(String::as_str) {
        Some("Nowhere") => Json(json!({ "error": "Could not geocode destination" })),
        Some("Island") => Json(json!({ "all_routes": [], "optimal_route": null })),
        _ => Json(json!({
            "all_routes": [
                { "summary": "I-90", "distance_miles": 12.0, "duration_minutes": 25.0 },
                { "summary": "Main St", "distance_miles": 10.5, "duration_minutes": 31.0 }
            ],
            "optimal_route": { "summary": "Main St", "distance_miles": 10.5, "duration_minutes": 31.0 }
        })),
    }
}

pub fn mock_router(state: Shared) -> Router {
    Router::new()
        .route("/create_user/", post(create_user))
        .route("/login_user/", post(login_user))
        .route("/log_trip/", post(log_trip))
        .route("/get_user_trips/:user_id", get(get_user_trips))
        .route("/calculate/:kind", post(calculate))
        .route("/progress/track_progress/:user_id", get(track_progress))
        .route("/progress/set_goal/", post(set_goal))
        .route("/get_ai_recommendations/:user_id", get(recommendations))
        .route("/update_recommendation_feedback", post(feedback))
        .route("/chatbot/", post(chatbot))
        .route("/predict_carbon_footprint/:user_id", get(predict))
        .route("/route_emissions/", get(route_emissions))
        .route("/eco_friendly_routes/", get(eco_routes))
        .with_state(state)
}

/// Serve the mock service on an ephemeral port.
pub async fn spawn_mock_service() -> MockService {
    let state: Shared = Arc::new(Mutex::new(MockState::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = mock_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockService {
        base_url: format!("http://{}", addr),
        state,
    }
}
