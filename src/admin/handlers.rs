use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub tracked_clients: usize,
    pub active_sessions: usize,
}

#[derive(Serialize)]
pub struct ClientStatus {
    pub client: String,
    pub count: u32,
    pub limited: bool,
}

#[derive(Serialize)]
pub struct ClientsSummary {
    pub max_requests: u32,
    pub window_secs: u64,
    pub clients: Vec<ClientStatus>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        tracked_clients: state.guard.limiter().tracked_clients(),
        active_sessions: state.sessions.len(),
    })
}

pub async fn get_clients(State(state): State<AdminState>) -> Json<ClientsSummary> {
    let limiter = state.guard.limiter();
    let max = limiter.max_requests();
    let clients = limiter
        .snapshot()
        .into_iter()
        .map(|(client, count)| ClientStatus {
            client,
            count,
            limited: count > max,
        })
        .collect();

    Json(ClientsSummary {
        max_requests: max,
        window_secs: limiter.window().as_secs(),
        clients,
    })
}

pub async fn get_sessions(State(state): State<AdminState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "active": state.sessions.len(),
    }))
}
