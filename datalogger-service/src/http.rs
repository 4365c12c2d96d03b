use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::pipeline::Pipeline;
use crate::validate;
use datalogger_client::db::MAX_SUMMARY_DAYS;

const DEFAULT_RECENT_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub started_at: Instant,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", post(submit_reading).get(recent_readings))
        .route("/api/energy", get(energy_to_date))
        .route("/api/daily", get(daily_summaries))
        .route("/api/alert", post(submit_alert))
        .route("/api/status", get(service_status))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Producer ingest: validate, commit, broadcast, acknowledge with the
/// committed record.
async fn submit_reading(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Response {
    let rec = match validate::validate_reading(&payload) {
        Ok(rec) => rec,
        Err(e) => {
            metrics::counter!("validation_rejected_total").increment(1);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string(), "fields": e.fields })),
            )
                .into_response();
        }
    };

    match state.pipeline.submit(rec).await {
        Ok(reading) => {
            tracing::info!(id = reading.id, p_total = reading.p_total, "reading committed");
            (StatusCode::CREATED, Json(reading)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "commit failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Recent history window, oldest first. A malformed or absent `limit` falls
/// back to the default instead of rejecting the request.
async fn recent_readings(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(DEFAULT_RECENT_LIMIT);

    match state.pipeline.store().recent(limit).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "recent query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn energy_to_date(State(state): State<AppState>) -> Response {
    let kwh = state.pipeline.store().energy_to_date().await;
    Json(json!({ "kwh": kwh })).into_response()
}

async fn daily_summaries(State(state): State<AppState>) -> Response {
    match state.pipeline.store().daily_summaries(MAX_SUMMARY_DAYS).await {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "daily summary query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Broadcast an alert to all observers. Nothing is persisted.
async fn submit_alert(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Response {
    match validate::validate_alert(&payload) {
        Ok(alert) => {
            state.pipeline.alert(&alert).await;
            Json(json!({ "ok": true })).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string(), "fields": e.fields })),
        )
            .into_response(),
    }
}

async fn service_status(State(state): State<AppState>) -> Response {
    let readings = match state.pipeline.store().count().await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "count query failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Json(json!({
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "readings": readings,
        "observers": state.pipeline.observer_count().await,
    }))
    .into_response()
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One task per observer connection: forward queued frames to the socket,
/// drain the read side for a close, unsubscribe on whichever side ends
/// first.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, rx) = match state.pipeline.subscribe().await {
        Ok(sub) => sub,
        Err(e) => {
            tracing::error!(error = %e, "snapshot failed, closing socket");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();
    let mut frames = UnboundedReceiverStream::new(rx);

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = frames.next().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.pipeline.unsubscribe(&id).await;
}
