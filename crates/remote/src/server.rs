// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP server implementation.
//!
//! Routes:
//! - `POST /api/perform`: apply one operation, reply with its result
//! - `GET /api/health`: liveness probe

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use tally_core::{Error, Operation};

use crate::state::ServerState;

/// Path operations are posted to.
pub const PERFORM_PATH: &str = "/api/perform";
/// Path of the liveness probe.
pub const HEALTH_PATH: &str = "/api/health";

/// Build the router serving `state`.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(PERFORM_PATH, post(perform))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

/// Run the HTTP server on the given address.
pub async fn run(addr: SocketAddr, state: ServerState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn perform(State(state): State<ServerState>, Json(body): Json<Value>) -> Response {
    let operation = match Operation::parse(body) {
        Ok(operation) => operation,
        Err(e) => {
            warn!("Rejected operation: {}", e);
            return error_response(StatusCode::BAD_REQUEST, &e);
        }
    };

    let latency = state.latency();
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    match state.apply(&operation).await {
        Ok(result) => {
            debug!(
                operation_id = %operation.operation_id,
                kind = operation.kind(),
                "performed"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            warn!(operation_id = %operation.operation_id, "Operation failed: {}", e);
            error_response(status_for(&e), &e)
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

fn status_for(error: &Error) -> StatusCode {
    if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(status: StatusCode, error: &Error) -> Response {
    (status, Json(json!({"error": error.to_string()}))).into_response()
}
