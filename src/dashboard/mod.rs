use std::net::SocketAddr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::candidate::CandidateId;
use crate::error::RotaError;
use crate::service::{Command, Outcome, RotationService};

#[derive(Clone)]
pub struct DashboardState {
    pub service: RotationService,
}

#[derive(Serialize)]
struct CommandResponse {
    success: bool,
    outcome: Option<Outcome>,
    error: Option<String>,
}

fn status_for(error: &RotaError) -> StatusCode {
    match error {
        RotaError::AlreadyQueued(_) | RotaError::AlreadyActive(_) | RotaError::OnCooldown { .. } => {
            StatusCode::CONFLICT
        }
        RotaError::NotQueued(_)
        | RotaError::NotActive(_)
        | RotaError::NoCooldownRecord(_)
        | RotaError::NotInvited(_) => StatusCode::NOT_FOUND,
        RotaError::TooNew(_)
        | RotaError::InvalidSlot(_)
        | RotaError::InvalidCooldown(_)
        | RotaError::NotEligibleForExtra(_) => StatusCode::BAD_REQUEST,
        RotaError::Persistence(_) | RotaError::Serialization(_) | RotaError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn failure(error: RotaError) -> Response {
    if error.is_rejection() {
        tracing::debug!(error = %error, "Command rejected");
    } else {
        tracing::error!(error = %error, "Command failed");
    }
    (
        status_for(&error),
        Json(CommandResponse {
            success: false,
            outcome: None,
            error: Some(error.to_string()),
        }),
    )
        .into_response()
}

pub fn router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/queue", get(queue_handler))
        .route("/api/active", get(active_handler))
        .route("/api/cooldowns/:id", get(cooldown_handler))
        .route("/api/commands", post(command_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve the command surface until `shutdown` is cancelled.
pub async fn run_dashboard(addr: SocketAddr, state: DashboardState, shutdown: CancellationToken) {
    let app = router(state);

    tracing::info!(addr = %addr, "Starting HTTP command surface");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind HTTP command surface");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "HTTP command surface failed");
    }
}

async fn status_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.service.status().await)
}

async fn queue_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.service.queue_view().await)
}

async fn active_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.service.active_list().await)
}

async fn cooldown_handler(
    State(state): State<DashboardState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    Json(state.service.check_cooldown(CandidateId(id)).await)
}

async fn command_handler(
    State(state): State<DashboardState>,
    Json(command): Json<Command>,
) -> Response {
    match state.service.execute(command).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(CommandResponse {
                success: true,
                outcome: Some(outcome),
                error: None,
            }),
        )
            .into_response(),
        Err(e) => failure(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_failures_map_to_client_errors() {
        assert_eq!(
            status_for(&RotaError::AlreadyQueued(CandidateId(1))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&RotaError::NotInvited(CandidateId(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&RotaError::InvalidSlot(0)), StatusCode::BAD_REQUEST);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            status_for(&RotaError::Persistence(io)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
