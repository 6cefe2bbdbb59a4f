//! Thin HTTP adapter over the engine.
//!
//! Routes map one-to-one to the engine's boundary contracts and contain
//! no game logic: each handler decodes a request, calls one
//! [`GameManager`] operation, and encodes the result. Real-time
//! propagation is an SSE stream fed by the manager's broadcast channel;
//! the engine never blocks on a slow client.

use crate::games::reversi::GameConfig;
use crate::manager::{EngineError, GameManager};
use crate::snapshot::{GameSnapshot, GameSummary};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument, warn};

/// Body for `POST /games`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateGameRequest {
    /// Board dimensions and clock settings; defaults to an untimed 8x8
    /// game.
    #[serde(default)]
    pub config: GameConfig,
}

/// Response for `POST /games`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGameResponse {
    /// Id of the created game.
    pub game_id: String,
}

/// Body for `POST /games/{id}/join`.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinGameRequest {
    /// Joining user's stable identity.
    pub user_id: String,
    /// Name shown to the opponent.
    pub display_name: String,
}

/// Body for requests identified by user alone (resume, resign,
/// disconnect).
#[derive(Debug, Clone, Deserialize)]
pub struct UserRequest {
    /// Acting user's stable identity.
    pub user_id: String,
}

/// Body for `POST /games/{id}/moves`.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveRequest {
    /// Acting user's stable identity.
    pub user_id: String,
    /// Row-major cell index to place on.
    pub cell: usize,
}

/// Query for `GET /games`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    /// User whose active games to list.
    pub user_id: String,
}

/// Response for `POST /games/{id}/moves`.
#[derive(Debug, Clone, Serialize)]
pub struct MoveResponse {
    /// What the move did.
    pub outcome: crate::games::reversi::MoveOutcome,
    /// Post-move state, identical to what subscribers receive.
    pub snapshot: GameSnapshot,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::GameNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidBoard(_) => StatusCode::BAD_REQUEST,
            EngineError::Join(_) | EngineError::Move(_) => StatusCode::CONFLICT,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Builds the HTTP router over a shared manager.
pub fn router(manager: Arc<GameManager>) -> Router {
    Router::new()
        .route("/games", post(create_game).get(list_games))
        .route("/games/{id}", get(get_snapshot))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/resume", post(resume_session))
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/moves", post(place_piece))
        .route("/games/{id}/resign", post(resign))
        .route("/games/{id}/disconnect", post(disconnect))
        .route("/games/{id}/events", get(game_events))
        .layer(ServiceBuilder::new().map_request(log_request))
        .with_state(manager)
}

/// Binds and serves the router until the process exits.
#[instrument(skip(manager))]
pub async fn serve(manager: Arc<GameManager>, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "http adapter listening");
    axum::serve(listener, router(manager)).await
}

fn log_request(request: Request<Body>) -> Request<Body> {
    debug!(method = %request.method(), uri = %request.uri(), "incoming request");
    request
}

async fn create_game(
    State(manager): State<Arc<GameManager>>,
    body: Option<Json<CreateGameRequest>>,
) -> Result<Json<CreateGameResponse>, EngineError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let game_id = manager.create_game(request.config)?;
    Ok(Json(CreateGameResponse { game_id }))
}

async fn list_games(
    State(manager): State<Arc<GameManager>>,
    Query(params): Query<ListParams>,
) -> Json<Vec<GameSummary>> {
    Json(manager.list_active_games(&params.user_id))
}

async fn get_snapshot(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshot>, EngineError> {
    Ok(Json(manager.snapshot(&game_id)?))
}

async fn join_game(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
    Json(request): Json<JoinGameRequest>,
) -> Result<Json<GameSnapshot>, EngineError> {
    Ok(Json(manager.join_game(
        &game_id,
        &request.user_id,
        &request.display_name,
    )?))
}

async fn resume_session(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
    Json(request): Json<UserRequest>,
) -> Result<Json<GameSnapshot>, EngineError> {
    Ok(Json(manager.resume_session(&game_id, &request.user_id)?))
}

async fn start_game(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshot>, EngineError> {
    Ok(Json(manager.start_game(&game_id)?))
}

async fn place_piece(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, EngineError> {
    let (outcome, snapshot) = manager.place_piece(&game_id, &request.user_id, request.cell)?;
    Ok(Json(MoveResponse { outcome, snapshot }))
}

async fn resign(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
    Json(request): Json<UserRequest>,
) -> Result<Json<GameSnapshot>, EngineError> {
    Ok(Json(manager.resign(&game_id, &request.user_id)?))
}

async fn disconnect(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
    Json(request): Json<UserRequest>,
) -> Result<Json<GameSnapshot>, EngineError> {
    Ok(Json(manager.disconnect(&game_id, &request.user_id)?))
}

/// Streams every event for one game as SSE, named by event kind.
async fn game_events(
    State(manager): State<Arc<GameManager>>,
    Path(game_id): Path<String>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, axum::Error>>>, EngineError> {
    // Reject unknown ids up front instead of streaming silence.
    manager.snapshot(&game_id)?;
    let receiver = manager.subscribe();
    let stream = futures::stream::unfold(
        (receiver, game_id),
        |(mut receiver, game_id)| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.game_id == game_id => {
                        let sse = Event::default()
                            .event(event.kind.to_string())
                            .json_data(&event);
                        return Some((sse, (receiver, game_id)));
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Snapshots are complete states; dropping stale
                        // ones is safe.
                        warn!(game_id = %game_id, skipped, "sse subscriber lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        },
    );
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
