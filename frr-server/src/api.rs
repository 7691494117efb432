//! REST API and SSE routes

use crate::playback::{start_playback_task, stop_playback_task};
use crate::state::{AppState, LoadStatus};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use frr_core::model::{RaceSummary, Session, TrackOutline};
use frr_core::provider::{RaceDataProvider, RACE_SESSION};
use frr_core::replay::{FrameMask, TrackLayout};
use frr_core::scrubber::{PlaybackSpeed, PlaybackState};
use frr_core::ReplayError;
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

type ApiError = (StatusCode, String);

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/providers", get(list_providers))
        .route("/api/races", get(list_races))
        // Replay endpoints
        .route("/api/replay/load", post(replay_load))
        .route("/api/replay/status", get(replay_status))
        .route("/api/replay/frame", get(replay_frame))
        .route("/api/replay/track", get(replay_track))
        .route("/api/replay/control", post(replay_control))
        .route("/api/replay/stream", get(replay_stream))
        .route("/api/replay", delete(replay_delete))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn no_replay() -> ApiError {
    (StatusCode::NOT_FOUND, "No replay loaded".to_string())
}

// === Provider Endpoints ===

#[derive(Serialize)]
struct ProviderInfo {
    key: String,
    name: String,
}

async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    let providers = state.providers.read().await;
    let info = providers
        .iter()
        .map(|provider| ProviderInfo {
            key: provider.key().to_string(),
            name: provider.name().to_string(),
        })
        .collect();
    Json(info)
}

#[derive(Deserialize)]
struct RacesQuery {
    provider: Option<String>,
}

async fn find_provider(
    state: &AppState,
    key: Option<&str>,
) -> Result<Arc<dyn RaceDataProvider>, ApiError> {
    state.provider(key).await.ok_or_else(|| {
        let err = ReplayError::UnknownProvider(key.unwrap_or("(default)").to_string());
        (StatusCode::NOT_FOUND, err.to_string())
    })
}

async fn list_races(
    State(state): State<AppState>,
    Query(query): Query<RacesQuery>,
) -> Result<Json<Vec<RaceSummary>>, ApiError> {
    let provider = find_provider(&state, query.provider.as_deref()).await?;

    let races = tokio::task::spawn_blocking(move || provider.list_races())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Race listing task failed: {}", e)))?
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("Failed to list races: {:#}", e)))?;

    Ok(Json(races))
}

// === Replay Endpoints ===

#[derive(Deserialize)]
struct LoadRequest {
    provider: Option<String>,
    year: i32,
    gp: String,
    session: Option<String>,
}

/// Fetch session data and outline concurrently on the blocking pool
async fn fetch_race(
    provider: Arc<dyn RaceDataProvider>,
    year: i32,
    gp: String,
    session: String,
) -> anyhow::Result<(Session, TrackOutline)> {
    let session_task = {
        let provider = provider.clone();
        let gp = gp.clone();
        tokio::task::spawn_blocking(move || provider.race_data(year, &gp, &session))
    };
    let outline_task = tokio::task::spawn_blocking(move || provider.track_outline(year, &gp));

    let (session, outline) = tokio::join!(session_task, outline_task);
    Ok((session??, outline??))
}

async fn set_load_status(state: &AppState, status: LoadStatus) {
    *state.load_status.write().await = status;
}

/// Load a race into the replay, replacing whatever was there
async fn replay_load(
    State(state): State<AppState>,
    Json(request): Json<LoadRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let provider = find_provider(&state, request.provider.as_deref()).await?;
    let session_code = request.session.unwrap_or_else(|| RACE_SESSION.to_string());

    tracing::info!(
        provider = provider.key(),
        year = request.year,
        gp = %request.gp,
        session = %session_code,
        "Loading race"
    );
    set_load_status(
        &state,
        LoadStatus {
            loading: true,
            ..LoadStatus::default()
        },
    )
    .await;
    stop_playback_task(&state).await;

    let result = fetch_race(provider, request.year, request.gp.clone(), session_code)
        .await
        .map_err(ReplayError::from);

    let loaded = {
        let mut replay = state.replay.write().await;
        match result {
            Ok((session, outline)) => {
                let total_laps = session.total_laps;
                let drivers = session.drivers.len();
                match replay.load(session, outline) {
                    Ok(generation) => Ok(json!({
                        "status": "ok",
                        "generation": generation,
                        "samples": replay.scrubber().len(),
                        "total_laps": total_laps,
                        "drivers": drivers,
                    })),
                    Err(e) => Err(e),
                }
            }
            Err(e) => {
                replay.clear();
                Err(e)
            }
        }
    };

    match loaded {
        Ok(info) => {
            set_load_status(
                &state,
                LoadStatus {
                    loading: false,
                    error: None,
                    loaded_at: Some(chrono::Utc::now()),
                },
            )
            .await;
            state.broadcast_current_frame().await;
            tracing::info!(gp = %request.gp, "Race loaded");
            Ok(Json(info))
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!("Race load failed: {}", message);
            set_load_status(
                &state,
                LoadStatus {
                    loading: false,
                    error: Some(message.clone()),
                    loaded_at: None,
                },
            )
            .await;
            let status = match e {
                ReplayError::EmptySession => StatusCode::UNPROCESSABLE_ENTITY,
                ReplayError::UnknownProvider(_) => StatusCode::NOT_FOUND,
                ReplayError::Fetch(_) => StatusCode::BAD_GATEWAY,
            };
            Err((status, message))
        }
    }
}

#[derive(Serialize)]
struct ReplayStatus {
    #[serde(flatten)]
    load: LoadStatus,
    loaded: bool,
    generation: u64,
    samples: usize,
    playback: PlaybackState,
}

async fn replay_status(State(state): State<AppState>) -> Json<ReplayStatus> {
    let load = state.load_status.read().await.clone();
    let replay = state.replay.read().await;
    Json(ReplayStatus {
        load,
        loaded: replay.is_loaded(),
        generation: replay.generation(),
        samples: replay.scrubber().len(),
        playback: replay.playback(),
    })
}

#[derive(Deserialize)]
struct FrameQuery {
    index: Option<f64>,
    fields: Option<String>,
}

async fn replay_frame(
    State(state): State<AppState>,
    Query(query): Query<FrameQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let replay = state.replay.read().await;
    if !replay.is_loaded() {
        return Err(no_replay());
    }

    let frame = match query.index {
        Some(index) => replay.frame_at(index).ok_or((
            StatusCode::NOT_FOUND,
            format!("No sample at index {}", index),
        ))?,
        None => replay.frame().ok_or_else(no_replay)?,
    };

    let mask = query.fields.map(|f| FrameMask::parse(&f));
    let json = frame.to_json_filtered(mask.as_ref()).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize frame: {}", e),
        )
    })?;
    Ok(Json(json))
}

async fn replay_track(State(state): State<AppState>) -> Result<Json<TrackLayout>, ApiError> {
    let replay = state.replay.read().await;
    replay.track_layout().map(Json).ok_or_else(no_replay)
}

#[derive(Deserialize)]
struct ControlRequest {
    action: String,
    value: Option<f64>,
}

#[derive(Serialize)]
struct ControlResponse {
    action: String,
    /// False when the action was a no-op (nothing loaded, already playing, ...)
    applied: bool,
    playback: PlaybackState,
}

async fn replay_control(
    State(state): State<AppState>,
    Json(request): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    let action = request.action.to_lowercase();

    // Validate before touching the replay so bad requests never mutate it
    let speed = match (action.as_str(), request.value) {
        ("seek", None) => {
            return Err((StatusCode::BAD_REQUEST, "Missing 'value' for seek".to_string()))
        }
        ("speed", Some(value)) => Some(parse_speed(value)?),
        ("play" | "pause" | "toggle" | "seek" | "rewind" | "speed", _) => None,
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown action: {}", request.action),
            ))
        }
    };

    let (applied, start_task, stop_task) = {
        let mut replay = state.replay.write().await;
        if !replay.is_loaded() {
            tracing::debug!(action = %action, "Control ignored, no replay loaded");
            return Ok(Json(ControlResponse {
                action,
                applied: false,
                playback: replay.playback(),
            }));
        }

        match action.as_str() {
            "play" => {
                let changed = replay.play();
                (changed, changed, false)
            }
            "pause" => (replay.pause(), false, true),
            "toggle" => {
                let was_playing = replay.scrubber().is_playing();
                replay.toggle();
                let now_playing = replay.scrubber().is_playing();
                let changed = was_playing != now_playing;
                (changed, changed && now_playing, changed && !now_playing)
            }
            "seek" => {
                replay.seek(request.value.unwrap_or_default());
                (true, false, true)
            }
            "rewind" => {
                replay.rewind();
                (true, false, false)
            }
            _ => {
                match speed {
                    Some(speed) => replay.set_speed(speed),
                    None => {
                        replay.cycle_speed();
                    }
                }
                (true, false, false)
            }
        }
    };

    if stop_task {
        stop_playback_task(&state).await;
    }
    if start_task {
        start_playback_task(state.clone()).await;
    }
    if applied && !start_task {
        state.broadcast_current_frame().await;
    }

    let playback = state.replay.read().await.playback();
    tracing::debug!(action = %action, applied, index = playback.index, "Replay control");
    Ok(Json(ControlResponse {
        action,
        applied,
        playback,
    }))
}

fn parse_speed(value: f64) -> Result<PlaybackSpeed, ApiError> {
    let invalid = || {
        (
            StatusCode::BAD_REQUEST,
            format!("Unsupported speed {}; expected 1, 2, 4 or 8", value),
        )
    };
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(invalid());
    }
    PlaybackSpeed::try_from(value as u32).map_err(|_| invalid())
}

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn replay_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let mask = query.fields.map(|f| FrameMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = mask.clone();
        async move {
            match result {
                Ok(frame) => match frame.to_json_filtered(mask.as_ref()) {
                    Ok(json) => Some(Ok(Event::default().data(json.to_string()))),
                    Err(e) => {
                        tracing::error!("Failed to serialize frame: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn replay_delete(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    stop_playback_task(&state).await;

    {
        let mut replay = state.replay.write().await;
        if !replay.is_loaded() {
            return Err(no_replay());
        }
        replay.clear();
    }
    set_load_status(&state, LoadStatus::default()).await;

    tracing::info!("Replay stopped and cleared");
    Ok(StatusCode::NO_CONTENT)
}
