use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::Utc;
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    error::ApiResult,
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::timer::TimerEvent,
    services::AppState,
};

/// GET /api/v1/session/countdown
pub async fn get_countdown(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.countdown.snapshot(Utc::now()).await?))
}

/// POST /api/v1/session/countdown/pause
pub async fn pause_countdown(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.countdown.pause(Utc::now()).await?))
}

/// POST /api/v1/session/countdown/resume
pub async fn resume_countdown(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.countdown.resume(Utc::now()).await?))
}

/// POST /api/v1/session/countdown/reset
pub async fn reset_countdown(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.countdown.reset(Utc::now()).await?))
}

/// SSE endpoint for countdown events
/// GET /api/v1/session/countdown/stream
pub async fn countdown_stream(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    // fail fast with 404 when nothing is running
    let first = state.countdown.snapshot(Utc::now()).await?;
    let tick_interval = state.config.countdown_tick_interval_ms.max(1);

    tracing::info!(
        "Starting countdown stream: state={}, remaining={}s, tick_interval={}ms",
        first.state.as_str(),
        first.remaining_seconds,
        tick_interval
    );

    let stream = create_countdown_stream(state, tick_interval);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Decrements the connection gauge when the client goes away.
struct ConnectionGuard;

impl ConnectionGuard {
    fn open() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        ConnectionGuard
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// Ticks until the deadline passes, then emits `time-expired` once and ends.
/// Each tick is recomputed from the persisted deadline, so missed ticks do
/// not cause drift.
fn create_countdown_stream(
    state: Arc<AppState>,
    tick_interval_ms: u64,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (state, ConnectionGuard::open(), true, false),
        move |(state, guard, first, finished)| async move {
            if finished {
                return None;
            }

            if !first {
                sleep(Duration::from_millis(tick_interval_ms)).await;
            }

            let timer_event = match state.countdown.event(Utc::now()).await {
                Ok(event) => event,
                Err(e) => {
                    // reset or cleared while streaming
                    tracing::info!("Countdown stream closed: {}", e);
                    return None;
                }
            };

            let expired = matches!(timer_event, TimerEvent::TimeExpired(_));
            if expired {
                tracing::info!("Countdown expired, closing stream");
            }

            let event = Event::default()
                .event(timer_event.event_name())
                .data(timer_event.to_sse_data());

            Some((Ok(event), (state, guard, false, expired)))
        },
    )
}
