//! Chat relay — forwards a chat turn to the hosted model and streams the
//! generated text back as a plain chunked body.
//!
//! The handler returns as soon as the upstream call is open. A spawned pump
//! task owns the write side of a bounded channel and forwards text deltas
//! into it; the response body is the read side. A second task watches the
//! pump's `JoinHandle` so a panic aborts the body instead of ending it with
//! a clean EOF.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use crate::routes::error_response;
use crate::state::AppState;
use chatrelay_chat::{ensure_vector_store, ChatRequest, EventStream, ResponseEvent, ResponseRequest};
use chatrelay_core::Result;

/// Chunks buffered between the pump and the client before the pump waits.
pub const CHAT_CHANNEL_CAPACITY: usize = 64;

const CHAT_ERROR: &str = "There was an error processing your request";
const INVALID_BODY: &str = "Invalid request body";

type Chunk = std::result::Result<Bytes, io::Error>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// POST /api/chat — stream the model's reply as `text/plain`.
async fn chat(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let span = info_span!("chat", request_id = %uuid::Uuid::new_v4());

    async move {
        let Json(req) = match payload {
            Ok(p) => p,
            Err(rejection) => {
                warn!("Rejected chat request: {}", rejection.body_text());
                return error_response(StatusCode::BAD_REQUEST, INVALID_BODY);
            }
        };

        info!(
            "Chat turn with {} message(s), attachments={}",
            req.messages.len(),
            req.has_attached_files
        );

        let events = match open_upstream(&state, req).await {
            Ok(events) => events,
            Err(e) => {
                error!("Chat relay failed before streaming: {}", e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, CHAT_ERROR);
            }
        };

        (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            spawn_relay(events),
        )
            .into_response()
    }
    .instrument(span)
    .await
}

/// Build the upstream request and open the event stream.
///
/// With attachments, the model gets `file_search` over the shared vector
/// store so it can consult the uploaded files.
async fn open_upstream(state: &AppState, req: ChatRequest) -> Result<EventStream> {
    let mut request = ResponseRequest::streaming(state.config.model.clone(), req.messages);

    if req.has_attached_files {
        let store = ensure_vector_store(state.files.as_ref(), &state.config.vector_store_name).await?;
        debug!("Enabling file_search over {}", store.id);
        request = request.with_file_search(store.id);
    }

    state.model.stream_response(request).await
}

/// Start pumping `events` into a new body and return the body immediately.
pub fn spawn_relay(events: EventStream) -> Body {
    let (tx, rx) = mpsc::channel::<Chunk>(CHAT_CHANNEL_CAPACITY);

    let pump = tokio::spawn(pump_events(events, tx.clone()).in_current_span());
    tokio::spawn(supervise(pump, tx).in_current_span());

    Body::from_stream(ReceiverStream::new(rx))
}

/// Forward text deltas in arrival order. Everything else is dropped.
async fn pump_events(mut events: EventStream, tx: mpsc::Sender<Chunk>) {
    let mut relayed = 0usize;

    while let Some(event) = events.next().await {
        match event {
            Ok(ResponseEvent::OutputTextDelta { delta }) => {
                if delta.is_empty() {
                    continue;
                }
                relayed += delta.len();
                if tx.send(Ok(Bytes::from(delta))).await.is_err() {
                    debug!("Client went away after {} bytes", relayed);
                    return;
                }
            }
            Ok(other) => trace!("Dropping upstream event {:?}", other),
            Err(e) => {
                error!("Stream processing error after {} bytes: {}", relayed, e);
                let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
                return;
            }
        }
    }

    debug!("Upstream finished, relayed {} bytes", relayed);
}

/// Surface a failed pump task as a body abort.
async fn supervise(pump: JoinHandle<()>, tx: mpsc::Sender<Chunk>) {
    if let Err(e) = pump.await {
        error!("Chat relay task failed: {}", e);
        let _ = tx.send(Err(io::Error::other("relay task failed"))).await;
    }
}
