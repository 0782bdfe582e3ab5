//! # Streaming Relay
//!
//! Bridges an inbound streaming request to the Completion Gateway and
//! guarantees the caller a well-formed terminated response even if the
//! upstream stream breaks mid-flight.
//!
//! Per-request state machine: Streaming → Draining (terminal marker or
//! transport end observed before the safety timeout) → Done, or
//! Streaming → Fallback (upstream error or timeout) → Done. The fallback is
//! a single non-streaming gateway call, never retried twice. Each request
//! gets its own pump task and channel; nothing is shared across requests.

pub mod sse;

use crate::{
    error::RelayError,
    gateway::{extract_message_content, CompletionGateway},
    schemas::{CompletionRequest, StreamChunk},
};
use axum::response::sse::{Event, Sse};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use sse::{data_payload, delta_content, LineBuffer, DONE_MARKER};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// How a streaming pump ended.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Terminal marker emitted; the caller got a complete stream.
    Completed,
    /// Upstream errored or the safety timeout fired before the terminal
    /// marker; eligible for the single fallback call.
    Interrupted(String),
    /// The caller disconnected. The upstream subscription and timer are
    /// released with the pump; no fallback is attempted.
    ClientGone,
}

/// SSE response type returned to axum.
pub type RelayStream = Sse<futures_util::stream::Map<
    ReceiverStream<Event>,
    fn(Event) -> Result<Event, Infallible>,
>>;

fn chunk_event(content: String) -> Event {
    let chunk = StreamChunk { content };
    Event::default().data(serde_json::to_string(&chunk).unwrap_or_default())
}

fn done_event() -> Event {
    Event::default().data(DONE_MARKER)
}

fn error_event(error: &RelayError) -> Event {
    let body = serde_json::json!({
        "error": error.kind(),
        "message": error.to_string(),
    });
    Event::default().data(body.to_string())
}

async fn send_done(tx: &mpsc::Sender<Event>) -> StreamOutcome {
    if tx.send(done_event()).await.is_err() {
        StreamOutcome::ClientGone
    } else {
        StreamOutcome::Completed
    }
}

/// Drive an upstream byte stream under the safety timeout, forwarding parsed
/// content fragments in arrival order. Returns how the stream ended; the
/// terminal marker has already been emitted on [`StreamOutcome::Completed`].
pub async fn pump_events<S, E>(
    mut upstream: S,
    timeout: Duration,
    tx: &mpsc::Sender<Event>,
) -> StreamOutcome
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut buffer = LineBuffer::new();
    // Wall-clock deadline from stream start, cleared by returning.
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => {
                return StreamOutcome::Interrupted(
                    "safety timeout elapsed before terminal marker".to_string(),
                );
            }
            next = upstream.next() => {
                match next {
                    Some(Ok(bytes)) => {
                        for line in buffer.push(&bytes) {
                            let Some(payload) = data_payload(&line) else {
                                continue;
                            };
                            if payload == DONE_MARKER {
                                return send_done(tx).await;
                            }
                            if let Some(content) = delta_content(payload) {
                                if tx.send(chunk_event(content)).await.is_err() {
                                    return StreamOutcome::ClientGone;
                                }
                            }
                        }
                    }
                    // Transport end without [DONE] is a normal end: emit the
                    // terminal marker ourselves.
                    None => return send_done(tx).await,
                    Some(Err(err)) => {
                        return StreamOutcome::Interrupted(err.to_string());
                    }
                }
            }
        }
    }
}

/// Relay an already-opened upstream stream to the caller as SSE. Spawns the
/// pump behind a channel; dropping the response (caller disconnect) closes
/// the channel, which stops the pump and releases the upstream subscription.
pub fn relay_stream(
    gateway: CompletionGateway,
    request: CompletionRequest,
    upstream: reqwest::Response,
) -> RelayStream {
    let timeout = Duration::from_secs(gateway.config().stream_timeout);
    let (tx, rx) = mpsc::channel::<Event>(32);

    tokio::spawn(async move {
        let outcome = pump_events(upstream.bytes_stream(), timeout, &tx).await;
        match outcome {
            StreamOutcome::Completed => {
                debug!("stream completed");
            }
            StreamOutcome::ClientGone => {
                debug!("caller disconnected, upstream stream released");
            }
            StreamOutcome::Interrupted(reason) => {
                warn!(%reason, "stream interrupted, falling back to non-streaming call");
                run_fallback(&gateway, &request, &tx).await;
            }
        }
    });

    Sse::new(ReceiverStream::new(rx).map(Ok as fn(Event) -> Result<Event, Infallible>))
}

/// The single fallback attempt: one non-streaming call, its full content
/// forwarded as one chunk followed by the terminal marker. If it fails the
/// error is the stream's final frame.
async fn run_fallback(
    gateway: &CompletionGateway,
    request: &CompletionRequest,
    tx: &mpsc::Sender<Event>,
) {
    let mut fallback = request.clone();
    fallback.stream = Some(false);

    match gateway.complete(&fallback).await {
        Ok(body) => {
            info!("fallback completion succeeded");
            let content = extract_message_content(&body).unwrap_or_default();
            if !content.is_empty() && tx.send(chunk_event(content.to_string())).await.is_err() {
                return;
            }
            let _ = tx.send(done_event()).await;
        }
        Err(err) => {
            warn!(error = %err, "fallback completion failed");
            let _ = tx.send(error_event(&err)).await;
        }
    }
}
