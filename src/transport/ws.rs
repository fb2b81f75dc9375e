//! axum WebSocket adapter
//!
//! Bridges an upgraded WebSocket to a dispatcher session. Each socket gets
//! a send task forwarding the session's encoded frames to the peer and a
//! receive task feeding the dispatcher one frame at a time, which is what
//! preserves per-session arrival order. The peer's close frame (or the
//! receive error that stands in for one) is mapped to a [`CloseStatus`]
//! and reported through `SessionDispatcher::on_close`.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::auth::Identity;
use crate::dispatch::frame::CloseStatus;
use crate::dispatch::SessionDispatcher;
use crate::session::Session;
use crate::transport::{Connection, TransportError};

/// WebSocket upgrade handler
///
/// Entry point for WebSocket connections: upgrades the HTTP request and
/// binds the socket to a fresh session.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(dispatcher): State<Arc<SessionDispatcher>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, dispatcher))
}

enum Outgoing {
    Frame(Vec<u8>),
    Close(CloseStatus),
}

/// Session-facing side of one WebSocket
///
/// The channel to the socket task is bounded so a slow peer backs up into
/// the session's outbound queue, where the configured overflow policy
/// applies, instead of buffering here without limit.
struct WsConnection {
    tx: mpsc::Sender<Outgoing>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Frame(payload))
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn close(&self, status: CloseStatus) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Close(status))
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, dispatcher: Arc<SessionDispatcher>) {
    let (mut sender, mut receiver) = socket.split();
    // Capacity 1: one frame in flight toward the socket, the rest queue in
    // the session where the overflow policy applies
    let (tx, mut rx) = mpsc::channel::<Outgoing>(1);

    let session = match dispatcher
        .on_connect(Arc::new(WsConnection { tx }), Identity::anonymous())
        .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket connection rejected");
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code: 1013,
                    reason: Cow::from("try again later"),
                })))
                .await;
            return;
        }
    };
    tracing::debug!(session_id = %session.id(), "WebSocket attached to session");

    // Forward the session's encoded frames to the peer
    let mut send_task = tokio::spawn(async move {
        while let Some(outgoing) = rx.recv().await {
            match outgoing {
                Outgoing::Frame(bytes) => {
                    let text = match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Encoded frame is not valid UTF-8");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Outgoing::Close(status) => {
                    let frame = CloseFrame {
                        code: status.code,
                        reason: Cow::from(status.reason.unwrap_or_default()),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    let recv_dispatcher = Arc::clone(&dispatcher);
    let recv_session = Arc::clone(&session);

    // Feed inbound frames to the dispatcher, one at a time
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(
                        session_id = %recv_session.id(),
                        error = %e,
                        "WebSocket receive error"
                    );
                    return CloseStatus::protocol_error("receive error");
                }
            };

            match message {
                Message::Text(text) => {
                    if let Some(status) =
                        dispatch_frame(&recv_dispatcher, &recv_session, text.as_bytes()).await
                    {
                        return status;
                    }
                }
                Message::Binary(bytes) => {
                    if let Some(status) =
                        dispatch_frame(&recv_dispatcher, &recv_session, &bytes).await
                    {
                        return status;
                    }
                }
                // axum answers pings itself; pongs just confirm liveness
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(frame) => {
                    tracing::debug!(session_id = %recv_session.id(), "Peer requested close");
                    return close_status_from_peer(frame);
                }
            }
        }
        // Stream ended without a close frame
        CloseStatus::going_away()
    });

    let status = tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            CloseStatus::going_away()
        }
        joined = &mut recv_task => {
            send_task.abort();
            joined.unwrap_or_else(|_| CloseStatus::server_error())
        }
    };

    dispatcher.on_close(&session, status).await;
}

/// Dispatch one inbound frame; `Some(status)` ends the receive loop
async fn dispatch_frame(
    dispatcher: &SessionDispatcher,
    session: &Arc<Session>,
    bytes: &[u8],
) -> Option<CloseStatus> {
    if let Err(e) = dispatcher.on_inbound_frame(session, bytes).await {
        tracing::debug!(session_id = %session.id(), error = %e, "Frame dispatch stopped");
        return Some(CloseStatus::normal());
    }
    // A handler may have closed the session mid-stream
    if !session.is_open() {
        return Some(CloseStatus::normal());
    }
    None
}

fn close_status_from_peer(frame: Option<CloseFrame<'_>>) -> CloseStatus {
    match frame {
        Some(frame) => CloseStatus {
            code: frame.code,
            reason: if frame.reason.is_empty() {
                None
            } else {
                Some(frame.reason.into_owned())
            },
        },
        None => CloseStatus::normal(),
    }
}
