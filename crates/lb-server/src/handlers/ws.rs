//! Event connections.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use lb_events::transport::DEFAULT_BUFFER;
use lb_events::{ChannelTransport, Outbound, handle_inbound};

use crate::session::read_cookie;
use crate::state::AppState;

/// `GET /` with an upgrade request.
pub async fn upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let session_id = read_cookie(&headers, &state.config.session.cookie_name);
    ws.on_upgrade(move |socket| serve(state, session_id, socket))
}

async fn serve(state: AppState, session_id: Option<String>, socket: WebSocket) {
    let registry = state.registry().clone();
    let id = registry.next_connection_id();
    let (mut sink, mut stream) = socket.split();
    let (transport, mut outbound) = ChannelTransport::new(DEFAULT_BUFFER);
    let mut closed = transport.closed();

    let writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                _ = closed.wait_for(|closed| *closed) => Outbound::Close,
                frame = outbound.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            let result = match frame {
                Outbound::Text(text) => sink.send(Message::Text(text.into())).await,
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if result.is_err() {
                break;
            }
        }
    });

    registry.register(id, session_id, Arc::new(transport)).await;
    registry.sync_connection(id).await;

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => handle_inbound(&registry, id, text.as_str()).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
        if writer.is_finished() {
            break;
        }
    }

    registry.remove(id);
    writer.abort();
    tracing::debug!(connection = %id, "connection closed");
}
