//! HTTP and WebSocket handlers.

use std::future::{self, Ready};
use std::io;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{Sink, SinkExt, Stream, StreamExt};
use poem::web::websocket::{Message, WebSocket};
use poem::web::{Data, Json, Query};
use poem::{IntoResponse, handler};
use tracing::{debug, info, warn};

use crate::ssh::bridge::reject;
use crate::ssh::error::SessionError;
use crate::ssh::manager::SessionManager;
use crate::ssh::protocol::ClientFrame;
use crate::ssh::types::Credentials;

use super::types::{ConnectRequest, ConnectResponse, HealthResponse, StatusResponse, WsQuery};

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `POST /api/connect`: authenticate and return a session id.
#[handler]
pub(crate) async fn connect(
    Data(manager): Data<&Arc<SessionManager>>,
    Json(request): Json<ConnectRequest>,
) -> Json<ConnectResponse> {
    let credentials = Credentials::from(request);
    let label = credentials.label();

    match manager.create_session(credentials).await {
        Ok(session_id) => Json(ConnectResponse::connected(session_id)),
        Err(e) => {
            info!("Connect request for {} failed: {}", label, e);
            Json(ConnectResponse::failed(e.to_string()))
        }
    }
}

/// `GET /api/ws`: attach a browser terminal to a session.
#[handler]
pub(crate) async fn terminal(
    ws: WebSocket,
    Query(query): Query<WsQuery>,
    Data(manager): Data<&Arc<SessionManager>>,
) -> impl IntoResponse {
    let manager = manager.clone();

    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        let mut sink = sink.with(frame_to_message);

        let Some(session_id) = query.session_id() else {
            reject_missing_session(&mut sink).await;
            return;
        };

        if let Err(e) = manager
            .attach(session_id, sink, client_frames(stream), query.initial_size())
            .await
        {
            debug!("Terminal for session {} ended early: {}", session_id, e);
        }
    })
}

/// `GET /api/status`
#[handler]
pub(crate) async fn status(Data(manager): Data<&Arc<SessionManager>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        connections: manager.status(),
        timestamp: timestamp(),
    })
}

/// `GET /health`
#[handler]
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: timestamp(),
    })
}

/// A terminal socket opened without a session id gets one error and is closed.
async fn reject_missing_session<Tx>(sink: &mut Tx)
where
    Tx: Sink<ClientFrame> + Unpin,
    Tx::Error: std::fmt::Display,
{
    warn!("Terminal connection without session_id");
    reject(sink, SessionError::MissingSessionId).await;
}

/// Client units up to the first close frame.
fn client_frames<S>(messages: S) -> BoxStream<'static, Result<ClientFrame, io::Error>>
where
    S: Stream<Item = Result<Message, io::Error>> + Send + 'static,
{
    messages
        .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))))
        .filter_map(|message| future::ready(message_to_frame(message)))
        .boxed()
}

fn frame_to_message(frame: ClientFrame) -> Ready<Result<Message, io::Error>> {
    future::ready(Ok(match frame {
        ClientFrame::Text(text) => Message::Text(text),
        ClientFrame::Binary(bytes) => Message::Binary(bytes),
    }))
}

/// Control frames (ping/pong) are handled by the WebSocket layer and skipped.
fn message_to_frame(message: Result<Message, io::Error>) -> Option<Result<ClientFrame, io::Error>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(ClientFrame::Text(text))),
        Ok(Message::Binary(bytes)) => Some(Ok(ClientFrame::Binary(bytes))),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    }
}
