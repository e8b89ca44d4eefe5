//! HTTP surface: connect API, terminal WebSocket, status and health.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/connect` | Authenticate, returns `{success, session_id?, message?}` |
//! | `GET` | `/api/ws?session_id=&cols=&rows=` | Terminal WebSocket |
//! | `GET` | `/api/status` | `{connections, timestamp}` |
//! | `GET` | `/health` | `{status, version, timestamp}` |

mod handlers;
pub mod types;

use std::sync::Arc;

use poem::middleware::{SetHeader, Tracing};
use poem::{Endpoint, EndpointExt, Route, get, post};

use crate::ssh::manager::SessionManager;

/// Headers attached to every response.
fn security_headers() -> SetHeader {
    SetHeader::new()
        .overriding("X-Content-Type-Options", "nosniff")
        .overriding("X-Frame-Options", "DENY")
        .overriding("Referrer-Policy", "strict-origin-when-cross-origin")
}

/// Build the application endpoint around a shared session manager.
pub fn routes(manager: Arc<SessionManager>) -> impl Endpoint {
    let api = Route::new()
        .at("/connect", post(handlers::connect))
        .at("/ws", get(handlers::terminal))
        .at("/status", get(handlers::status));

    Route::new()
        .nest("/api", api)
        .at("/health", get(handlers::health))
        .with(security_headers())
        .with(Tracing)
        .data(manager)
}
