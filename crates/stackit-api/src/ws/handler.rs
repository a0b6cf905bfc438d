//! Notification socket.
//!
//! The client authenticates during the upgrade (`?token=` or the usual auth
//! headers) and is placed in its own room. From then on every notification
//! written for that user is pushed as a `newNotification` event. A text
//! `ping` is answered with `pong`; silence longer than the idle timeout
//! closes the socket.

use crate::middleware::GatewayMetrics;
use crate::service::AppState;
use crate::ws::hub::{NotificationHub, ServerEvent};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

/// `GET /ws`. Authentication is checked before the upgrade is attempted.
pub async fn notification_socket(
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let authenticated = match params.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => state.verifier.verify(token),
        _ => state.verifier.authenticate(&headers),
    };
    let user = match authenticated {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let session = NotificationSession {
        user,
        hub: Arc::clone(&state.hub),
        metrics: Arc::clone(&state.metrics),
        idle_timeout: state.websocket.idle_timeout,
    };
    upgrade.on_upgrade(move |socket| session.run(socket))
}

/// One open socket.
struct NotificationSession {
    user: Uuid,
    hub: Arc<NotificationHub>,
    metrics: Arc<GatewayMetrics>,
    idle_timeout: Duration,
}

impl NotificationSession {
    async fn run(self, mut socket: WebSocket) {
        let mut room = self.hub.join(self.user);
        self.metrics.record_ws_connect();
        info!(user = %self.user, "notification socket opened");

        let idle = tokio::time::sleep(self.idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                () = &mut idle => {
                    info!(user = %self.user, "closing idle notification socket");
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                incoming = socket.recv() => {
                    idle.as_mut().reset(Instant::now() + self.idle_timeout);
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if text.trim() == "ping" {
                                if let Err(e) = socket.send(Message::Text("pong".into())).await {
                                    debug!(error = %e, "failed to send pong");
                                    break;
                                }
                            } else {
                                debug!(user = %self.user, "ignoring client message");
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if socket.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(user = %self.user, error = %e, "notification socket error");
                            break;
                        }
                    }
                }
                event = room.recv() => match event {
                    Ok(notification) => {
                        let event = ServerEvent::new_notification(&notification);
                        let frame = match serde_json::to_string(&event) {
                            Ok(frame) => frame,
                            Err(e) => {
                                error!(error = %e, "failed to encode notification");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                        self.metrics.record_ws_message();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(user = %self.user, skipped, "notification socket lagging");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        drop(room);
        self.hub.leave(self.user);
        self.metrics.record_ws_disconnect();
        info!(user = %self.user, "notification socket closed");
    }
}

