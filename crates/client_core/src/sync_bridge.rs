//! Push-channel subscription feeding unit snapshots to the dashboard.
//!
//! The bridge owns one background task holding the websocket. It is released
//! exactly once: either through [`SyncBridge::close`] or, failing that, when
//! the bridge is dropped.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use shared::{
    domain::Unit,
    protocol::{PushEvent, PushFrame, SOCKET_IO_PATH},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Connected,
    Disconnected { reason: String },
    UnitUpdated(Unit),
}

pub fn websocket_url(push_url: &str) -> Result<String, ClientError> {
    let base = push_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ClientError::InvalidPushUrl(push_url.to_string()));
    };
    Ok(format!("{ws_base}{SOCKET_IO_PATH}"))
}

pub struct SyncBridge {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncBridge {
    /// Starts the subscription task. Connection failures are not errors here;
    /// they surface as [`BridgeEvent::Disconnected`] and are retried after
    /// `reconnect_delay`.
    pub fn open(
        push_url: &str,
        reconnect_delay: Duration,
        events: mpsc::UnboundedSender<BridgeEvent>,
    ) -> Result<Self, ClientError> {
        let ws_url = websocket_url(push_url)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_bridge(ws_url, reconnect_delay, events, shutdown_rx));
        Ok(Self {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Leaves the namespace, closes the socket and waits for the task.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "push channel task ended abnormally");
            }
        }
    }
}

impl Drop for SyncBridge {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// What the session loop does with one decoded text frame.
#[derive(Debug, PartialEq)]
enum FrameAction {
    Ignore,
    Reply(PushFrame),
    Connected,
    Unit(Unit),
    End(String),
}

fn interpret_frame(text: &str) -> FrameAction {
    let frame = match PushFrame::decode(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "ignoring undecodable push frame");
            return FrameAction::Ignore;
        }
    };
    match frame {
        PushFrame::EngineOpen(handshake) => {
            debug!(sid = %handshake.sid, "engine handshake received");
            FrameAction::Reply(PushFrame::Connect)
        }
        PushFrame::Ping => FrameAction::Reply(PushFrame::Pong),
        PushFrame::Connect => FrameAction::Connected,
        PushFrame::Event { name, args } => match PushEvent::from_event(name, args) {
            Ok(PushEvent::UnitUpdated(unit)) => FrameAction::Unit(unit),
            Ok(PushEvent::Unhandled { name }) => {
                debug!(event = %name, "ignoring unhandled push event");
                FrameAction::Ignore
            }
            Err(err) => {
                warn!(error = %err, "ignoring malformed push event");
                FrameAction::Ignore
            }
        },
        PushFrame::Disconnect | PushFrame::EngineClose => {
            FrameAction::End("push server closed the session".to_string())
        }
        PushFrame::ConnectError(payload) => {
            FrameAction::End(format!("push server rejected the connection: {payload}"))
        }
        PushFrame::Pong | PushFrame::Noop => FrameAction::Ignore,
    }
}

async fn run_bridge(
    ws_url: String,
    reconnect_delay: Duration,
    events: mpsc::UnboundedSender<BridgeEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut reported_connected: Option<bool> = None;
    loop {
        match run_session(&ws_url, &events, &mut shutdown, &mut reported_connected).await {
            SessionEnd::Shutdown => {
                info!(%ws_url, "push channel released");
                return;
            }
            SessionEnd::Lost(reason) => {
                warn!(%ws_url, %reason, "push channel unavailable");
                if reported_connected != Some(false) {
                    reported_connected = Some(false);
                    if events.send(BridgeEvent::Disconnected { reason }).is_err() {
                        return;
                    }
                }
            }
        }

        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

async fn run_session(
    ws_url: &str,
    events: &mpsc::UnboundedSender<BridgeEvent>,
    shutdown: &mut oneshot::Receiver<()>,
    reported_connected: &mut Option<bool>,
) -> SessionEnd {
    let connected = tokio::select! {
        _ = &mut *shutdown => return SessionEnd::Shutdown,
        result = connect_async(ws_url) => result,
    };
    let (ws_stream, _) = match connected {
        Ok(stream) => stream,
        Err(err) => return SessionEnd::Lost(format!("failed to connect websocket: {err}")),
    };
    let (mut writer, mut reader) = ws_stream.split();

    loop {
        let message = tokio::select! {
            _ = &mut *shutdown => {
                let _ = writer.send(Message::Text(PushFrame::Disconnect.encode())).await;
                let _ = writer.close().await;
                return SessionEnd::Shutdown;
            }
            message = reader.next() => message,
        };

        let text = match message {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                return SessionEnd::Lost("websocket closed".to_string())
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => return SessionEnd::Lost(format!("websocket receive failed: {err}")),
        };

        match interpret_frame(&text) {
            FrameAction::Ignore => {}
            FrameAction::Reply(frame) => {
                if let Err(err) = writer.send(Message::Text(frame.encode())).await {
                    return SessionEnd::Lost(format!("websocket send failed: {err}"));
                }
            }
            FrameAction::Connected => {
                if *reported_connected != Some(true) {
                    *reported_connected = Some(true);
                    info!(%ws_url, "push channel connected");
                    if events.send(BridgeEvent::Connected).is_err() {
                        return SessionEnd::Shutdown;
                    }
                }
            }
            FrameAction::Unit(unit) => {
                debug!(unit_number = %unit.unit_number, "unit update received");
                if events.send(BridgeEvent::UnitUpdated(unit)).is_err() {
                    return SessionEnd::Shutdown;
                }
            }
            FrameAction::End(reason) => return SessionEnd::Lost(reason),
        }
    }
}

#[cfg(test)]
#[path = "tests/sync_bridge_tests.rs"]
mod tests;
