//! WebSocket handler for the live interview

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use super::ApiState;
use crate::interview::{Delivery, DropReason, HistoryEntry, Phase, Severity};
use crate::transport::EndReason;

/// Incoming WebSocket message from client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsIncoming {
    /// The page is ready; start the interview
    ClientReady,
    /// Typed or transcribed answer
    UserMessage { message: String },
    /// Face count from the browser's detector
    Presence { faces: usize },
    /// Page visibility changed
    Visibility { visible: bool },
    /// The candidate switched tabs
    TabChange,
    /// Ping to keep connection alive
    Ping,
}

/// Outgoing WebSocket message to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    /// Connection established
    ConnectionStatus { status: String },
    /// A line spoken by the interviewer
    AiResponse {
        message: String,
        audio: Option<String>,
        timestamp: DateTime<Utc>,
        interruptible: bool,
    },
    /// Whether an answer is expected right now
    WaitingForResponse {
        waiting: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    InterviewPhase { phase: Phase },
    /// Conduct warning or termination notice
    MonitoringAlert {
        alert: String,
        message: String,
        severity: Severity,
        count: u32,
        max: u32,
    },
    InterviewComplete {
        reason: EndReason,
        message: String,
        questions_asked: usize,
        conversation_history: Vec<HistoryEntry>,
    },
    /// The answer reached a waiting question
    MessageReceived {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Error occurred
    Error { code: String, message: String },
    /// Pong response
    Pong,
}

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(
    State(state): State<Arc<ApiState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4();

    let connected = WsOutgoing::ConnectionStatus {
        status: "connected".to_string(),
    };
    if let Ok(msg) = serde_json::to_string(&connected)
        && sender.send(Message::Text(msg.into())).await.is_err()
    {
        return;
    }

    tracing::info!(%connection_id, clients = state.hub.receiver_count() + 1, "WebSocket connected");

    // Replies to this client only
    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(32);
    // Interview events for everyone
    let mut events = state.hub.subscribe();

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                reply = rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%connection_id, skipped, "client lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            if let Ok(text) = serde_json::to_string(&msg)
                && sender.send(Message::Text(text.into())).await.is_err()
            {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = handle_message(&text, &state, &tx).await {
                        let error = WsOutgoing::Error {
                            code: "invalid_message".to_string(),
                            message: e.to_string(),
                        };
                        let _ = tx.send(error).await;
                    }
                }
                Message::Ping(data) => {
                    tracing::trace!(len = data.len(), "received ping");
                }
                Message::Close(_) => {
                    tracing::info!(%connection_id, "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(%connection_id, "WebSocket disconnected");
}

/// Handle a single incoming message
async fn handle_message(
    text: &str,
    state: &Arc<ApiState>,
    tx: &mpsc::Sender<WsOutgoing>,
) -> crate::Result<()> {
    let incoming: WsIncoming = serde_json::from_str(text)
        .map_err(|e| crate::Error::Transport(format!("invalid message: {e}")))?;

    let reply = match incoming {
        WsIncoming::Ping => Some(WsOutgoing::Pong),
        WsIncoming::ClientReady => start_interview(state).await,
        WsIncoming::UserMessage { message } => Some(user_message(state, &message)),
        WsIncoming::Presence { faces } => {
            state.presence.report(faces);
            None
        }
        WsIncoming::Visibility { visible } => {
            state.focus.report(visible);
            None
        }
        WsIncoming::TabChange => {
            tracing::debug!("client reported a tab change");
            state.focus.report(false);
            None
        }
    };

    if let Some(reply) = reply {
        tx.send(reply)
            .await
            .map_err(|_| crate::Error::Transport("channel closed".to_string()))?;
    }
    Ok(())
}

/// `client_ready`: initialize if needed and start
async fn start_interview(state: &Arc<ApiState>) -> Option<WsOutgoing> {
    let controller = Arc::clone(&state.controller);
    let started = tokio::task::spawn_blocking(move || {
        if !controller.is_initialized() {
            controller.initialize();
        }
        controller.start()
    })
    .await;

    match started {
        Ok(Ok(())) => {
            tracing::info!("interview started by client");
            None
        }
        Ok(Err(crate::Error::AlreadyActive)) => {
            tracing::debug!("client_ready while an interview is running");
            None
        }
        Ok(Err(e)) => Some(WsOutgoing::Error {
            code: "start_failed".to_string(),
            message: e.to_string(),
        }),
        Err(e) => Some(WsOutgoing::Error {
            code: "internal_error".to_string(),
            message: e.to_string(),
        }),
    }
}

fn user_message(state: &ApiState, message: &str) -> WsOutgoing {
    match state.controller.submit_answer(message) {
        Ok(Delivery::Delivered) => WsOutgoing::MessageReceived {
            message: "Response received and processed".to_string(),
            timestamp: Utc::now(),
        },
        Ok(Delivery::Dropped(DropReason::Empty)) => WsOutgoing::Error {
            code: "empty_message".to_string(),
            message: "Empty message received".to_string(),
        },
        Ok(Delivery::Dropped(DropReason::NotAwaiting)) => WsOutgoing::Error {
            code: "not_waiting".to_string(),
            message: "No question is waiting for an answer".to_string(),
        },
        Err(e) => WsOutgoing::Error {
            code: "not_initialized".to_string(),
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_response_serializes() {
        let msg = WsOutgoing::AiResponse {
            message: "Hello".to_string(),
            audio: None,
            timestamp: Utc::now(),
            interruptible: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"ai_response\""));
        assert!(json.contains("\"interruptible\":true"));
    }

    #[test]
    fn waiting_omits_missing_timeout() {
        let msg = WsOutgoing::WaitingForResponse {
            waiting: false,
            timeout: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"waiting_for_response","waiting":false}"#);
    }

    #[test]
    fn phase_serializes_snake_case() {
        let msg = WsOutgoing::InterviewPhase {
            phase: Phase::Questions,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"phase\":\"questions\""));
    }

    #[test]
    fn incoming_messages_deserialize() {
        let msg: WsIncoming =
            serde_json::from_str(r#"{"type":"user_message","message":"hi"}"#).unwrap();
        assert!(matches!(msg, WsIncoming::UserMessage { ref message } if message == "hi"));

        let msg: WsIncoming = serde_json::from_str(r#"{"type":"presence","faces":2}"#).unwrap();
        assert!(matches!(msg, WsIncoming::Presence { faces: 2 }));

        let msg: WsIncoming = serde_json::from_str(r#"{"type":"client_ready"}"#).unwrap();
        assert!(matches!(msg, WsIncoming::ClientReady));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<WsIncoming>(r#"{"type":"video_frame"}"#).is_err());
    }
}
