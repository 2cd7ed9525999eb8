//! Fan-out of interview events to every connected WebSocket client

use tokio::sync::broadcast;

use super::websocket::WsOutgoing;
use crate::Result;
use crate::transport::{InterviewEvent, Transport};

/// Buffered events per client before it starts lagging
const HUB_CAPACITY: usize = 64;

/// Broadcast transport backing the WebSocket endpoint
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<WsOutgoing>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    /// Receive every event published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WsOutgoing> {
        self.tx.subscribe()
    }

    /// Number of connected clients
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish a message to every client
    pub fn publish(&self, message: WsOutgoing) {
        if self.tx.send(message).is_err() {
            tracing::trace!("no clients connected, event dropped");
        }
    }
}

impl From<InterviewEvent> for WsOutgoing {
    fn from(event: InterviewEvent) -> Self {
        match event {
            InterviewEvent::Phase(phase) => Self::InterviewPhase { phase },
            InterviewEvent::Message(message) => Self::AiResponse {
                message: message.text,
                audio: message.audio,
                timestamp: message.timestamp,
                interruptible: message.interruptible,
            },
            InterviewEvent::Waiting { waiting, timeout } => Self::WaitingForResponse {
                waiting,
                timeout: timeout.map(|t| t.as_secs()),
            },
            InterviewEvent::Warning(notice) => Self::MonitoringAlert {
                alert: notice.kind,
                message: notice.message,
                severity: notice.severity,
                count: notice.count,
                max: notice.max,
            },
            InterviewEvent::Complete(summary) => Self::InterviewComplete {
                reason: summary.reason,
                message: summary.message,
                questions_asked: summary.questions_asked,
                conversation_history: summary.conversation_history,
            },
        }
    }
}

impl Transport for EventHub {
    fn send(&self, event: InterviewEvent) -> Result<()> {
        self.publish(event.into());
        Ok(())
    }
}
