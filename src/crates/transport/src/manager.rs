use crate::arbitrate::ContentArbiter;
use crate::frames::ServerFrame;
use crate::session::{SessionKey, SessionRegistry, SessionState};
use finsight_engine::conversation::{
    AnalysisStrategy, ConversationMessage, ModelGateway, TurnEvent, TurnOrchestrator,
};
use finsight_engine::ExecutionOutcome;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Per-connection streaming driver.
///
/// Sits between the turn machinery's event stream and the client's frame
/// stream: allocates the stable message identity, filters duplicate starts,
/// arbitrates partial vs. finalized content and keeps the session registry
/// in sync with the connection lifecycle.
#[derive(Clone)]
pub struct StreamingSessionManager {
    registry: Arc<SessionRegistry>,
}

impl StreamingSessionManager {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Forward turn events as wire frames until the event stream closes.
    ///
    /// An outbound send failure means the client went away: the run is
    /// cancelled and the session evicted immediately.
    pub async fn pump(
        &self,
        key: SessionKey,
        mut events: mpsc::UnboundedReceiver<TurnEvent>,
        frames: mpsc::UnboundedSender<ServerFrame>,
        cancel: CancellationToken,
    ) {
        self.registry.create(key.clone());
        let mut message_id: Option<String> = None;
        let mut arbiter = ContentArbiter::new();

        while let Some(event) = events.recv().await {
            self.registry.touch(&key);

            let frame = match event {
                TurnEvent::Started => {
                    if message_id.is_some() {
                        // Only the first start wins: the client keeps one
                        // stable message identity per session.
                        debug!("Filtered duplicate start event: {:?}", key);
                        continue;
                    }
                    let id = format!("msg_{}", uuid::Uuid::new_v4());
                    message_id = Some(id.clone());
                    self.registry.set_message_id(&key, &id);
                    self.registry.transition(&key, SessionState::Started);
                    Some(ServerFrame::MessageStart { message_id: id })
                }
                TurnEvent::Text { accumulated } => match &message_id {
                    Some(id) => {
                        self.registry.transition(&key, SessionState::Streaming);
                        arbiter.observe_partial(&accumulated);
                        // In-turn partials go out as deltas; content_update is
                        // reserved for the arbitration-resolved final text.
                        Some(ServerFrame::TextDelta {
                            message_id: id.clone(),
                            accumulated_text: arbiter.current().to_string(),
                        })
                    }
                    None => {
                        warn!("Dropping text event before session start: {:?}", key);
                        None
                    }
                },
                TurnEvent::ToolStarted {
                    tool_use_id,
                    tool_name,
                } => message_id.as_ref().map(|id| ServerFrame::ToolStart {
                    message_id: id.clone(),
                    tool_id: tool_use_id,
                    tool_name,
                }),
                TurnEvent::ToolCompleted {
                    tool_use_id,
                    tool_name,
                    ..
                } => message_id.as_ref().map(|id| ServerFrame::ToolComplete {
                    message_id: id.clone(),
                    tool_id: tool_use_id,
                    tool_name,
                }),
                TurnEvent::Completed { text } => match &message_id {
                    Some(id) => {
                        let chosen = arbiter.resolve(&text).to_string();
                        let update = ServerFrame::ContentUpdate {
                            message_id: id.clone(),
                            accumulated_text: chosen,
                        };
                        if !self.send(&key, &frames, update, &cancel) {
                            return;
                        }
                        self.registry.transition(&key, SessionState::Completed);
                        Some(ServerFrame::MessageComplete {
                            message_id: id.clone(),
                        })
                    }
                    None => {
                        // Terminal event with no message identity: protocol
                        // violation, dropped and never forwarded.
                        warn!(
                            "Protocol violation: complete event without message id, dropping: {:?}",
                            key
                        );
                        None
                    }
                },
                TurnEvent::Failed { message } => {
                    self.registry.transition(&key, SessionState::Errored);
                    Some(ServerFrame::Error {
                        message,
                        message_id: message_id.clone(),
                    })
                }
            };

            if let Some(frame) = frame {
                if !self.send(&key, &frames, frame, &cancel) {
                    return;
                }
            }
        }
    }

    /// Send one frame; on failure treat the client as disconnected.
    fn send(
        &self,
        key: &SessionKey,
        frames: &mpsc::UnboundedSender<ServerFrame>,
        frame: ServerFrame,
        cancel: &CancellationToken,
    ) -> bool {
        if frames.send(frame).is_err() {
            warn!("Client disconnected mid-stream, evicting session: {:?}", key);
            cancel.cancel();
            self.registry.evict(key);
            return false;
        }
        true
    }

    /// Run one streaming-enabled analysis: wires an orchestrator run to the
    /// frame stream and returns the orchestrator's outcome.
    pub async fn stream_analysis(
        &self,
        key: SessionKey,
        gateway: Arc<dyn ModelGateway>,
        strategy: AnalysisStrategy,
        initial_messages: Vec<ConversationMessage>,
        frames: mpsc::UnboundedSender<ServerFrame>,
    ) -> ExecutionOutcome {
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let pump_manager = self.clone();
        let pump_key = key.clone();
        let pump_cancel = cancel.clone();
        let pump = tokio::spawn(async move {
            pump_manager
                .pump(pump_key, events_rx, frames, pump_cancel)
                .await;
        });

        let mut orchestrator = TurnOrchestrator::new(gateway)
            .with_interceptor(strategy.interceptor())
            .with_events(events_tx)
            .with_cancellation(cancel);
        let outcome = orchestrator.execute(&strategy, initial_messages).await;

        // Close the event channel so the pump drains and exits.
        drop(orchestrator);
        if let Err(error) = pump.await {
            warn!("Stream pump task failed: {:?}, error={}", key, error);
        }

        outcome
    }
}
