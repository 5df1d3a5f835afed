use crate::accumulate::AnalysisResult;
use crate::conversation::gateway::{default_tool_catalog, ModelGateway, ToolSpec};
use crate::conversation::guard::TurnInterceptor;
use crate::conversation::strategy::AnalysisStrategy;
use crate::conversation::types::{
    ContentBlock, ConversationMessage, ConversationTurn, Role, StopReason, TurnStats,
};
use crate::normalize;
use crate::util::errors::FinsightError;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Progress events emitted by the turn machinery for streaming consumers.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    Started,
    Text { accumulated: String },
    ToolStarted { tool_use_id: String, tool_name: String },
    ToolCompleted { tool_use_id: String, tool_name: String, is_error: bool },
    Completed { text: String },
    Failed { message: String },
}

/// Terminal state of one orchestrator run.
///
/// Artifacts already accumulated are returned even when the run ends
/// abnormally; only a cancelled run discards them.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub result: AnalysisResult,
    pub error: Option<FinsightError>,
    pub turns: Vec<ConversationTurn>,
}

impl ExecutionOutcome {
    pub fn into_result(self) -> Result<AnalysisResult, FinsightError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

/// Drives the bounded multi-turn tool-calling loop against a model gateway.
///
/// One orchestrator run is a single logical task; its only suspension points
/// are the gateway calls. Strategy variants share this implementation and
/// differ by configuration only.
pub struct TurnOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    catalog: Vec<ToolSpec>,
    interceptor: Option<Box<dyn TurnInterceptor>>,
    events: Option<mpsc::UnboundedSender<TurnEvent>>,
    cancel: CancellationToken,
}

impl TurnOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            catalog: default_tool_catalog(),
            interceptor: None,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<ToolSpec>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_interceptor(mut self, interceptor: Option<Box<dyn TurnInterceptor>>) -> Self {
        self.interceptor = interceptor;
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<TurnEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn execute(
        &mut self,
        strategy: &AnalysisStrategy,
        initial_messages: Vec<ConversationMessage>,
    ) -> ExecutionOutcome {
        let mut messages = initial_messages;
        let mut result = AnalysisResult::new();
        let mut turns: Vec<ConversationTurn> = Vec::new();

        self.emit(TurnEvent::Started);

        for index in 0..strategy.max_turns {
            if self.cancel.is_cancelled() {
                return Self::cancelled(turns);
            }

            let response = tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Self::cancelled(turns);
                }
                response = self
                    .gateway
                    .complete(&strategy.system_prompt, &messages, &self.catalog) =>
                {
                    match response {
                        Ok(response) => response,
                        Err(error) => {
                            warn!("Gateway call failed: turn={}, error={}", index, error);
                            self.emit(TurnEvent::Failed { message: error.to_string() });
                            return ExecutionOutcome { result, error: Some(error), turns };
                        }
                    }
                }
            };

            let assistant = ConversationMessage::assistant(response.content.clone());
            let text = assistant.joined_text();
            messages.push(assistant);
            if !text.is_empty() {
                result.analysis_text = text;
                self.emit(TurnEvent::Text {
                    accumulated: result.analysis_text.clone(),
                });
            }

            // Empty response with a non-tool-use stop reason ends the loop;
            // it is not an error.
            if response.content.is_empty() && response.stop_reason != StopReason::ToolUse {
                debug!(
                    "Empty assistant response: turn={}, stop_reason={:?}, ending loop",
                    index, response.stop_reason
                );
                turns.push(ConversationTurn {
                    index,
                    assistant_blocks: Vec::new(),
                    tool_result_blocks: Vec::new(),
                    stop_reason: response.stop_reason,
                    stats: TurnStats::default(),
                });
                break;
            }

            let tool_uses: Vec<(String, String, serde_json::Value)> = response
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            let mut tool_result_blocks = Vec::new();
            let mut validation_failures = 0;
            for (id, name, input) in &tool_uses {
                self.emit(TurnEvent::ToolStarted {
                    tool_use_id: id.clone(),
                    tool_name: name.clone(),
                });
                let is_error = match normalize::normalize(name, Some(id), input) {
                    Ok(artifact) => {
                        result.accumulate(artifact);
                        tool_result_blocks.push(ContentBlock::tool_result(
                            id,
                            format!("{} output validated and added to the analysis.", name),
                        ));
                        false
                    }
                    Err(error) => {
                        // Never dropped silently: the model gets an explicit
                        // error result to self-correct on the next turn.
                        warn!("Tool payload rejected: turn={}, error={}", index, error);
                        validation_failures += 1;
                        tool_result_blocks
                            .push(ContentBlock::error_tool_result(id, error.to_string()));
                        true
                    }
                };
                self.emit(TurnEvent::ToolCompleted {
                    tool_use_id: id.clone(),
                    tool_name: name.clone(),
                    is_error,
                });
            }

            turns.push(ConversationTurn {
                index,
                assistant_blocks: response.content,
                tool_result_blocks: tool_result_blocks.clone(),
                stop_reason: response.stop_reason,
                stats: TurnStats {
                    tool_uses: tool_uses.len(),
                    validation_failures,
                },
            });

            let correction = match (self.interceptor.as_mut(), turns.last()) {
                (Some(interceptor), Some(turn)) => interceptor.after_turn(turn),
                _ => None,
            };

            let should_stop = response.stop_reason.is_terminal() || tool_uses.is_empty();

            if !tool_result_blocks.is_empty() {
                messages.push(ConversationMessage {
                    role: Role::User,
                    content: tool_result_blocks,
                });
            }
            if let Some(correction) = correction {
                // The guard overrides the stop rule for this turn.
                messages.push(correction);
                continue;
            }
            if should_stop {
                break;
            }
        }

        // Reaching max_turns lands here too: a normal terminal state, the
        // last assistant text is used as-is.
        self.emit(TurnEvent::Completed {
            text: result.analysis_text.clone(),
        });
        ExecutionOutcome {
            result,
            error: None,
            turns,
        }
    }

    fn cancelled(turns: Vec<ConversationTurn>) -> ExecutionOutcome {
        debug!("Run cancelled, discarding accumulated artifacts");
        ExecutionOutcome {
            result: AnalysisResult::new(),
            error: Some(FinsightError::Cancelled),
            turns,
        }
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
