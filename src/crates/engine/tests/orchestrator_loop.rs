use async_trait::async_trait;
use finsight_engine::conversation::{
    AnalysisStrategy, ContentBlock, ConversationMessage, ModelGateway, ModelResponse, StopReason,
    ToolSpec, TurnOrchestrator, PLAN_HEADING, REQUIRED_PLAN_SECTIONS,
};
use finsight_engine::{FinsightError, FinsightResult};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Gateway stub that replays a fixed script of responses and records every
/// message log it is called with.
struct ScriptedGateway {
    script: Mutex<VecDeque<FinsightResult<ModelResponse>>>,
    calls: AtomicUsize,
    seen_messages: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl ScriptedGateway {
    fn new(script: Vec<FinsightResult<ModelResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
            seen_messages: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[ConversationMessage],
        _tools: &[ToolSpec],
    ) -> FinsightResult<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_messages.lock().unwrap().push(messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ModelResponse {
                    content: vec![ContentBlock::text("done")],
                    stop_reason: StopReason::EndTurn,
                })
            })
    }
}

/// Gateway stub that always asks for another tool call.
struct AlwaysToolUse {
    calls: AtomicUsize,
}

#[async_trait]
impl ModelGateway for AlwaysToolUse {
    async fn complete(
        &self,
        _system_prompt: &str,
        _messages: &[ConversationMessage],
        _tools: &[ToolSpec],
    ) -> FinsightResult<ModelResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ModelResponse {
            content: vec![
                ContentBlock::text(format!("working, turn {}", call)),
                ContentBlock::ToolUse {
                    id: format!("toolu_{}", call),
                    name: "generate_metrics".to_string(),
                    input: json!({
                        "category": "growth",
                        "name": "Revenue YoY",
                        "period": "FY2024",
                        "value": 18,
                        "unit": "%"
                    }),
                },
            ],
            stop_reason: StopReason::ToolUse,
        })
    }
}

fn metric_tool_use(id: &str) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: "generate_metrics".to_string(),
        input: json!({
            "category": "growth",
            "name": "Revenue YoY",
            "period": "FY2024",
            "value": 18,
            "unit": "%"
        }),
    }
}

#[tokio::test]
async fn always_tool_use_runs_exactly_max_turns() {
    let gateway = Arc::new(AlwaysToolUse {
        calls: AtomicUsize::new(0),
    });
    let strategy = AnalysisStrategy::basic();
    let mut orchestrator = TurnOrchestrator::new(gateway.clone());

    let outcome = orchestrator
        .execute(&strategy, vec![ConversationMessage::user_text("analyze")])
        .await;

    assert_eq!(gateway.calls.load(Ordering::SeqCst), strategy.max_turns);
    let result = outcome.into_result().expect("max turns is not an error");
    // Last assistant text preserved as-is.
    assert_eq!(result.analysis_text, format!("working, turn {}", strategy.max_turns));
    // One metric per turn, appended without de-duplication.
    assert_eq!(result.metrics.len(), strategy.max_turns);
}

#[tokio::test]
async fn terminal_stop_reason_ends_after_one_call() {
    let gateway = ScriptedGateway::new(vec![Ok(ModelResponse {
        content: vec![ContentBlock::text("short answer")],
        stop_reason: StopReason::EndTurn,
    })]);
    let mut orchestrator = TurnOrchestrator::new(gateway.clone());

    let outcome = orchestrator
        .execute(
            &AnalysisStrategy::comprehensive(),
            vec![ConversationMessage::user_text("analyze")],
        )
        .await;

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.into_result().unwrap().analysis_text, "short answer");
}

#[tokio::test]
async fn empty_response_with_non_tool_use_stop_is_loop_end_not_error() {
    let gateway = ScriptedGateway::new(vec![Ok(ModelResponse {
        content: vec![],
        stop_reason: StopReason::MaxTokens,
    })]);
    let mut orchestrator = TurnOrchestrator::new(gateway.clone());

    let outcome = orchestrator
        .execute(
            &AnalysisStrategy::basic(),
            vec![ConversationMessage::user_text("analyze")],
        )
        .await;

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.turns.len(), 1);
    assert!(outcome.into_result().is_ok());
}

#[tokio::test]
async fn invalid_tool_payload_becomes_error_tool_result_for_next_turn() {
    let gateway = ScriptedGateway::new(vec![
        Ok(ModelResponse {
            content: vec![ContentBlock::ToolUse {
                id: "toolu_bad".to_string(),
                name: "generate_graph_data".to_string(),
                // Missing chartType/chartConfig entirely.
                input: json!({"config": {"title": "Broken"}, "data": []}),
            }],
            stop_reason: StopReason::ToolUse,
        }),
        Ok(ModelResponse {
            content: vec![ContentBlock::text("recovered")],
            stop_reason: StopReason::EndTurn,
        }),
    ]);
    let mut orchestrator = TurnOrchestrator::new(gateway.clone());

    let outcome = orchestrator
        .execute(
            &AnalysisStrategy::basic(),
            vec![ConversationMessage::user_text("analyze")],
        )
        .await;

    // The second gateway call must have seen an explicit error tool result.
    let seen = gateway.seen_messages.lock().unwrap();
    let second_call_log = &seen[1];
    let last_message = second_call_log.last().unwrap();
    match &last_message.content[0] {
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            assert_eq!(tool_use_id, "toolu_bad");
            assert!(*is_error);
            assert!(content.contains("chartType"));
        }
        other => panic!("expected error tool result, got {:?}", other),
    }

    let result = outcome.into_result().unwrap();
    assert!(result.charts.is_empty());
    assert_eq!(result.analysis_text, "recovered");
}

#[tokio::test]
async fn plan_guard_injects_correction_and_forces_continuation() {
    let incomplete_plan = format!("{}\n- Executive Summary\n- Recommendations\n", PLAN_HEADING);
    let complete_plan = {
        let mut plan = format!("{}\n", PLAN_HEADING);
        for section in REQUIRED_PLAN_SECTIONS {
            plan.push_str(&format!("- {}\n", section));
        }
        plan
    };

    let gateway = ScriptedGateway::new(vec![
        // Would terminate here without the guard (no tool use, end_turn).
        Ok(ModelResponse {
            content: vec![ContentBlock::text(&incomplete_plan)],
            stop_reason: StopReason::EndTurn,
        }),
        Ok(ModelResponse {
            content: vec![ContentBlock::text(&complete_plan)],
            stop_reason: StopReason::EndTurn,
        }),
    ]);

    let strategy = AnalysisStrategy::template();
    let mut orchestrator =
        TurnOrchestrator::new(gateway.clone()).with_interceptor(strategy.interceptor());

    let outcome = orchestrator
        .execute(&strategy, vec![ConversationMessage::user_text("analyze")])
        .await;

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);

    // The corrective user turn names the missing sections.
    let seen = gateway.seen_messages.lock().unwrap();
    let correction = seen[1].last().unwrap().joined_text();
    assert!(correction.contains("missing the following required sections"));
    assert!(correction.contains("Management Sentiment"));
    assert!(!correction.contains("Executive Summary,"));

    assert!(outcome.into_result().is_ok());
}

#[tokio::test]
async fn transport_error_aborts_but_keeps_accumulated_artifacts() {
    let gateway = ScriptedGateway::new(vec![
        Ok(ModelResponse {
            content: vec![metric_tool_use("toolu_1")],
            stop_reason: StopReason::ToolUse,
        }),
        Err(FinsightError::Transport("connection reset".to_string())),
    ]);
    let mut orchestrator = TurnOrchestrator::new(gateway);

    let outcome = orchestrator
        .execute(
            &AnalysisStrategy::basic(),
            vec![ConversationMessage::user_text("analyze")],
        )
        .await;

    assert!(matches!(outcome.error, Some(FinsightError::Transport(_))));
    assert_eq!(outcome.result.metrics.len(), 1);
}

#[tokio::test]
async fn cancelled_run_discards_artifacts() {
    let gateway = Arc::new(AlwaysToolUse {
        calls: AtomicUsize::new(0),
    });
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut orchestrator = TurnOrchestrator::new(gateway).with_cancellation(cancel);

    let outcome = orchestrator
        .execute(
            &AnalysisStrategy::basic(),
            vec![ConversationMessage::user_text("analyze")],
        )
        .await;

    assert!(matches!(outcome.error, Some(FinsightError::Cancelled)));
    assert_eq!(outcome.result.artifact_count(), 0);
}

#[tokio::test]
async fn bar_chart_tool_call_normalizes_end_to_end() {
    let gateway = ScriptedGateway::new(vec![
        Ok(ModelResponse {
            content: vec![
                ContentBlock::text("Revenue grew year over year."),
                ContentBlock::ToolUse {
                    id: "toolu_chart".to_string(),
                    name: "generate_graph_data".to_string(),
                    input: json!({
                        "chartType": "bar",
                        "config": {"title": "Revenue", "xAxisKey": "year"},
                        "data": [
                            {"year": "2022", "revenue": 100},
                            {"year": "2023", "revenue": 120}
                        ],
                        "chartConfig": {"revenue": {"label": "Revenue"}}
                    }),
                },
            ],
            stop_reason: StopReason::ToolUse,
        }),
        Ok(ModelResponse {
            content: vec![ContentBlock::text("Analysis complete.")],
            stop_reason: StopReason::EndTurn,
        }),
    ]);
    let mut orchestrator = TurnOrchestrator::new(gateway);

    let result = orchestrator
        .execute(
            &AnalysisStrategy::basic(),
            vec![ConversationMessage::user_text("chart revenue")],
        )
        .await
        .into_result()
        .unwrap();

    assert_eq!(result.charts.len(), 1);
    let chart = &result.charts[0];
    assert_eq!(chart.config.description, "Revenue");
    assert_eq!(
        serde_json::to_value(&chart.data).unwrap(),
        json!([{"x": "2022", "y": 100.0}, {"x": "2023", "y": 120.0}])
    );
}
