use crate::conversation::guard::{PlanSectionGuard, TurnInterceptor, PLAN_HEADING, REQUIRED_PLAN_SECTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Template,
    Comprehensive,
    Basic,
    Sentiment,
}

/// One analysis strategy. Strategies differ only by configuration: system
/// prompt text, turn budget and whether the planning guard is installed.
#[derive(Debug, Clone)]
pub struct AnalysisStrategy {
    pub kind: StrategyKind,
    pub system_prompt: String,
    pub max_turns: usize,
}

impl AnalysisStrategy {
    pub fn template() -> Self {
        Self {
            kind: StrategyKind::Template,
            system_prompt: build_template_prompt(),
            max_turns: 5,
        }
    }

    pub fn comprehensive() -> Self {
        Self {
            kind: StrategyKind::Comprehensive,
            system_prompt: format!(
                "{}\n\nCover every material topic in the source documents, not just headline \
                 figures. Produce at least one chart or table per major topic, and close with \
                 a synthesized narrative that ties the visualizations together.",
                BASE_ANALYST_PROMPT
            ),
            max_turns: 7,
        }
    }

    pub fn basic() -> Self {
        Self {
            kind: StrategyKind::Basic,
            system_prompt: BASE_ANALYST_PROMPT.to_string(),
            max_turns: 9,
        }
    }

    pub fn sentiment() -> Self {
        Self {
            kind: StrategyKind::Sentiment,
            system_prompt: format!(
                "{}\n\nFocus on tone and sentiment: management confidence, hedging language, \
                 analyst pushback and quarter-over-quarter shifts in wording. Quantify \
                 sentiment where possible via generate_metrics, and chart sentiment trends \
                 over time.",
                BASE_ANALYST_PROMPT
            ),
            max_turns: 5,
        }
    }

    /// Lookup by the wire name clients send in `options.strategy`.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "template" => Some(Self::template()),
            "comprehensive" => Some(Self::comprehensive()),
            "basic" => Some(Self::basic()),
            "sentiment" => Some(Self::sentiment()),
            _ => None,
        }
    }

    /// Interceptor installed for this strategy, if any. Only the template
    /// strategy carries the plan-section guard.
    pub fn interceptor(&self) -> Option<Box<dyn TurnInterceptor>> {
        match self.kind {
            StrategyKind::Template => Some(Box::new(PlanSectionGuard::new())),
            _ => None,
        }
    }
}

const BASE_ANALYST_PROMPT: &str = "You are a financial analysis assistant. You are given \
extracted document text and must answer with a grounded written analysis. Whenever the data \
supports it, call generate_graph_data, generate_table_data or generate_metrics to emit \
structured visualizations instead of describing numbers inline. Every figure you cite must \
come from the provided documents.";

fn build_template_prompt() -> String {
    let sections = REQUIRED_PLAN_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{base}\n\nBefore any analysis, open your first response with a `{heading}` section \
         listing how you will cover each of these required sections:\n{sections}\n\nThen work \
         through the plan section by section, emitting charts, tables and metrics as you go.",
        base = BASE_ANALYST_PROMPT,
        heading = PLAN_HEADING,
        sections = sections
    )
}
