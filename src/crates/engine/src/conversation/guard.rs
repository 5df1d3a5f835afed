use crate::conversation::types::{ConversationMessage, ConversationTurn};
use log::debug;

/// Section labels every templated analysis plan must cover.
pub const REQUIRED_PLAN_SECTIONS: [&str; 9] = [
    "Executive Summary",
    "Key Financial Metrics",
    "Revenue Drivers",
    "Profitability",
    "Cash Flow & Liquidity",
    "Guidance & Outlook",
    "Risks & Headwinds",
    "Management Sentiment",
    "Recommendations",
];

/// Heading that marks an assistant text block as the planning block.
pub const PLAN_HEADING: &str = "## Analysis Plan";

/// Hook consulted by the orchestrator after each completed turn.
///
/// Returning a message injects it as a corrective user turn and forces the
/// loop to continue even when the stop rule would otherwise terminate it.
/// Kept out of the core loop so strategies differ by configuration only.
pub trait TurnInterceptor: Send {
    fn after_turn(&mut self, turn: &ConversationTurn) -> Option<ConversationMessage>;
}

/// Nags the model once per missing plan section set.
///
/// Watches for the first assistant turn carrying the designated planning
/// block, scans it for the required section labels and injects one corrective
/// user turn naming exactly the missing ones. Once every section has been
/// seen the guard verifies and never interferes again.
pub struct PlanSectionGuard {
    verified: bool,
}

impl PlanSectionGuard {
    pub fn new() -> Self {
        Self { verified: false }
    }

    fn missing_sections(plan_text: &str) -> Vec<&'static str> {
        REQUIRED_PLAN_SECTIONS
            .iter()
            .copied()
            .filter(|section| !plan_text.contains(section))
            .collect()
    }
}

impl Default for PlanSectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnInterceptor for PlanSectionGuard {
    fn after_turn(&mut self, turn: &ConversationTurn) -> Option<ConversationMessage> {
        if self.verified {
            return None;
        }

        let text = turn.assistant_text();
        if !text.contains(PLAN_HEADING) {
            return None;
        }

        let missing = Self::missing_sections(&text);
        if missing.is_empty() {
            debug!("Plan verified: all required sections present (turn {})", turn.index);
            self.verified = true;
            return None;
        }

        debug!(
            "Plan incomplete: turn={}, missing_sections={:?}",
            turn.index, missing
        );
        Some(ConversationMessage::user_text(format!(
            "Your analysis plan is missing the following required sections: {}. \
             Revise the plan to cover every required section, then continue the analysis.",
            missing.join(", ")
        )))
    }
}
