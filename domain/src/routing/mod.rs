//! Routing: decide which handler owns a classified message.
//!
//! [`route`] is a pure, total decision table. Every [`QueryClassification`]
//! maps to exactly one [`RouteTarget`].

use crate::classification::{Complexity, QueryCategory, QueryClassification, QueryType};
use serde::{Deserialize, Serialize};

/// Handler selected for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    /// Single LLM call, no planning
    SimpleResponder,
    /// Human approval required before anything runs
    HitlGate,
    /// Planner + executor + aggregator
    Orchestrator,
    /// Multi-source research route
    ResearchPipeline,
}

impl RouteTarget {
    pub fn as_str(&self) -> &str {
        match self {
            RouteTarget::SimpleResponder => "simple_responder",
            RouteTarget::HitlGate => "hitl_gate",
            RouteTarget::Orchestrator => "orchestrator",
            RouteTarget::ResearchPipeline => "research_pipeline",
        }
    }

    /// Whether this target runs the planner
    pub fn uses_planner(&self) -> bool {
        matches!(
            self,
            RouteTarget::Orchestrator | RouteTarget::ResearchPipeline
        )
    }
}

impl std::fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Route a classification. Rules are evaluated top to bottom.
///
/// The research rule sits before the generic worker-domain rule; placed
/// after it, it could never fire.
pub fn route(classification: &QueryClassification) -> RouteTarget {
    let QueryClassification {
        query_type,
        category,
        complexity,
        requires_human_approval,
        ..
    } = classification;

    if *query_type == QueryType::ToolConfirmation || *requires_human_approval {
        return RouteTarget::HitlGate;
    }

    if *complexity == Complexity::High {
        return RouteTarget::Orchestrator;
    }

    if *query_type == QueryType::Simple && *category == QueryCategory::General {
        return RouteTarget::SimpleResponder;
    }

    if *category == QueryCategory::Research && *complexity >= Complexity::Medium {
        return RouteTarget::ResearchPipeline;
    }

    if category.is_worker_domain() {
        return RouteTarget::Orchestrator;
    }

    RouteTarget::SimpleResponder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(
        query_type: QueryType,
        category: QueryCategory,
        complexity: Complexity,
    ) -> QueryClassification {
        QueryClassification::new(query_type, category, complexity)
    }

    #[test]
    fn test_route_is_total() {
        let targets = [
            RouteTarget::SimpleResponder,
            RouteTarget::HitlGate,
            RouteTarget::Orchestrator,
            RouteTarget::ResearchPipeline,
        ];
        for query_type in QueryType::all() {
            for category in QueryCategory::all() {
                for complexity in Complexity::all() {
                    for approval in [false, true] {
                        let c = classification(query_type, category, complexity)
                            .with_approval(approval);
                        assert!(targets.contains(&route(&c)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_confirmation_goes_to_gate() {
        let c = classification(
            QueryType::ToolConfirmation,
            QueryCategory::General,
            Complexity::Low,
        );
        assert_eq!(route(&c), RouteTarget::HitlGate);
    }

    #[test]
    fn test_approval_beats_high_complexity() {
        let c = classification(QueryType::Complex, QueryCategory::Code, Complexity::High)
            .with_approval(true);
        assert_eq!(route(&c), RouteTarget::HitlGate);
    }

    #[test]
    fn test_high_complexity_goes_to_orchestrator() {
        for category in QueryCategory::all() {
            let c = classification(QueryType::Complex, category, Complexity::High);
            assert_eq!(route(&c), RouteTarget::Orchestrator, "{category}");
        }
    }

    #[test]
    fn test_simple_general_goes_to_responder() {
        let c = classification(QueryType::Simple, QueryCategory::General, Complexity::Low);
        assert_eq!(route(&c), RouteTarget::SimpleResponder);
    }

    #[test]
    fn test_medium_research_goes_to_research_pipeline() {
        let c = classification(QueryType::Complex, QueryCategory::Research, Complexity::Medium);
        assert_eq!(route(&c), RouteTarget::ResearchPipeline);
        assert!(route(&c).uses_planner());
    }

    #[test]
    fn test_low_research_goes_to_orchestrator() {
        let c = classification(QueryType::Simple, QueryCategory::Research, Complexity::Low);
        assert_eq!(route(&c), RouteTarget::Orchestrator);
    }

    #[test]
    fn test_code_and_github_go_to_orchestrator() {
        for category in [QueryCategory::Code, QueryCategory::Github] {
            let c = classification(QueryType::Complex, category, Complexity::Medium);
            assert_eq!(route(&c), RouteTarget::Orchestrator);
        }
    }

    #[test]
    fn test_default_is_simple_responder() {
        let c = classification(QueryType::Complex, QueryCategory::General, Complexity::Medium);
        assert_eq!(route(&c), RouteTarget::SimpleResponder);
        let c = classification(QueryType::Simple, QueryCategory::Admin, Complexity::Low);
        assert_eq!(route(&c), RouteTarget::SimpleResponder);
    }
}
