//! Evaluator-optimizer: draft an investment plan, grade its risk, redraft until the
//! grade matches the investor's target or the iteration budget runs out.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::error::AgentError;
use crate::graph::{FnNode, Next, RunConfig, StateGraph, END, START};
use crate::llm::{LlmClient, StructuredOutput};
use crate::message::Message;

use super::{ask, build, covering};

pub const DEFAULT_TARGET_GRADE: &str = "high";
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
/// Risk grades the evaluator may assign.
pub const GRADES: [&str; 3] = ["low", "medium", "high"];

#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentState {
    pub investor_profile: String,
    pub investment_plan: String,
    pub target_grade: String,
    pub grade: String,
    pub feedback: String,
    /// Plans drafted so far.
    pub n: u32,
    pub max_iterations: u32,
}

impl Default for InvestmentState {
    fn default() -> Self {
        Self {
            investor_profile: String::new(),
            investment_plan: String::new(),
            target_grade: DEFAULT_TARGET_GRADE.to_string(),
            grade: String::new(),
            feedback: String::new(),
            n: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Evaluation {
    pub grade: String,
    pub feedback: String,
}

impl Evaluation {
    pub fn output() -> StructuredOutput<Evaluation> {
        StructuredOutput::schema(
            "Evaluation",
            "Risk grade of an investment plan with feedback",
            json!({
                "type": "object",
                "properties": {
                    "grade": { "type": "string", "enum": GRADES },
                    "feedback": {
                        "type": "string",
                        "description": "How the plan should change to reach the target risk"
                    }
                },
                "required": ["grade", "feedback"]
            }),
        )
    }
}

pub struct InvestmentPlanner {
    llm: Arc<dyn LlmClient>,
    structured_llm: Arc<dyn LlmClient>,
    target_grade: String,
    max_iterations: u32,
    config: RunConfig,
}

impl InvestmentPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            structured_llm: llm.clone(),
            llm,
            target_grade: DEFAULT_TARGET_GRADE.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            config: RunConfig::default().with_run_name("investment_planner"),
        }
    }

    /// Client used by the evaluator step; typically bound with [`Evaluation::output`].
    pub fn with_structured_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.structured_llm = llm;
        self
    }

    /// Target risk grade; one of [`GRADES`].
    pub fn with_target_grade(mut self, grade: impl Into<String>) -> Result<Self, AgentError> {
        let grade = grade.into().to_lowercase();
        if !GRADES.contains(&grade.as_str()) {
            return Err(AgentError::ExecutionFailed(format!(
                "target grade must be one of {:?}, got '{}'",
                GRADES, grade
            )));
        }
        self.target_grade = grade;
        Ok(self)
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Timeout and run name for the graph. The recursion limit is raised to fit
    /// `max_iterations` when it is lower.
    pub fn with_run_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn invoke(&self, investor_profile: &str) -> Result<InvestmentState, AgentError> {
        let mut graph = StateGraph::<InvestmentState>::new();

        let drafter = self.llm.clone();
        graph.add_node(
            "generate_plan",
            Arc::new(FnNode::new("generate_plan", move |mut s: InvestmentState| {
                let llm = drafter.clone();
                async move {
                    let mut prompt = format!(
                        "Draft a personal investment plan with a {} risk profile for this \
                         investor:\n\n{}",
                        s.target_grade, s.investor_profile
                    );
                    if !s.feedback.is_empty() {
                        prompt.push_str(&format!(
                            "\n\nThe previous plan was graded '{}'. Reviewer feedback:\n{}",
                            s.grade, s.feedback
                        ));
                    }
                    s.investment_plan = ask(llm.as_ref(), prompt).await?;
                    s.n += 1;
                    Ok((s, Next::Continue))
                }
            })),
        );

        let evaluator = self.structured_llm.clone();
        graph.add_node(
            "evaluate",
            Arc::new(FnNode::new("evaluate", move |mut s: InvestmentState| {
                let llm = evaluator.clone();
                async move {
                    let messages = [
                        Message::system(format!(
                            "You assess the risk of investment plans. Grade the plan as low, \
                             medium or high risk. The investor wants {} risk; explain what \
                             should change if the plan misses it.",
                            s.target_grade
                        )),
                        Message::user(s.investment_plan.clone()),
                    ];
                    let evaluation = Evaluation::output().invoke(llm.as_ref(), &messages).await?;
                    tracing::debug!(n = s.n, grade = %evaluation.grade, "plan evaluated");
                    s.grade = evaluation.grade.to_lowercase();
                    s.feedback = evaluation.feedback;
                    Ok((s, Next::Continue))
                }
            })),
        );

        let path_map: HashMap<String, String> = [
            ("generate_plan".to_string(), "generate_plan".to_string()),
            (END.to_string(), END.to_string()),
        ]
        .into_iter()
        .collect();
        graph
            .add_edge(START, "generate_plan")
            .add_edge("generate_plan", "evaluate")
            .add_conditional_edges("evaluate", Arc::new(route_plan), Some(path_map));

        let state = InvestmentState {
            investor_profile: investor_profile.to_string(),
            target_grade: self.target_grade.clone(),
            max_iterations: self.max_iterations,
            ..InvestmentState::default()
        };
        // generate_plan and evaluate per draft
        let supersteps = 2 * (self.max_iterations.max(1) as usize);
        build(graph)?
            .invoke(state, Some(covering(&self.config, supersteps)))
            .await
    }
}

fn route_plan(s: &InvestmentState) -> String {
    if s.grade == s.target_grade || s.n >= s.max_iterations {
        END.to_string()
    } else {
        "generate_plan".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmResponse;
    use crate::llm::MockLlm;
    use crate::state::ToolCall;

    fn graded(grade: &str) -> LlmResponse {
        LlmResponse::with_tool_calls(
            "",
            vec![ToolCall::new(
                "Evaluation",
                json!({"grade": grade, "feedback": "take more equity exposure"}).to_string(),
            )],
        )
    }

    /// **Scenario**: Plan misses the target once, the feedback reaches the second draft.
    #[tokio::test]
    async fn redrafts_until_target_grade() {
        let drafter = Arc::new(MockLlm::with_no_tool_calls("60/40 portfolio"));
        let grader = Arc::new(MockLlm::scripted(vec![graded("medium"), graded("high")]));
        let out = InvestmentPlanner::new(drafter.clone())
            .with_structured_llm(grader)
            .invoke("Age 29, high risk tolerance")
            .await
            .unwrap();
        assert_eq!(out.n, 2);
        assert_eq!(out.grade, "high");
        let second = drafter.requests()[1][0].content().to_string();
        assert!(second.contains("take more equity exposure"));
    }

    /// **Scenario**: A grade that never matches stops at the iteration budget.
    #[tokio::test]
    async fn stops_at_max_iterations() {
        let drafter = Arc::new(MockLlm::with_no_tool_calls("bonds only"));
        let grader = Arc::new(MockLlm::new(
            "",
            vec![ToolCall::new("Evaluation", r#"{"grade":"low","feedback":"too safe"}"#)],
        ));
        let out = InvestmentPlanner::new(drafter.clone())
            .with_structured_llm(grader)
            .with_max_iterations(2)
            .invoke("profile")
            .await
            .unwrap();
        assert_eq!(out.n, 2);
        assert_eq!(out.grade, "low");
        assert_eq!(drafter.call_count(), 2);
    }

    /// **Scenario**: A budget far above the default recursion limit still ends on the
    /// iteration counter.
    #[tokio::test]
    async fn large_budget_is_not_cut_by_recursion_limit() {
        let drafter = Arc::new(MockLlm::with_no_tool_calls("cash"));
        let grader = Arc::new(MockLlm::new(
            "",
            vec![ToolCall::new("Evaluation", r#"{"grade":"low","feedback":"riskier"}"#)],
        ));
        let out = InvestmentPlanner::new(drafter.clone())
            .with_structured_llm(grader)
            .with_max_iterations(15)
            .invoke("profile")
            .await
            .unwrap();
        assert_eq!(out.n, 15);
        assert_eq!(drafter.call_count(), 15);
    }

    #[test]
    fn unknown_target_grade_is_rejected() {
        let llm = Arc::new(MockLlm::with_no_tool_calls(""));
        assert!(InvestmentPlanner::new(llm).with_target_grade("extreme").is_err());
    }
}
