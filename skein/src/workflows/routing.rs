//! Routing: classify the request, then hand it to exactly one specialist step.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::error::AgentError;
use crate::graph::{FnNode, Next, StateGraph, END, START};
use crate::llm::{LlmClient, StructuredOutput};
use crate::message::Message;

use super::{ask, build};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterState {
    pub user_input: String,
    pub task_type: String,
    pub output: String,
}

/// Classifier answer: which handler should take the request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Route {
    pub role: String,
}

impl Route {
    pub fn output() -> StructuredOutput<Route> {
        StructuredOutput::schema(
            "Route",
            "Pick the handler for the user's request",
            json!({
                "type": "object",
                "properties": {
                    "role": {
                        "type": "string",
                        "enum": ["summarize", "translate"],
                        "description": "summarize for summaries, translate for translations"
                    }
                },
                "required": ["role"]
            }),
        )
    }
}

pub struct TaskRouter {
    llm: Arc<dyn LlmClient>,
    structured_llm: Arc<dyn LlmClient>,
}

impl TaskRouter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            structured_llm: llm.clone(),
            llm,
        }
    }

    /// Client used by the classifier step; typically bound with [`Route::output`].
    pub fn with_structured_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.structured_llm = llm;
        self
    }

    pub async fn invoke(&self, user_input: &str) -> Result<RouterState, AgentError> {
        let mut graph = StateGraph::<RouterState>::new();

        let classifier = self.structured_llm.clone();
        graph.add_node(
            "router",
            Arc::new(FnNode::new("router", move |mut s: RouterState| {
                let llm = classifier.clone();
                async move {
                    let messages = [
                        Message::system(
                            "Decide whether the user wants a summary or a translation. \
                             Answer with role \"summarize\" or \"translate\".",
                        ),
                        Message::user(s.user_input.clone()),
                    ];
                    let route = Route::output().invoke(llm.as_ref(), &messages).await?;
                    tracing::debug!(role = %route.role, "task routed");
                    s.task_type = route.role;
                    Ok((s, Next::Continue))
                }
            })),
        );

        let summarizer = self.llm.clone();
        graph.add_node(
            "summarize",
            Arc::new(FnNode::new("summarize", move |mut s: RouterState| {
                let llm = summarizer.clone();
                async move {
                    let prompt = format!("Summarize the following in one short paragraph:\n\n{}", s.user_input);
                    s.output = ask(llm.as_ref(), prompt).await?;
                    Ok((s, Next::Continue))
                }
            })),
        );

        let translator = self.llm.clone();
        graph.add_node(
            "translate",
            Arc::new(FnNode::new("translate", move |mut s: RouterState| {
                let llm = translator.clone();
                async move {
                    let prompt = format!(
                        "Carry out the translation the user asks for. Reply with the translation only.\n\n{}",
                        s.user_input
                    );
                    s.output = ask(llm.as_ref(), prompt).await?;
                    Ok((s, Next::Continue))
                }
            })),
        );

        let path_map: HashMap<String, String> = [
            ("summarize".to_string(), "summarize".to_string()),
            ("translate".to_string(), "translate".to_string()),
        ]
        .into_iter()
        .collect();
        graph
            .add_edge(START, "router")
            .add_conditional_edges("router", Arc::new(|s: &RouterState| s.task_type.clone()), Some(path_map))
            .add_edge("summarize", END)
            .add_edge("translate", END);

        let state = RouterState {
            user_input: user_input.to_string(),
            ..RouterState::default()
        };
        build(graph)?.invoke(state, None).await
    }
}
