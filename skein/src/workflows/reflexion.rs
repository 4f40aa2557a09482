//! Reflexion: answer with a self-critique and search queries, research the queries,
//! revise with citations, repeat a bounded number of times.
//!
//! Answers travel as assistant tool calls (`AnswerQuestion` / `ReviseAnswer`) so the
//! research results can be attached as tool messages correlated by call id.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::channels::{append, merge_if_set, FieldBasedUpdater};
use crate::error::AgentError;
use crate::graph::{FnNode, Next, RunConfig, StateGraph, END, START};
use crate::llm::{LlmClient, StructuredOutput};
use crate::message::Message;
use crate::state::ToolCall;
use crate::tools::search::{search_as_json, SearchClient};

use super::{build, covering};

pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
/// Hits fetched per search query.
pub const RESULTS_PER_QUERY: usize = 3;

const ANSWER_TOOL: &str = "AnswerQuestion";
const REVISE_TOOL: &str = "ReviseAnswer";

const RESEARCHER_PROMPT: &str = "You are a meticulous expert researcher. Answer the user's \
question in about 250 words. Then critique your own answer: say what is missing and what is \
superfluous. Finally list one to three search queries that would fill the gaps, kept apart \
from the critique.";

const REVISER_PROMPT: &str = "Revise your previous answer using the search results above. \
Use the critique to drop unsupported claims and add what was missing. Cite sources with \
numbered references like [1] and list their URLs under references. Stay under 250 words.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    /// What the answer lacks.
    pub missing: String,
    /// What the answer could drop.
    pub superfluous: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerQuestion {
    pub answer: String,
    pub reflection: Reflection,
    pub search_queries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviseAnswer {
    #[serde(flatten)]
    pub base: AnswerQuestion,
    /// Citations backing the revised answer.
    pub references: Vec<String>,
}

fn answer_properties() -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("answer".into(), json!({ "type": "string" }));
    props.insert(
        "reflection".into(),
        json!({
            "type": "object",
            "properties": {
                "missing": { "type": "string" },
                "superfluous": { "type": "string" }
            },
            "required": ["missing", "superfluous"]
        }),
    );
    props.insert(
        "search_queries".into(),
        json!({ "type": "array", "items": { "type": "string" } }),
    );
    props
}

impl AnswerQuestion {
    pub fn output() -> StructuredOutput<AnswerQuestion> {
        StructuredOutput::schema(
            ANSWER_TOOL,
            "Answer the question with a self-critique and follow-up search queries",
            json!({
                "type": "object",
                "properties": answer_properties(),
                "required": ["answer", "reflection", "search_queries"]
            }),
        )
    }
}

impl ReviseAnswer {
    pub fn output() -> StructuredOutput<ReviseAnswer> {
        let mut props = answer_properties();
        props.insert(
            "references".into(),
            json!({ "type": "array", "items": { "type": "string" } }),
        );
        StructuredOutput::schema(
            REVISE_TOOL,
            "Revise the previous answer with cited references",
            json!({
                "type": "object",
                "properties": props,
                "required": ["answer", "reflection", "search_queries", "references"]
            }),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReflexionState {
    pub messages: Vec<Message>,
    /// Completed revisions.
    pub iterations: u32,
}

impl ReflexionState {
    /// The last revised answer, if a revision has been made.
    pub fn final_answer(&self) -> Option<ReviseAnswer> {
        self.messages
            .iter()
            .rev()
            .flat_map(|m| m.tool_calls().iter())
            .find(|tc| tc.name == REVISE_TOOL)
            .and_then(|tc| serde_json::from_str(&tc.arguments).ok())
    }
}

pub struct ReflexionAgent {
    respond_llm: Arc<dyn LlmClient>,
    revise_llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchClient>,
    max_iterations: u32,
    config: RunConfig,
}

impl ReflexionAgent {
    pub fn new(llm: Arc<dyn LlmClient>, search: Arc<dyn SearchClient>) -> Self {
        Self {
            respond_llm: llm.clone(),
            revise_llm: llm,
            search,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            config: RunConfig::default().with_run_name("reflexion"),
        }
    }

    /// Separate clients for the first answer and the revisions, typically bound with
    /// [`AnswerQuestion::output`] and [`ReviseAnswer::output`].
    pub fn with_llms(mut self, respond: Arc<dyn LlmClient>, revise: Arc<dyn LlmClient>) -> Self {
        self.respond_llm = respond;
        self.revise_llm = revise;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_run_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn invoke(&self, question: &str) -> Result<ReflexionState, AgentError> {
        let updater = FieldBasedUpdater::new(|c: &mut ReflexionState, u: &ReflexionState| {
            append(&mut c.messages, &u.messages);
            merge_if_set(&mut c.iterations, &u.iterations);
        });
        let mut graph = StateGraph::<ReflexionState>::new().with_state_updater(Arc::new(updater));

        let responder = self.respond_llm.clone();
        graph.add_node(
            "respond",
            Arc::new(FnNode::new("respond", move |s: ReflexionState| {
                let llm = responder.clone();
                async move {
                    let request = with_instructions(RESEARCHER_PROMPT, &s.messages);
                    let first = AnswerQuestion::output().invoke(llm.as_ref(), &request).await?;
                    let delta = ReflexionState {
                        messages: vec![as_tool_call(ANSWER_TOOL, &first)?],
                        ..ReflexionState::default()
                    };
                    Ok((delta, Next::Continue))
                }
            })),
        );

        let search = self.search.clone();
        graph.add_node(
            "execute_tools",
            Arc::new(FnNode::new("execute_tools", move |s: ReflexionState| {
                let search = search.clone();
                async move {
                    let delta = ReflexionState {
                        messages: research(search.as_ref(), &s.messages).await,
                        ..ReflexionState::default()
                    };
                    Ok((delta, Next::Continue))
                }
            })),
        );

        let reviser = self.revise_llm.clone();
        graph.add_node(
            "revise",
            Arc::new(FnNode::new("revise", move |s: ReflexionState| {
                let llm = reviser.clone();
                async move {
                    let request = with_instructions(REVISER_PROMPT, &s.messages);
                    let revised = ReviseAnswer::output().invoke(llm.as_ref(), &request).await?;
                    let delta = ReflexionState {
                        messages: vec![as_tool_call(REVISE_TOOL, &revised)?],
                        iterations: s.iterations + 1,
                    };
                    tracing::debug!(iterations = delta.iterations, "answer revised");
                    Ok((delta, Next::Continue))
                }
            })),
        );

        let max_iterations = self.max_iterations;
        let path_map: HashMap<String, String> = [
            ("execute_tools".to_string(), "execute_tools".to_string()),
            (END.to_string(), END.to_string()),
        ]
        .into_iter()
        .collect();
        graph
            .add_edge(START, "respond")
            .add_edge("respond", "execute_tools")
            .add_edge("execute_tools", "revise")
            .add_conditional_edges(
                "revise",
                Arc::new(move |s: &ReflexionState| {
                    if s.iterations >= max_iterations {
                        END.to_string()
                    } else {
                        "execute_tools".to_string()
                    }
                }),
                Some(path_map),
            );

        let state = ReflexionState {
            messages: vec![Message::user(question)],
            iterations: 0,
        };
        // respond, then execute_tools and revise per iteration
        let supersteps = 1 + 2 * (self.max_iterations.max(1) as usize);
        build(graph)?
            .invoke(state, Some(covering(&self.config, supersteps)))
            .await
    }
}

/// System prompt, the conversation so far, then a closing instruction.
fn with_instructions(system: &str, history: &[Message]) -> Vec<Message> {
    let mut request = Vec::with_capacity(history.len() + 2);
    request.push(Message::system(system));
    request.extend(history.iter().cloned());
    request.push(Message::user(
        "Reply through the provided function, following the required format.",
    ));
    request
}

fn as_tool_call<T: Serialize>(name: &str, value: &T) -> Result<Message, AgentError> {
    let arguments = serde_json::to_string(value)
        .map_err(|e| AgentError::ExecutionFailed(format!("cannot encode {}: {}", name, e)))?;
    let call = ToolCall::new(name, arguments).with_id(uuid::Uuid::new_v4().to_string());
    Ok(Message::assistant_with_tool_calls("", vec![call]))
}

/// Runs every search query of the last answer; one tool message per answer call.
async fn research(search: &dyn SearchClient, history: &[Message]) -> Vec<Message> {
    let Some(last) = history.last() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for call in last.tool_calls() {
        if call.name != ANSWER_TOOL && call.name != REVISE_TOOL {
            continue;
        }
        let queries: Vec<String> = serde_json::from_str::<Value>(&call.arguments)
            .ok()
            .and_then(|v| v.get("search_queries").cloned())
            .and_then(|q| serde_json::from_value(q).ok())
            .unwrap_or_default();
        let mut results = Map::new();
        for query in queries {
            let hits = search_as_json(search, &query, RESULTS_PER_QUERY).await;
            results.insert(query, hits);
        }
        out.push(Message::tool(
            call.id.clone().unwrap_or_default(),
            call.name.clone(),
            Value::Object(results).to_string(),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, MockLlm};
    use crate::tool_source::ToolSourceError;
    use crate::tools::SearchHit;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSearch {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchClient for RecordingSearch {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchHit>, ToolSourceError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(vec![SearchHit {
                title: format!("about {query}"),
                url: "https://example.org".into(),
                content: "evidence".into(),
            }])
        }
    }

    fn answer(queries: &[&str]) -> LlmResponse {
        let body = json!({
            "answer": "draft",
            "reflection": { "missing": "data", "superfluous": "none" },
            "search_queries": queries,
        });
        LlmResponse::with_tool_calls("", vec![ToolCall::new(ANSWER_TOOL, body.to_string())])
    }

    fn revision(n: u32) -> LlmResponse {
        let body = json!({
            "answer": format!("revision {n}"),
            "reflection": { "missing": "", "superfluous": "" },
            "search_queries": ["follow up"],
            "references": ["[1] https://example.org"],
        });
        LlmResponse::with_tool_calls("", vec![ToolCall::new(REVISE_TOOL, body.to_string())])
    }

    /// **Scenario**: Respond once, then research and revise until the iteration bound.
    #[tokio::test]
    async fn revises_up_to_max_iterations() {
        let search = Arc::new(RecordingSearch::default());
        let respond = Arc::new(MockLlm::scripted(vec![answer(&["q1", "q2"])]));
        let revise = Arc::new(MockLlm::scripted((1..=3).map(revision)));
        let out = ReflexionAgent::new(respond.clone(), search.clone())
            .with_llms(respond.clone(), revise.clone())
            .invoke("Is fiber necessary?")
            .await
            .unwrap();

        assert_eq!(out.iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(respond.call_count(), 1);
        assert_eq!(revise.call_count(), 3);
        assert_eq!(
            *search.queries.lock().unwrap(),
            vec!["q1", "q2", "follow up", "follow up"]
        );
        // user, answer, then (tool, revision) per iteration
        assert_eq!(out.messages.len(), 2 + 2 * 3);
        let final_answer = out.final_answer().unwrap();
        assert_eq!(final_answer.base.answer, "revision 3");
        assert_eq!(final_answer.references.len(), 1);
    }

    /// **Scenario**: Fifteen revisions run to completion although they take more
    /// supersteps than the default recursion limit.
    #[tokio::test]
    async fn large_budget_is_not_cut_by_recursion_limit() {
        let search = Arc::new(RecordingSearch::default());
        let respond = Arc::new(MockLlm::scripted(vec![answer(&["q1"])]));
        let revise = Arc::new(MockLlm::scripted((1..=15).map(revision)));
        let out = ReflexionAgent::new(respond.clone(), search)
            .with_llms(respond, revise.clone())
            .with_max_iterations(15)
            .with_run_config(RunConfig::default().with_recursion_limit(5))
            .invoke("Is fiber necessary?")
            .await
            .unwrap();
        assert_eq!(out.iterations, 15);
        assert_eq!(revise.call_count(), 15);
        assert_eq!(out.final_answer().unwrap().base.answer, "revision 15");
    }

    /// **Scenario**: Tool messages answer the call id of the message they research.
    #[tokio::test]
    async fn research_correlates_call_ids() {
        let search = RecordingSearch::default();
        let history = vec![
            Message::user("q"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new(ANSWER_TOOL, r#"{"search_queries":["a"]}"#).with_id("c-1")],
            ),
        ];
        let out = research(&search, &history).await;
        assert_eq!(out.len(), 1);
        match &out[0] {
            Message::Tool {
                call_id, content, ..
            } => {
                assert_eq!(call_id, "c-1");
                let parsed: Value = serde_json::from_str(content).unwrap();
                assert_eq!(parsed["a"][0]["title"], "about a");
            }
            other => panic!("expected tool message, got {other:?}"),
        }
    }
}
