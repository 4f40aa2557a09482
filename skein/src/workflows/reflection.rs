//! Reflection: draft a post, critique it, redraft, until the conversation is long enough.

use std::collections::HashMap;
use std::sync::Arc;

use crate::channels::{append, FieldBasedUpdater};
use crate::error::AgentError;
use crate::graph::{FnNode, Next, RunConfig, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::message::Message;

use super::{build, covering};

/// Message count at which refinement stops (three drafts from one request).
pub const DEFAULT_MAX_MESSAGES: usize = 6;

const WRITER_PROMPT: &str = "You write LinkedIn posts. Produce the strongest post you can for \
the user's request. When critique follows a draft, answer with a revised post that addresses it.";

const CRITIC_PROMPT: &str = "You review LinkedIn posts. Judge structure, tone, clarity and \
likely engagement, then list concrete changes that would make the next draft better.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostState {
    pub messages: Vec<Message>,
}

impl PostState {
    /// Latest assistant draft, if any.
    pub fn latest_draft(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(|m| m.content())
    }
}

pub struct PostRefiner {
    llm: Arc<dyn LlmClient>,
    max_messages: usize,
    config: RunConfig,
}

impl PostRefiner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            max_messages: DEFAULT_MAX_MESSAGES,
            config: RunConfig::default().with_run_name("post_refiner"),
        }
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// Timeout and run name; the recursion limit never drops below what `max_messages` needs.
    pub fn with_run_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn invoke(&self, request: &str) -> Result<PostState, AgentError> {
        let updater = FieldBasedUpdater::new(|c: &mut PostState, u: &PostState| {
            append(&mut c.messages, &u.messages);
        });
        let mut graph = StateGraph::<PostState>::new().with_state_updater(Arc::new(updater));

        let writer = self.llm.clone();
        graph.add_node(
            "generate",
            Arc::new(FnNode::new("generate", move |s: PostState| {
                let llm = writer.clone();
                async move {
                    let mut messages = Vec::with_capacity(s.messages.len() + 1);
                    messages.push(Message::system(WRITER_PROMPT));
                    messages.extend(s.messages);
                    let reply = llm.invoke(&messages).await?;
                    let delta = PostState {
                        messages: vec![Message::assistant(reply.content)],
                    };
                    Ok((delta, Next::Continue))
                }
            })),
        );

        let critic = self.llm.clone();
        graph.add_node(
            "reflect",
            Arc::new(FnNode::new("reflect", move |s: PostState| {
                let llm = critic.clone();
                async move {
                    let draft = s.latest_draft().ok_or_else(|| {
                        AgentError::ExecutionFailed("no draft to reflect on".into())
                    })?;
                    let messages = [
                        Message::system(CRITIC_PROMPT),
                        Message::user(format!("Here is the draft:\n\n{}", draft)),
                    ];
                    let critique = llm.invoke(&messages).await?;
                    let delta = PostState {
                        messages: vec![Message::user(critique.content)],
                    };
                    Ok((delta, Next::Continue))
                }
            })),
        );

        let max_messages = self.max_messages;
        let path_map: HashMap<String, String> = [
            ("reflect".to_string(), "reflect".to_string()),
            (END.to_string(), END.to_string()),
        ]
        .into_iter()
        .collect();
        graph
            .add_edge(START, "generate")
            .add_conditional_edges(
                "generate",
                Arc::new(move |s: &PostState| {
                    if s.messages.len() >= max_messages {
                        END.to_string()
                    } else {
                        "reflect".to_string()
                    }
                }),
                Some(path_map),
            )
            .add_edge("reflect", "generate");

        let state = PostState {
            messages: vec![Message::user(request)],
        };
        // one message per step
        let supersteps = self.max_messages.max(1);
        build(graph)?
            .invoke(state, Some(covering(&self.config, supersteps)))
            .await
    }
}
