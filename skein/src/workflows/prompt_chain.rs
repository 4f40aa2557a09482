//! Prompt chaining: resume summary, then a cover letter built on it.

use std::sync::Arc;

use crate::error::AgentError;
use crate::graph::{FnNode, Next, StateGraph, END, START};
use crate::llm::LlmClient;

use super::{ask, build};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainState {
    pub job_description: String,
    pub resume_summary: String,
    pub cover_letter: String,
}

pub struct CoverLetterChain {
    llm: Arc<dyn LlmClient>,
}

impl CoverLetterChain {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn invoke(&self, job_description: &str) -> Result<ChainState, AgentError> {
        let summary_llm = self.llm.clone();
        let letter_llm = self.llm.clone();

        let mut graph = StateGraph::<ChainState>::new();
        graph.add_node(
            "generate_resume_summary",
            Arc::new(FnNode::new(
                "generate_resume_summary",
                move |mut s: ChainState| {
                    let llm = summary_llm.clone();
                    async move {
                        let prompt = format!(
                            "You write resume summaries. Read the job description below and \
                             summarize the qualifications and experience the ideal candidate \
                             would list, written as that candidate's own resume summary.\n\n\
                             Job Description:\n{}",
                            s.job_description
                        );
                        s.resume_summary = ask(llm.as_ref(), prompt).await?;
                        Ok((s, Next::Continue))
                    }
                },
            )),
        );
        graph.add_node(
            "generate_cover_letter",
            Arc::new(FnNode::new("generate_cover_letter", move |mut s: ChainState| {
                let llm = letter_llm.clone();
                async move {
                    let prompt = format!(
                        "You write cover letters. Using the resume summary below, write a \
                         professional, personalized cover letter for this job.\n\n\
                         Resume Summary:\n{}\n\nJob Description:\n{}",
                        s.resume_summary, s.job_description
                    );
                    s.cover_letter = ask(llm.as_ref(), prompt).await?;
                    Ok((s, Next::Continue))
                }
            })),
        );
        graph
            .add_edge(START, "generate_resume_summary")
            .add_edge("generate_resume_summary", "generate_cover_letter")
            .add_edge("generate_cover_letter", END);

        let state = ChainState {
            job_description: job_description.to_string(),
            ..ChainState::default()
        };
        build(graph)?.invoke(state, None).await
    }
}
