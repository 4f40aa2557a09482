//! Parallel fan-out/fan-in: three translations run side by side, then one aggregator.

use std::sync::Arc;

use crate::channels::{merge_if_set, FieldBasedUpdater};
use crate::error::AgentError;
use crate::graph::{FnNode, Next, StateGraph, END, START};
use crate::llm::LlmClient;

use super::{ask, build};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationState {
    pub text: String,
    pub french: String,
    pub spanish: String,
    pub japanese: String,
    pub combined_output: String,
}

const TARGETS: [(&str, &str); 3] = [
    ("translate_french", "French"),
    ("translate_spanish", "Spanish"),
    ("translate_japanese", "Japanese"),
];

pub struct TranslationFanOut {
    llm: Arc<dyn LlmClient>,
}

impl TranslationFanOut {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn invoke(&self, text: &str) -> Result<TranslationState, AgentError> {
        let updater = FieldBasedUpdater::new(|c: &mut TranslationState, u: &TranslationState| {
            merge_if_set(&mut c.text, &u.text);
            merge_if_set(&mut c.french, &u.french);
            merge_if_set(&mut c.spanish, &u.spanish);
            merge_if_set(&mut c.japanese, &u.japanese);
            merge_if_set(&mut c.combined_output, &u.combined_output);
        });
        let mut graph = StateGraph::<TranslationState>::new().with_state_updater(Arc::new(updater));

        for (id, language) in TARGETS {
            let llm = self.llm.clone();
            graph.add_node(
                id,
                Arc::new(FnNode::new(id, move |s: TranslationState| {
                    let llm = llm.clone();
                    async move {
                        let prompt =
                            format!("Translate the following text to {}:\n\n{}", language, s.text);
                        let translated = ask(llm.as_ref(), prompt).await?;
                        let mut delta = TranslationState::default();
                        match language {
                            "French" => delta.french = translated,
                            "Spanish" => delta.spanish = translated,
                            _ => delta.japanese = translated,
                        }
                        Ok((delta, Next::Continue))
                    }
                })),
            );
            graph.add_edge(START, id);
        }
        graph.add_node(
            "aggregator",
            Arc::new(FnNode::new("aggregator", |s: TranslationState| async move {
                let delta = TranslationState {
                    combined_output: combine(&s),
                    ..TranslationState::default()
                };
                Ok((delta, Next::Continue))
            })),
        );
        graph
            .add_join_edge(TARGETS.iter().map(|(id, _)| *id), "aggregator")
            .add_edge("aggregator", END);

        let state = TranslationState {
            text: text.to_string(),
            ..TranslationState::default()
        };
        build(graph)?.invoke(state, None).await
    }
}

fn combine(s: &TranslationState) -> String {
    format!(
        "Original Text: {}\n\nFrench: {}\n\nSpanish: {}\n\nJapanese: {}\n",
        s.text, s.french, s.spanish, s.japanese
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, MockLlm};
    use std::time::Duration;

    /// **Scenario**: Each branch fills its own field; the aggregator sees all three.
    #[tokio::test]
    async fn aggregator_combines_all_translations() {
        let llm = Arc::new(
            MockLlm::from_fn(|msgs| {
                let prompt = msgs[0].content();
                let reply = if prompt.contains("to French") {
                    "Bonjour"
                } else if prompt.contains("to Spanish") {
                    "Hola"
                } else {
                    "Konnichiwa"
                };
                Ok(LlmResponse::text(reply))
            })
            .with_delay(Duration::from_millis(5)),
        );
        let out = TranslationFanOut::new(llm.clone()).invoke("Hello").await.unwrap();
        assert_eq!(
            out.combined_output,
            "Original Text: Hello\n\nFrench: Bonjour\n\nSpanish: Hola\n\nJapanese: Konnichiwa\n"
        );
        assert_eq!(llm.call_count(), 3);
    }
}
