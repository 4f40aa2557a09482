//! Structured-output coercion: turn a model answer into a typed value.
//!
//! The schema is offered to the model as a single tool. The answer is read from the
//! first tool call carrying the schema name, falling back to the message content parsed
//! as JSON. serde enforces required fields. On failure the bad answer and the parse
//! error are appended to the conversation and the model is asked again, up to
//! `max_retries` times.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::{ChatOpenAI, LlmClient, LlmResponse, ToolChoiceMode};
use crate::message::Message;
use crate::tool_source::{parse_tool_arguments, ToolSpec};

/// Typed structured-output request.
///
/// ```rust,ignore
/// #[derive(serde::Deserialize)]
/// struct Route { role: String }
///
/// let route = StructuredOutput::<Route>::schema("Route", "Pick a handler", schema)
///     .invoke(llm.as_ref(), &messages)
///     .await?;
/// ```
pub struct StructuredOutput<T> {
    name: String,
    description: String,
    json_schema: Value,
    max_retries: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StructuredOutput<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            json_schema: self.json_schema.clone(),
            max_retries: self.max_retries,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> StructuredOutput<T> {
    pub fn schema(
        name: impl Into<String>,
        description: impl Into<String>,
        json_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            json_schema,
            max_retries: 1,
            _marker: PhantomData,
        }
    }

    /// Number of re-prompts after a malformed answer (default 1).
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema as a tool declaration for binding to a client.
    pub fn tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.json_schema.clone(),
        }
    }

    /// Binds this schema to an OpenAI client as a forced tool.
    pub fn bind(&self, llm: ChatOpenAI) -> ChatOpenAI {
        structured_llm(llm, self.tool_spec())
    }

    /// Calls the model and parses its answer, re-prompting on malformed output.
    pub async fn invoke(&self, llm: &dyn LlmClient, messages: &[Message]) -> Result<T, AgentError> {
        let mut conversation = messages.to_vec();
        let mut attempt = 0;
        loop {
            let response = llm.invoke(&conversation).await?;
            match parse_structured::<T>(&response, &self.name) {
                Ok(value) => {
                    debug!(schema = %self.name, attempt, "structured output parsed");
                    return Ok(value);
                }
                Err(e) if attempt < self.max_retries => {
                    warn!(schema = %self.name, attempt, error = %e, "malformed structured output, re-prompting");
                    conversation.push(Message::assistant(raw_answer(&response, &self.name)));
                    conversation.push(Message::user(format!(
                        "Your previous answer could not be used: {}. Reply again using the {} schema.",
                        e, self.name
                    )));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Binds `spec` to the client and forces the model to call it.
pub fn structured_llm(llm: ChatOpenAI, spec: ToolSpec) -> ChatOpenAI {
    llm.with_tools(vec![spec])
        .with_tool_choice(ToolChoiceMode::Required)
}

fn raw_answer(response: &LlmResponse, name: &str) -> String {
    response
        .tool_calls
        .iter()
        .find(|tc| tc.name == name)
        .map(|tc| tc.arguments.clone())
        .unwrap_or_else(|| response.content.clone())
}

/// Strips a surrounding ```json (or bare ```) fence.
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses a typed value out of a response already in hand.
pub fn parse_structured<T: DeserializeOwned>(
    response: &LlmResponse,
    name: &str,
) -> Result<T, AgentError> {
    let value = match response.tool_calls.iter().find(|tc| tc.name == name) {
        Some(call) => parse_tool_arguments(&call.arguments)
            .map_err(|e| AgentError::MalformedStructuredOutput(format!("{}: {}", name, e)))?,
        None => {
            let body = strip_fence(&response.content);
            if body.is_empty() {
                return Err(AgentError::MalformedStructuredOutput(format!(
                    "{}: empty answer",
                    name
                )));
            }
            serde_json::from_str(body).map_err(|e| {
                AgentError::MalformedStructuredOutput(format!("{}: not JSON: {}", name, e))
            })?
        }
    };
    serde_json::from_value(value)
        .map_err(|e| AgentError::MalformedStructuredOutput(format!("{}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::state::ToolCall;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Route {
        role: String,
    }

    fn route_schema() -> StructuredOutput<Route> {
        StructuredOutput::schema(
            "Route",
            "Pick a handler",
            json!({"type": "object", "properties": {"role": {"type": "string"}}, "required": ["role"]}),
        )
    }

    #[test]
    fn parses_from_named_tool_call() {
        let r = LlmResponse::with_tool_calls(
            "",
            vec![ToolCall::new("Route", r#"{"role":"translate"}"#)],
        );
        let route: Route = parse_structured(&r, "Route").unwrap();
        assert_eq!(route.role, "translate");
    }

    #[test]
    fn parses_fenced_content() {
        let r = LlmResponse::text("```json\n{\"role\": \"summarize\"}\n```");
        let route: Route = parse_structured(&r, "Route").unwrap();
        assert_eq!(route.role, "summarize");
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let r = LlmResponse::text(r#"{"other": 1}"#);
        let err = parse_structured::<Route>(&r, "Route").unwrap_err();
        assert!(matches!(err, AgentError::MalformedStructuredOutput(_)));
    }

    /// **Scenario**: first answer is prose, second is valid JSON; one retry recovers and
    /// the re-prompt carries the parse error.
    #[tokio::test]
    async fn retry_then_success() {
        let llm = MockLlm::scripted(vec![
            LlmResponse::text("I think you should translate it."),
            LlmResponse::text(r#"{"role":"translate"}"#),
        ]);
        let route = route_schema()
            .invoke(&llm, &[Message::user("translate this")])
            .await
            .unwrap();
        assert_eq!(route.role, "translate");
        assert_eq!(llm.call_count(), 2);
        let second = &llm.requests()[1];
        assert_eq!(second.len(), 3);
        assert!(second[2].content().contains("Route"));
    }

    /// **Scenario**: malformed output persists past the retry budget and is surfaced.
    #[tokio::test]
    async fn malformed_after_retries_is_surfaced() {
        let llm = MockLlm::with_no_tool_calls("not json");
        let err = route_schema()
            .with_max_retries(2)
            .invoke(&llm, &[Message::user("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedStructuredOutput(_)));
        assert!(err.is_recoverable());
        assert_eq!(llm.call_count(), 3);
    }
}
