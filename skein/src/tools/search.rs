//! Web search collaborator and the `search_tool` that exposes it to the model.
//!
//! [`SearchClient`] is the seam: [`TavilyClient`] calls the Tavily HTTP API, tests
//! plug in canned clients. Search failures never abort a run; the tool reports them
//! as an error entry in its result list.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::r#trait::Tool;

pub const TOOL_SEARCH: &str = "search_tool";

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: usize = 5;

/// One search result snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Free-text query in, ordered result snippets out.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchHit>, ToolSourceError>;
}

/// Tavily search API client.
pub struct TavilyClient {
    api_key: String,
    http: reqwest::Client,
    endpoint: String,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            endpoint: TAVILY_SEARCH_URL.to_string(),
        }
    }

    /// Overrides the endpoint (e.g. a proxy).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, ToolSourceError> {
        let body = json!({ "query": query, "max_results": max_results });
        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let err_body = res.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "Tavily API error {}: {}",
                status, err_body
            )));
        }
        let out: TavilyResponse = res
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        tracing::debug!(query = %query, hits = out.results.len(), "tavily search");
        Ok(out.results)
    }
}

/// Runs a search and renders hits (or a single error entry) as JSON.
pub async fn search_as_json(client: &dyn SearchClient, query: &str, max_results: usize) -> Value {
    match client.search(query, max_results).await {
        Ok(hits) => json!(hits),
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "search failed");
            json!([{ "error": e.to_string() }])
        }
    }
}

/// `search_tool`: web search for current information.
#[derive(Clone)]
pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self {
            client,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        TOOL_SEARCH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SEARCH.to_string(),
            description: Some(
                "Search the web for current information (weather, news, facts).".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The search query" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolCallContent, ToolSourceError> {
        let query = args
            .as_str()
            .or_else(|| args.get("query").and_then(Value::as_str))
            .ok_or_else(|| ToolSourceError::InvalidInput("missing string field 'query'".into()))?;
        let out = search_as_json(self.client.as_ref(), query, self.max_results).await;
        Ok(ToolCallContent::json(&out))
    }
}
