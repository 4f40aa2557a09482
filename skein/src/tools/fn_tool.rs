use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::r#trait::Tool;

type ToolFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Synchronous closure exposed as a tool. The closure's `Err` text becomes an
/// execution error, so the loop reports it to the model.
#[derive(Clone)]
pub struct FnTool {
    spec: ToolSpec,
    f: ToolFn,
}

impl FnTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            spec: ToolSpec {
                name: name.into(),
                description: Some(description.into()),
                input_schema,
            },
            f: Arc::new(f),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(&self, args: Value) -> Result<ToolCallContent, ToolSourceError> {
        match (self.f)(args) {
            Ok(Value::String(s)) => Ok(ToolCallContent::text(s)),
            Ok(v) => Ok(ToolCallContent::json(&v)),
            Err(e) => Err(ToolSourceError::Execution(e)),
        }
    }
}
