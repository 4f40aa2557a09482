//! Tools exposed to the model, plus the registry that resolves them by name.
//!
//! - [`Tool`]: one callable with a spec.
//! - [`ToolRegistry`]: name → tool; implements [`ToolSource`](crate::tool_source::ToolSource).
//! - [`FnTool`]: closure-backed tool.
//! - [`arithmetic`], [`clothing`], [`search`]: the stock tools.

pub mod arithmetic;
pub mod clothing;
mod fn_tool;
mod registry;
pub mod search;
mod r#trait;

pub use arithmetic::{math_registry, ArithmeticTool, Operation, SumNumbersTool};
pub use clothing::ClothingTool;
pub use fn_tool::FnTool;
pub use r#trait::Tool;
pub use registry::ToolRegistry;
pub use search::{SearchClient, SearchHit, TavilyClient, WebSearchTool};
