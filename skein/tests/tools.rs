//! Integration tests: stock tools through the registry's ToolSource interface.

mod init_logging;

use serde_json::json;
use skein::tools::arithmetic::sum_numbers;
use skein::tools::ClothingTool;
use skein::{math_registry, ToolRegistry, ToolSource, ToolSourceError};

#[test]
fn sum_numbers_ignores_number_words() {
    assert_eq!(sum_numbers("add 3, 4 and five"), json!({ "result": 7 }));
    assert_eq!(sum_numbers("-1.5 and 2"), json!({ "result": 0.5 }));
    assert_eq!(
        sum_numbers("nothing here"),
        json!({ "result": "No numbers found in input." })
    );
}

#[tokio::test]
async fn math_registry_lists_four_tools() {
    let registry = math_registry();
    let mut names: Vec<String> = registry
        .list_tools()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["add_numbers", "divide_numbers", "multiply_numbers", "subtract_numbers"]
    );
}

#[tokio::test]
async fn divide_by_zero_is_a_result_not_an_error() {
    let out = math_registry()
        .call_tool("divide_numbers", json!({ "inputs": "10 0" }))
        .await
        .unwrap();
    assert!(out.text.to_lowercase().contains("zero"));
}

#[tokio::test]
async fn unknown_tool_is_not_found() {
    let err = ToolRegistry::new()
        .with_tool(ClothingTool)
        .call_tool("add_numbers", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolSourceError::NotFound(ref n) if n == "add_numbers"));
}
