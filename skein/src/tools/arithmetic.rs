//! Arithmetic tools that pull numbers out of free text.
//!
//! Every tool takes `{"inputs": "<text>"}` and returns `{"result": <value>}`. Words
//! that are not numerals are ignored, so `"add 3, 4 and five"` sums to 7. Failures
//! (division by zero, overflow) come back as a descriptive `result` string.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::r#trait::Tool;

pub const TOOL_ADD_NUMBERS: &str = "add_numbers";
pub const TOOL_SUBTRACT_NUMBERS: &str = "subtract_numbers";
pub const TOOL_MULTIPLY_NUMBERS: &str = "multiply_numbers";
pub const TOOL_DIVIDE_NUMBERS: &str = "divide_numbers";
pub const TOOL_SUM_NUMBERS: &str = "sum_numbers";

static UNSIGNED_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static SIGNED_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));

fn inputs_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "inputs": { "type": "string", "description": description }
        },
        "required": ["inputs"]
    })
}

/// Reads the `inputs` text; a bare string argument is accepted as well.
fn input_text(args: &Value) -> Result<&str, ToolSourceError> {
    if let Some(s) = args.as_str() {
        return Ok(s);
    }
    args.get("inputs")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolSourceError::InvalidInput("missing string field 'inputs'".into()))
}

/// Non-negative integers in order of appearance.
pub fn extract_integers(text: &str) -> Result<Vec<i64>, String> {
    UNSIGNED_INT
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .parse::<i64>()
                .map_err(|e| format!("cannot read number '{}': {}", m.as_str(), e))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Self::Add => TOOL_ADD_NUMBERS,
            Self::Subtract => TOOL_SUBTRACT_NUMBERS,
            Self::Multiply => TOOL_MULTIPLY_NUMBERS,
            Self::Divide => TOOL_DIVIDE_NUMBERS,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Add => "Extracts whole numbers from the text and adds all of them.",
            Self::Subtract => {
                "Extracts whole numbers from the text and subtracts each from the first."
            }
            Self::Multiply => "Extracts whole numbers from the text and multiplies all of them.",
            Self::Divide => "Extracts whole numbers from the text and divides the first by the rest in order.",
        }
    }

    /// Folds the numbers; `Err` carries the text reported back to the model.
    fn apply(self, numbers: &[i64]) -> Result<Value, String> {
        let Some((&first, rest)) = numbers.split_first() else {
            return Ok(match self {
                Self::Multiply => json!(1),
                _ => json!(0),
            });
        };
        let overflow = || format!("{} overflowed", self.name());
        match self {
            Self::Add => numbers
                .iter()
                .try_fold(0i64, |acc, n| acc.checked_add(*n))
                .map(Value::from)
                .ok_or_else(overflow),
            Self::Subtract => rest
                .iter()
                .try_fold(first, |acc, n| acc.checked_sub(*n))
                .map(Value::from)
                .ok_or_else(overflow),
            Self::Multiply => numbers
                .iter()
                .try_fold(1i64, |acc, n| acc.checked_mul(*n))
                .map(Value::from)
                .ok_or_else(overflow),
            Self::Divide => {
                let mut acc = first as f64;
                for n in rest {
                    if *n == 0 {
                        return Err("division by zero".to_string());
                    }
                    acc /= *n as f64;
                }
                Ok(json!(acc))
            }
        }
    }
}

/// One of the four integer tools (`add_numbers`, `subtract_numbers`, `multiply_numbers`,
/// `divide_numbers`).
#[derive(Debug, Clone, Copy)]
pub struct ArithmeticTool {
    op: Operation,
}

impl ArithmeticTool {
    pub fn new(op: Operation) -> Self {
        Self { op }
    }

    pub fn add() -> Self {
        Self::new(Operation::Add)
    }

    pub fn subtract() -> Self {
        Self::new(Operation::Subtract)
    }

    pub fn multiply() -> Self {
        Self::new(Operation::Multiply)
    }

    pub fn divide() -> Self {
        Self::new(Operation::Divide)
    }
}

#[async_trait]
impl Tool for ArithmeticTool {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.op.name().to_string(),
            description: Some(self.op.description().to_string()),
            input_schema: inputs_schema("Text containing the numbers, e.g. 'add 3 and 4'"),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolCallContent, ToolSourceError> {
        let text = input_text(&args)?;
        let result = extract_integers(text).and_then(|numbers| {
            tracing::debug!(tool = self.op.name(), ?numbers, "numbers extracted");
            self.op.apply(&numbers)
        });
        let value = match result {
            Ok(v) => json!({ "result": v }),
            Err(e) => json!({ "result": format!("Error: {}", e) }),
        };
        Ok(ToolCallContent::json(&value))
    }
}

/// Sums signed integers and decimals found in the text.
///
/// The result stays an integer when every number found is one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumNumbersTool;

/// Pure form of `sum_numbers`, returning the `{"result": ..}` object.
pub fn sum_numbers(text: &str) -> Value {
    let matches: Vec<&str> = SIGNED_DECIMAL.find_iter(text).map(|m| m.as_str()).collect();
    if matches.is_empty() {
        return json!({ "result": "No numbers found in input." });
    }
    if matches.iter().all(|m| !m.contains('.')) {
        let total = matches
            .iter()
            .map(|m| m.parse::<i64>())
            .try_fold(0i64, |acc, n| n.ok().and_then(|n| acc.checked_add(n)));
        if let Some(total) = total {
            return json!({ "result": total });
        }
    }
    let total: Result<f64, _> = matches.iter().map(|m| m.parse::<f64>()).sum();
    match total {
        Ok(t) => json!({ "result": t }),
        Err(e) => json!({ "result": format!("Error during summation: {}", e) }),
    }
}

#[async_trait]
impl Tool for SumNumbersTool {
    fn name(&self) -> &str {
        TOOL_SUM_NUMBERS
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SUM_NUMBERS.to_string(),
            description: Some(
                "Extracts and sums all integers and decimals from the input.".to_string(),
            ),
            input_schema: inputs_schema("Text containing the numbers to sum"),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolCallContent, ToolSourceError> {
        let text = input_text(&args)?;
        Ok(ToolCallContent::json(&sum_numbers(text)))
    }
}

/// Registry with the four integer tools used by the math agent.
pub fn math_registry() -> crate::tools::ToolRegistry {
    crate::tools::ToolRegistry::new()
        .with_tool(ArithmeticTool::add())
        .with_tool(ArithmeticTool::subtract())
        .with_tool(ArithmeticTool::multiply())
        .with_tool(ArithmeticTool::divide())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: non-numeral words are ignored; "add 3, 4 and five" sums to 7.
    #[test]
    fn sum_numbers_ignores_words() {
        assert_eq!(sum_numbers("add 3, 4 and five"), json!({ "result": 7 }));
    }

    #[test]
    fn sum_numbers_handles_decimals_and_negatives() {
        assert_eq!(sum_numbers("-1.5 plus 4"), json!({ "result": 2.5 }));
        assert_eq!(sum_numbers("-2 and 5"), json!({ "result": 3 }));
    }

    #[test]
    fn sum_numbers_without_numbers_reports_it() {
        assert_eq!(
            sum_numbers("nothing here"),
            json!({ "result": "No numbers found in input." })
        );
    }

    #[test]
    fn extract_integers_in_order() {
        assert_eq!(extract_integers("10 minus 3 minus 2").unwrap(), vec![10, 3, 2]);
        assert!(extract_integers("none").unwrap().is_empty());
    }

    #[test]
    fn folds_match_left_to_right_semantics() {
        assert_eq!(Operation::Add.apply(&[1, 2, 3]).unwrap(), json!(6));
        assert_eq!(Operation::Subtract.apply(&[10, 3, 2]).unwrap(), json!(5));
        assert_eq!(Operation::Multiply.apply(&[2, 3, 4]).unwrap(), json!(24));
        assert_eq!(Operation::Divide.apply(&[20, 2, 4]).unwrap(), json!(2.5));
    }

    #[test]
    fn empty_inputs_use_identity() {
        assert_eq!(Operation::Add.apply(&[]).unwrap(), json!(0));
        assert_eq!(Operation::Multiply.apply(&[]).unwrap(), json!(1));
        assert_eq!(Operation::Divide.apply(&[]).unwrap(), json!(0));
    }

    /// **Scenario**: division by zero is reported as result text, not an error.
    #[tokio::test]
    async fn divide_by_zero_returns_descriptive_result() {
        let out = ArithmeticTool::divide()
            .call(json!({ "inputs": "divide 8 by 0" }))
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(v["result"], "Error: division by zero");
    }

    #[tokio::test]
    async fn missing_inputs_is_invalid_input() {
        let err = ArithmeticTool::add().call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn bare_string_argument_accepted() {
        let out = ArithmeticTool::multiply()
            .call(json!("3 times 5"))
            .await
            .unwrap();
        assert_eq!(out.text, r#"{"result":15}"#);
    }

    #[test]
    fn math_registry_has_four_tools() {
        let names: Vec<_> = math_registry().list().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                TOOL_ADD_NUMBERS,
                TOOL_DIVIDE_NUMBERS,
                TOOL_MULTIPLY_NUMBERS,
                TOOL_SUBTRACT_NUMBERS
            ]
        );
    }
}
