//! `recommend_clothing`: keyword rules over a short weather description.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::r#trait::Tool;

pub const TOOL_RECOMMEND_CLOTHING: &str = "recommend_clothing";

/// Picks attire for a weather description such as `"Overcast, 64.9°F"`.
///
/// Rules are checked in order: snow/freezing, rain/wet, hot/85, cold/50, fallback.
pub fn recommend_clothing(weather: &str) -> &'static str {
    let weather = weather.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| weather.contains(w));
    if has(&["snow", "freezing"]) {
        "Wear a heavy coat, gloves, and boots."
    } else if has(&["rain", "wet"]) {
        "Bring a raincoat and waterproof shoes."
    } else if has(&["hot", "85"]) {
        "T-shirt, shorts, and sunscreen recommended."
    } else if has(&["cold", "50"]) {
        "Wear a warm jacket or sweater."
    } else {
        "A light jacket should be fine."
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClothingTool;

#[async_trait]
impl Tool for ClothingTool {
    fn name(&self) -> &str {
        TOOL_RECOMMEND_CLOTHING
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_RECOMMEND_CLOTHING.to_string(),
            description: Some(
                "Returns a clothing recommendation for a brief weather description \
                 (e.g. 'Overcast, 64.9°F'). Handles snow, rain, heat and cold."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "weather": { "type": "string", "description": "Brief weather description" }
                },
                "required": ["weather"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolCallContent, ToolSourceError> {
        let weather = args
            .as_str()
            .or_else(|| args.get("weather").and_then(Value::as_str))
            .ok_or_else(|| ToolSourceError::InvalidInput("missing string field 'weather'".into()))?;
        Ok(ToolCallContent::text(recommend_clothing(weather)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_apply_in_order() {
        assert_eq!(recommend_clothing("Heavy SNOW"), "Wear a heavy coat, gloves, and boots.");
        assert_eq!(recommend_clothing("light rain"), "Bring a raincoat and waterproof shoes.");
        assert_eq!(recommend_clothing("Sunny, 85°F"), "T-shirt, shorts, and sunscreen recommended.");
        assert_eq!(recommend_clothing("cold wind"), "Wear a warm jacket or sweater.");
        assert_eq!(recommend_clothing("Overcast, 64.9°F"), "A light jacket should be fine.");
    }

    /// **Scenario**: "freezing rain" matches the first rule, not the rain rule.
    #[test]
    fn earlier_rule_wins() {
        assert_eq!(
            recommend_clothing("freezing rain"),
            "Wear a heavy coat, gloves, and boots."
        );
    }

    #[tokio::test]
    async fn call_reads_weather_field() {
        let out = ClothingTool
            .call(json!({ "weather": "wet and windy" }))
            .await
            .unwrap();
        assert_eq!(out.text, "Bring a raincoat and waterproof shoes.");
    }
}
