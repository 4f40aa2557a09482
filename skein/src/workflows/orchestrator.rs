//! Orchestrator-worker: plan the dishes, one chef per dish in parallel, then synthesize.
//!
//! The orchestrator's structured plan drives a dynamic fan-out: each dish becomes a
//! [`SendTask`] to `chef_worker` carrying only that dish. Chef outputs accumulate in
//! `completed_menu`; their order follows scheduling order, not completion order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::channels::{append, merge_if_set, FieldBasedUpdater};
use crate::error::AgentError;
use crate::graph::{FnNode, Next, SendTask, StateGraph, END, START};
use crate::llm::{LlmClient, StructuredOutput};
use crate::message::Message;

use super::build;

/// Separator between chef sections in the final guide.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    pub ingredients: Vec<String>,
    /// Cuisine or cultural origin, e.g. "Italian".
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dishes {
    pub sections: Vec<Dish>,
}

impl Dishes {
    pub fn output() -> StructuredOutput<Dishes> {
        StructuredOutput::schema(
            "Dishes",
            "One section per dish the user wants to prepare",
            json!({
                "type": "object",
                "properties": {
                    "sections": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string", "description": "Dish name" },
                                "ingredients": {
                                    "type": "array",
                                    "items": { "type": "string" }
                                },
                                "location": {
                                    "type": "string",
                                    "description": "Cuisine or cultural origin of the dish"
                                }
                            },
                            "required": ["name", "ingredients", "location"]
                        }
                    }
                },
                "required": ["sections"]
            }),
        )
    }
}

/// Shared state. A chef task sees a sub-state with only `section` set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealState {
    pub meals: String,
    pub sections: Vec<Dish>,
    pub section: Option<Dish>,
    pub completed_menu: Vec<String>,
    pub final_meal_guide: String,
}

pub struct MealPlanner {
    llm: Arc<dyn LlmClient>,
    structured_llm: Arc<dyn LlmClient>,
}

impl MealPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            structured_llm: llm.clone(),
            llm,
        }
    }

    /// Client used by the orchestrator step; typically bound with [`Dishes::output`].
    pub fn with_structured_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.structured_llm = llm;
        self
    }

    pub async fn invoke(&self, meals: &str) -> Result<MealState, AgentError> {
        let updater = FieldBasedUpdater::new(|c: &mut MealState, u: &MealState| {
            merge_if_set(&mut c.meals, &u.meals);
            merge_if_set(&mut c.sections, &u.sections);
            append(&mut c.completed_menu, &u.completed_menu);
            merge_if_set(&mut c.final_meal_guide, &u.final_meal_guide);
        });
        let mut graph = StateGraph::<MealState>::new().with_state_updater(Arc::new(updater));

        let planner = self.structured_llm.clone();
        graph.add_node(
            "orchestrator",
            Arc::new(FnNode::new("orchestrator", move |s: MealState| {
                let llm = planner.clone();
                async move {
                    let messages = [
                        Message::system(
                            "You turn a list of meals into a grocery plan. For every meal give \
                             the dish name, the ingredients it needs and its cuisine of origin.",
                        ),
                        Message::user(format!("I would like to prepare: {}", s.meals)),
                    ];
                    let plan = Dishes::output().invoke(llm.as_ref(), &messages).await?;
                    if plan.sections.is_empty() {
                        return Err(AgentError::MalformedStructuredOutput(
                            "Dishes: plan has no dishes".to_string(),
                        ));
                    }
                    tracing::debug!(dishes = plan.sections.len(), "meal plan ready");
                    let delta = MealState {
                        sections: plan.sections,
                        ..MealState::default()
                    };
                    Ok((delta, Next::Continue))
                }
            })),
        );

        let chef = self.llm.clone();
        graph.add_node(
            "chef_worker",
            Arc::new(FnNode::new("chef_worker", move |s: MealState| {
                let llm = chef.clone();
                async move {
                    let dish = s.section.ok_or_else(|| {
                        AgentError::ExecutionFailed("chef_worker started without a dish".into())
                    })?;
                    let messages = [
                        Message::system(format!(
                            "You are a renowned chef from {} cuisine. Greet the reader with your \
                             name and background, then walk through preparing the dish step by \
                             step and explain the cooking process.",
                            dish.location
                        )),
                        Message::user(format!(
                            "I want to cook {}. Ingredients: {}.",
                            dish.name,
                            dish.ingredients.join(", ")
                        )),
                    ];
                    let reply = llm.invoke(&messages).await?;
                    let delta = MealState {
                        completed_menu: vec![reply.content],
                        ..MealState::default()
                    };
                    Ok((delta, Next::Continue))
                }
            })),
        );

        graph.add_node(
            "synthesizer",
            Arc::new(FnNode::new("synthesizer", |s: MealState| async move {
                let delta = MealState {
                    final_meal_guide: s.completed_menu.join(SECTION_SEPARATOR),
                    ..MealState::default()
                };
                Ok((delta, Next::Continue))
            })),
        );

        graph
            .add_edge(START, "orchestrator")
            .add_fan_out("orchestrator", Arc::new(assign_chefs), ["chef_worker"])
            .add_edge("chef_worker", "synthesizer")
            .add_edge("synthesizer", END);

        let state = MealState {
            meals: meals.to_string(),
            ..MealState::default()
        };
        build(graph)?.invoke(state, None).await
    }
}

fn assign_chefs(s: &MealState) -> Vec<SendTask<MealState>> {
    s.sections
        .iter()
        .map(|dish| {
            SendTask::new(
                "chef_worker",
                MealState {
                    section: Some(dish.clone()),
                    ..MealState::default()
                },
            )
        })
        .collect()
}
