//! skein CLI: argument parsing and one runner per subcommand.
//!
//! Settings come from the environment (after `skein_config::load_and_apply`), with
//! `--model` and `--max-iterations` taking precedence.

mod error;
pub mod logging;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use skein::tools::{ClothingTool, SumNumbersTool};
use skein::workflows::{
    AnswerQuestion, CoverLetterChain, Dishes, Evaluation, InvestmentPlanner, MealPlanner,
    PostRefiner, ReflexionAgent, ReviseAnswer, Route, TaskRouter, TranslationFanOut,
};
use skein::{
    math_registry, ChatOpenAI, LlmClient, Message, ReactAgent, RunConfig, RunSettings,
    TavilyClient, ToolLoop, ToolRegistry, ToolSource, WebSearchTool,
};

pub use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "skein")]
#[command(about = "Run LLM tool loops and agent workflows from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Chat model (default: OPENAI_MODEL or gpt-4o-mini)
    #[arg(long, global = true, value_name = "NAME")]
    pub model: Option<String>,

    /// Log to stderr at debug level (LOG_FILE still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Iteration budget for math, invest and reflexion
    #[arg(long, global = true, value_name = "N")]
    pub max_iterations: Option<usize>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Answer an arithmetic question with the manual tool loop
    Math { query: String },
    /// Run the ReAct agent with the clothing and web search tools
    React { query: String },
    /// Write a resume summary and a cover letter for a job description
    CoverLetter { job_description: String },
    /// Translate text into French, Spanish and Japanese in parallel
    Translate { text: String },
    /// Route a request to the summarizer or the translator
    Route { text: String },
    /// Plan meals: one chef per dish, then a combined guide
    Meals { meals: String },
    /// Draft and refine a LinkedIn post
    Post { request: String },
    /// Draft an investment plan until its risk grade matches the target
    Invest {
        profile: String,
        /// low, medium or high
        #[arg(long, default_value = "high")]
        target_grade: String,
    },
    /// Answer a question with research and self-critique
    Reflexion { question: String },
    /// Print the tool specs as JSON
    Tools,
}

impl Cli {
    /// Environment settings with CLI overrides applied.
    pub fn settings(&self) -> RunSettings {
        let mut settings = RunSettings::from_env();
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if self.max_iterations.is_some() {
            settings.max_iterations = self.max_iterations;
        }
        settings
    }
}

/// Runs one subcommand and returns what should be printed.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let settings = cli.settings();
    tracing::debug!(model = %settings.model, cmd = ?cli.cmd, "skein run");
    let chat = || Arc::new(ChatOpenAI::from_settings(&settings)) as Arc<dyn LlmClient>;

    match cli.cmd {
        Command::Math { query } => {
            let tools = Arc::new(math_tools());
            let llm = ChatOpenAI::from_settings(&settings).with_tools(tools.list());
            let mut tool_loop = ToolLoop::new(Arc::new(llm), tools);
            if let Some(n) = settings.max_iterations {
                tool_loop = tool_loop.with_max_iterations(n);
            }
            if let Some(timeout) = settings.call_timeout {
                tool_loop = tool_loop.with_call_timeout(timeout);
            }
            Ok(tool_loop.invoke(&query).await?)
        }
        Command::React { query } => {
            let tools = Arc::new(react_tools(&settings));
            let llm = ChatOpenAI::from_settings(&settings).with_tools(tools.list());
            let agent = ReactAgent::new(Arc::new(llm), tools)?
                .with_run_config(run_config(&settings).with_run_name("react"));
            Ok(agent.invoke(vec![Message::user(query)]).await?)
        }
        Command::CoverLetter { job_description } => {
            let out = CoverLetterChain::new(chat()).invoke(&job_description).await?;
            Ok(format!(
                "Resume summary:\n{}\n\nCover letter:\n{}",
                out.resume_summary, out.cover_letter
            ))
        }
        Command::Translate { text } => {
            let out = TranslationFanOut::new(chat()).invoke(&text).await?;
            Ok(out.combined_output)
        }
        Command::Route { text } => {
            let classifier = Route::output().bind(ChatOpenAI::from_settings(&settings));
            let out = TaskRouter::new(chat())
                .with_structured_llm(Arc::new(classifier))
                .invoke(&text)
                .await?;
            Ok(format!("[{}]\n{}", out.task_type, out.output))
        }
        Command::Meals { meals } => {
            let planner = Dishes::output().bind(ChatOpenAI::from_settings(&settings));
            let out = MealPlanner::new(chat())
                .with_structured_llm(Arc::new(planner))
                .invoke(&meals)
                .await?;
            Ok(out.final_meal_guide)
        }
        Command::Post { request } => {
            let out = PostRefiner::new(chat())
                .with_run_config(run_config(&settings).with_run_name("post"))
                .invoke(&request)
                .await?;
            Ok(out.latest_draft().unwrap_or_default().to_string())
        }
        Command::Invest {
            profile,
            target_grade,
        } => {
            let grader = Evaluation::output().bind(ChatOpenAI::from_settings(&settings));
            let mut planner = InvestmentPlanner::new(chat())
                .with_structured_llm(Arc::new(grader))
                .with_target_grade(target_grade)?
                .with_run_config(run_config(&settings).with_run_name("invest"));
            if let Some(n) = settings.max_iterations {
                planner = planner.with_max_iterations(iteration_budget(n)?);
            }
            let out = planner.invoke(&profile).await?;
            Ok(format!(
                "Target grade: {}\nFinal grade: {}\nIterations: {}\n\nFeedback:\n{}\n\nPlan:\n{}",
                out.target_grade, out.grade, out.n, out.feedback, out.investment_plan
            ))
        }
        Command::Reflexion { question } => {
            let key = settings
                .tavily_api_key
                .clone()
                .ok_or(CliError::MissingKey("TAVILY_API_KEY"))?;
            let respond = AnswerQuestion::output().bind(ChatOpenAI::from_settings(&settings));
            let revise = ReviseAnswer::output().bind(ChatOpenAI::from_settings(&settings));
            let mut agent = ReflexionAgent::new(chat(), Arc::new(TavilyClient::new(key)))
                .with_llms(Arc::new(respond), Arc::new(revise))
                .with_run_config(run_config(&settings).with_run_name("reflexion"));
            if let Some(n) = settings.max_iterations {
                agent = agent.with_max_iterations(iteration_budget(n)?);
            }
            let out = agent.invoke(&question).await?;
            let answer = out.final_answer().unwrap_or_default();
            let mut text = answer.base.answer;
            if !answer.references.is_empty() {
                text.push_str("\n\nReferences:\n");
                text.push_str(&answer.references.join("\n"));
            }
            Ok(text)
        }
        Command::Tools => tools_json(&settings).await,
    }
}

/// Arithmetic tools plus `sum_numbers`.
pub fn math_tools() -> ToolRegistry {
    math_registry().with_tool(SumNumbersTool)
}

/// Clothing tool, plus web search when a Tavily key is configured.
pub fn react_tools(settings: &RunSettings) -> ToolRegistry {
    let registry = ToolRegistry::new().with_tool(ClothingTool);
    match &settings.tavily_api_key {
        Some(key) => {
            registry.with_tool(WebSearchTool::new(Arc::new(TavilyClient::new(key.clone()))))
        }
        None => {
            tracing::warn!("TAVILY_API_KEY not set; react runs without web search");
            registry
        }
    }
}

/// Every tool the CLI can hand to a model, grouped by subcommand.
pub async fn tools_json(settings: &RunSettings) -> Result<String, CliError> {
    let math = math_tools().list_tools().await?;
    let react = react_tools(settings).list_tools().await?;
    Ok(serde_json::to_string_pretty(&json!({
        "math": math,
        "react": react,
    }))?)
}

fn iteration_budget(n: usize) -> Result<u32, CliError> {
    u32::try_from(n).map_err(|_| CliError::InvalidArg {
        flag: "--max-iterations",
        reason: format!("{} does not fit in u32", n),
    })
}

fn run_config(settings: &RunSettings) -> RunConfig {
    let mut config = RunConfig::default();
    if let Some(limit) = settings.recursion_limit {
        config = config.with_recursion_limit(limit);
    }
    if let Some(timeout) = settings.call_timeout {
        config = config.with_node_timeout(timeout);
    }
    config
}
