//! The SEO blog pipeline: Trend Scout → Topical Architect → SEO Wordsmith.
//!
//! The scout researches the product with both data tools and hands off to the
//! architect, who picks a single angle and hands off to the wordsmith, who
//! writes the finished post. Only the wordsmith is meant to answer the user.

use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::agent::Agent;
use crate::chat::ChatService;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::handoff::Handoff;
use crate::model::{ModelProvider, OpenAIProvider};
use crate::registry::AgentRegistry;
use crate::runner::{Orchestrator, RunConfig};
use crate::session::InMemorySessionStore;
use crate::tool::ToolRegistry;
use crate::tools::{KeywordDataTool, SearchTool, KEYWORD_TOOL, SEARCH_TOOL};

pub const TREND_SCOUT: &str = "Trend Scout";
pub const TOPICAL_ARCHITECT: &str = "Topical Architect";
pub const SEO_WORDSMITH: &str = "SEO Wordsmith";

pub const TREND_SCOUT_INSTRUCTIONS: &str = r#"You are a Consumer Behavior Specialist. Find out what REAL people think about the product: look past the specs for the 'vibe' and the 'friction'.

WORKFLOW:
1. BROAD SEARCH: search the product name to pin down its category.
2. HUMAN QUERIES: call `search_tool` with queries a shopper would type, for example:
   - "[Product Name] real world review reddit"
   - "[Product Name] vs" (to surface competitors)
   - "Common problems with [Product Name]"
   - "Is [Product Name] worth it for [Target Audience]?"
3. KEYWORD DATA: call `keyword_data_tool` for broad category terms (for a Mastela swing: 'electric baby swing', 'baby bassinet').
4. ANALYSIS: note
   - PRAISES: what people love ('saved my sleep').
   - PAIN POINTS: what annoys them ('motor is loud', 'short cord').
   - COMPETITION: the main rival.
5. HANDOFF: summarise these human insights and hand off to the Topical Architect.

CRITICAL:
- Do NOT answer the user.
- Your final action in every run MUST be the handoff to the Topical Architect."#;

pub const TOPICAL_ARCHITECT_INSTRUCTIONS: &str = r#"You are the Decision Maker. Turn the research into a blog structure IMMEDIATELY.

1. DATA REVIEW: read the search results gathered by the Scout (common problems, local brands, reviews).
2. IGNORE MISSING DATA: if keyword volume is unavailable, do NOT ask for more searches; work with the snippets you have.
3. SELECT ONE ANGLE, for example:
   - 'The Ultimate Maintenance Guide' (built on the problems and fixes found)
   - '<Brand> vs <Rival>: The Battle' (built on the competitors found)
4. HANDOFF: pass your chosen title and your reasoning to the SEO Wordsmith.

Do NOT answer the user. You must hand off to the SEO Wordsmith now, with no excuses."#;

pub const SEO_WORDSMITH_INSTRUCTIONS: &str = r#"You are a Master Content Writer who writes like a helpful friend, not a manual.

Pick the writing style that fits the research:
- ANGLE: open with a relatable struggle instead of a feature list.
- COMPARISONS: use the competition found by the Scout to show where this product wins or loses.
- HONESTY: include a Pros & Cons section built from the pain points. Readers trust reviews that admit flaws.

STRUCTURE (adapt every heading to the product; never paste these labels verbatim):
1. A catchy H1 matching the product persona and the research.
2. An intro following Problem, Agitation, Solution.
3. An H2 on how it stacks up against the rivals found in research.
4. A 'real talk' H2 covering common problems and how to fix them.
5. A final verdict: "Buy this if..." or "Skip this if...".

CRITICAL:
- Do not merely confirm the handoff.
- Do not say you are working on it.
- Your response MUST be the full, finished blog post."#;

/// The three pipeline agents, scout first.
pub fn seo_agents() -> Vec<Agent> {
    vec![
        Agent::simple(TREND_SCOUT, TREND_SCOUT_INSTRUCTIONS)
            .with_tools([SEARCH_TOOL, KEYWORD_TOOL])
            .with_handoff(Handoff::to(
                TOPICAL_ARCHITECT,
                "Turns the research into one blog angle and outline.",
            )),
        Agent::simple(TOPICAL_ARCHITECT, TOPICAL_ARCHITECT_INSTRUCTIONS).with_handoff(
            Handoff::to(SEO_WORDSMITH, "Writes the finished blog post."),
        ),
        Agent::simple(SEO_WORDSMITH, SEO_WORDSMITH_INSTRUCTIONS),
    ]
}

/// Register the search and keyword tools with a shared HTTP client.
pub fn build_tool_registry(config: &RelayConfig) -> Result<ToolRegistry> {
    let client = Client::new();
    ToolRegistry::new()
        .with(
            SearchTool::with_client(client.clone(), config.search.clone())
                .into_invoker(config.tool_timeout())?,
        )?
        .with(
            KeywordDataTool::with_client(client, config.keywords.clone())
                .into_invoker(config.tool_timeout())?,
        )
}

/// Validate and assemble the agent graph with the scout as entry.
pub fn build_registry(config: &RelayConfig, tools: ToolRegistry) -> Result<AgentRegistry> {
    AgentRegistry::builder(tools)
        .agents(seo_agents())
        .entry(TREND_SCOUT)
        .default_model(config.model.clone())
        .default_temperature(config.temperature)
        .build()
}

/// Wire the whole pipeline around an arbitrary model binding.
pub fn build_chat_service(
    config: &RelayConfig,
    provider: Arc<dyn ModelProvider>,
) -> Result<ChatService> {
    let registry = build_registry(config, build_tool_registry(config)?)?;
    info!(
        agents = registry.len(),
        tools = registry.tools().len(),
        model = %config.model,
        "Pipeline assembled"
    );
    let orchestrator = Orchestrator::new(Arc::new(registry), provider, RunConfig::from(config));
    Ok(ChatService::new(
        Arc::new(orchestrator),
        Arc::new(InMemorySessionStore::new()),
        config.model.clone(),
    ))
}

impl ChatService {
    /// Production wiring: validated config, OpenAI binding, in-memory sessions.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        config.validate()?;
        let provider = OpenAIProvider::new(config.openai_api_key.as_deref());
        build_chat_service(config, Arc::new(provider))
    }
}
