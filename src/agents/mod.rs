pub mod analyst;
pub mod strategist;

use async_trait::async_trait;
use tracing::info;

use crate::error::PipelineError;
use crate::llm::{LLMQueue, Priority};
use crate::pipeline::types::Instrument;

pub trait Agent {
    fn name(&self) -> &str;
    fn system_prompt(&self) -> &str;

    /// Run the agent with normal priority (per-instrument research)
    async fn run(&self, query: &str, llm: &LLMQueue) -> Result<String, PipelineError> {
        self.run_with_priority(query, llm, Priority::Normal).await
    }

    /// Run the agent with high priority (the one synthesis call per run)
    async fn run_high_priority(&self, query: &str, llm: &LLMQueue) -> Result<String, PipelineError> {
        self.run_with_priority(query, llm, Priority::High).await
    }

    async fn run_with_priority(
        &self,
        query: &str,
        llm: &LLMQueue,
        priority: Priority,
    ) -> Result<String, PipelineError> {
        info!("🤖 [AGENT] Sending {:?} priority request to {}", priority, self.name());
        let response = llm.chat(self.system_prompt(), query, priority).await?;
        info!("🤖 [AGENT] {} responded ({} chars)", self.name(), response.len());
        Ok(response)
    }
}

/// The research collaborator the pipeline depends on. Production uses the
/// LLM-backed implementation below; tests substitute a scripted one.
#[async_trait]
pub trait ResearchAgent: Send + Sync {
    /// Independent, context-free analysis of one instrument.
    async fn research(&self, instrument: &Instrument, context: &str)
        -> Result<String, PipelineError>;

    /// One holistic pass over all research plus portfolio state.
    async fn synthesize(&self, prompt: &str) -> Result<String, PipelineError>;
}

pub struct LlmResearchAgent {
    llm: LLMQueue,
}

impl LlmResearchAgent {
    pub fn new(llm: LLMQueue) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ResearchAgent for LlmResearchAgent {
    async fn research(
        &self,
        instrument: &Instrument,
        context: &str,
    ) -> Result<String, PipelineError> {
        let query = format!(
            "Instrument: {}\nCoverage: {}\n\n{}",
            instrument.symbol, instrument.kind, context
        );
        analyst::AnalystAgent.run(&query, &self.llm).await
    }

    async fn synthesize(&self, prompt: &str) -> Result<String, PipelineError> {
        strategist::StrategistAgent
            .run_high_priority(prompt, &self.llm)
            .await
    }
}
