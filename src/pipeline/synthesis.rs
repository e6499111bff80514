//! Phase 2: one holistic strategist call over every research report plus the
//! portfolio snapshot, parsed into a typed decision batch. Decisions are
//! structured JSON end to end; there is no free-text fallback path.

use std::sync::Arc;

use tracing::info;

use crate::agents::ResearchAgent;
use crate::constants::events;
use crate::error::PipelineError;

use super::types::{DecisionBatch, PortfolioContext, SymbolAnalysisResult};

pub struct DecisionSynthesizer {
    agent: Arc<dyn ResearchAgent>,
}

impl DecisionSynthesizer {
    pub fn new(agent: Arc<dyn ResearchAgent>) -> Self {
        Self { agent }
    }

    pub async fn synthesize(
        &self,
        results: &[SymbolAnalysisResult],
        portfolio: &PortfolioContext,
    ) -> Result<DecisionBatch, PipelineError> {
        let prompt = Self::compose_prompt(results, portfolio);

        let response = self.agent.synthesize(&prompt).await?;

        let json = extract_json(&response).unwrap_or(&response);
        let batch: DecisionBatch = serde_json::from_str(json)
            .map_err(|e| PipelineError::Synthesis(format!("unparseable decision JSON: {}", e)))?;

        if batch.decisions.is_empty() {
            return Err(PipelineError::EmptySynthesis);
        }
        for decision in &batch.decisions {
            decision.validate()?;
        }

        info!(
            event = events::DECISIONS_SYNTHESIZED,
            "🧠 [DECIDE] {} decision(s) synthesized",
            batch.decisions.len()
        );

        Ok(batch)
    }

    fn compose_prompt(results: &[SymbolAnalysisResult], portfolio: &PortfolioContext) -> String {
        let mut prompt = format!(
            "PORTFOLIO STATE\nTotal equity: ${:.2}\nBuying power: ${:.2}\nCash: ${:.2}\nPositions:\n",
            portfolio.total_equity, portfolio.buying_power, portfolio.cash
        );
        if portfolio.positions.is_empty() {
            prompt.push_str("  (none)\n");
        }
        for position in &portfolio.positions {
            prompt.push_str(&format!(
                "  {}: {} share(s), market value ${:.2}, unrealized P/L {:.2}%\n",
                position.symbol,
                position.quantity,
                position.market_value,
                position.unrealized_pl_percent
            ));
        }

        prompt.push_str("\nRESEARCH REPORTS\n");
        for result in results {
            prompt.push_str(&format!(
                "--- {} ({}) ---\n{}\n\n",
                result.symbol, result.kind, result.analysis
            ));
        }

        let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        prompt.push_str(&format!(
            "Produce exactly one decision for each of these symbols: {}",
            symbols.join(", ")
        ));

        prompt
    }
}

/// Slice out the outermost JSON object; models love wrapping JSON in prose
/// or markdown fences.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Action, AnalysisKind, Instrument};
    use async_trait::async_trait;

    struct ScriptedAgent {
        response: String,
    }

    #[async_trait]
    impl ResearchAgent for ScriptedAgent {
        async fn research(
            &self,
            _instrument: &Instrument,
            _context: &str,
        ) -> Result<String, PipelineError> {
            Ok("unused".to_string())
        }

        async fn synthesize(&self, _prompt: &str) -> Result<String, PipelineError> {
            Ok(self.response.clone())
        }
    }

    fn portfolio() -> PortfolioContext {
        PortfolioContext {
            total_equity: 10_000.0,
            buying_power: 5_000.0,
            cash: 5_000.0,
            positions: vec![],
        }
    }

    fn analysis(symbol: &str) -> SymbolAnalysisResult {
        SymbolAnalysisResult {
            symbol: symbol.to_string(),
            kind: AnalysisKind::Holding,
            analysis: "stable".to_string(),
            analysis_id: "a1".to_string(),
            conversation_id: "c1".to_string(),
            message_id: "m1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_parses_fenced_json_response() {
        let agent = ScriptedAgent {
            response: r#"Here is my review:
```json
{"portfolio_assessment": "Balanced.", "decisions": [
  {"symbol": "AAPL", "action": "BUY", "position_size_percent": 20, "confidence": 7, "reasoning_summary": "ok"}
]}
```"#
                .to_string(),
        };

        let synthesizer = DecisionSynthesizer::new(Arc::new(agent));
        let batch = synthesizer
            .synthesize(&[analysis("AAPL")], &portfolio())
            .await
            .unwrap();

        assert_eq!(batch.decisions.len(), 1);
        assert_eq!(batch.decisions[0].action, Action::Buy);
        assert_eq!(batch.portfolio_assessment, "Balanced.");
    }

    #[tokio::test]
    async fn test_rejects_non_json_response() {
        let agent = ScriptedAgent {
            response: "I think you should buy AAPL".to_string(),
        };

        let synthesizer = DecisionSynthesizer::new(Arc::new(agent));
        let err = synthesizer
            .synthesize(&[analysis("AAPL")], &portfolio())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty_decisions() {
        let agent = ScriptedAgent {
            response: r#"{"portfolio_assessment": "nothing", "decisions": []}"#.to_string(),
        };

        let synthesizer = DecisionSynthesizer::new(Arc::new(agent));
        let err = synthesizer
            .synthesize(&[analysis("AAPL")], &portfolio())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptySynthesis));
    }

    #[tokio::test]
    async fn test_rejects_invalid_decision() {
        // HOLD with a position size violates the decision contract
        let agent = ScriptedAgent {
            response: r#"{"decisions": [
              {"symbol": "AAPL", "action": "HOLD", "position_size_percent": 50, "confidence": 5}
            ]}"#
            .to_string(),
        };

        let synthesizer = DecisionSynthesizer::new(Arc::new(agent));
        let err = synthesizer
            .synthesize(&[analysis("AAPL")], &portfolio())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidDecision { .. }));
    }
}
