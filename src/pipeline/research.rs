//! Phase 1: one independent analysis per instrument, run in bounded waves.
//! A failed instrument is recorded and never cancels its siblings.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::ResearchAgent;
use crate::constants::events;
use crate::storage::Persistence;

use super::types::{
    AnalysisKind, Instrument, PortfolioContext, ResearchFailure, SymbolAnalysisResult,
};

pub struct ResearchCoordinator {
    agent: Arc<dyn ResearchAgent>,
    store: Arc<dyn Persistence>,
    /// Instruments researched concurrently per wave
    batch_size: usize,
}

/// Phase 1 coverage: successful results over distinct instruments attempted.
pub fn success_rate(results: usize, attempted: usize) -> f64 {
    if attempted == 0 {
        return 0.0;
    }
    results as f64 / attempted as f64
}

/// Holdings first, then watchlist names not already covered by a holding.
/// Deduplication is by symbol; holdings take precedence.
pub fn collect_instruments(portfolio: &PortfolioContext, watchlist: &[String]) -> Vec<Instrument> {
    let mut instruments: Vec<Instrument> = Vec::new();

    for position in &portfolio.positions {
        if !instruments.iter().any(|i| i.symbol == position.symbol) {
            instruments.push(Instrument {
                symbol: position.symbol.clone(),
                kind: AnalysisKind::Holding,
            });
        }
    }

    for symbol in watchlist {
        if !instruments.iter().any(|i| &i.symbol == symbol) {
            instruments.push(Instrument {
                symbol: symbol.clone(),
                kind: AnalysisKind::Watchlist,
            });
        }
    }

    instruments
}

impl ResearchCoordinator {
    pub fn new(
        agent: Arc<dyn ResearchAgent>,
        store: Arc<dyn Persistence>,
        batch_size: usize,
    ) -> Self {
        Self {
            agent,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Research every instrument in waves of `batch_size`. The whole wave is
    /// awaited before the next starts; within a wave tasks run concurrently
    /// and fail independently.
    pub async fn run(
        &self,
        account: &str,
        instruments: &[Instrument],
        portfolio: &PortfolioContext,
    ) -> (Vec<SymbolAnalysisResult>, Vec<ResearchFailure>) {
        let mut results: Vec<SymbolAnalysisResult> = Vec::new();
        let mut failures: Vec<ResearchFailure> = Vec::new();

        for (wave, chunk) in instruments.chunks(self.batch_size).enumerate() {
            info!(
                "🔎 [RESEARCH] Wave {}: {} instrument(s)",
                wave + 1,
                chunk.len()
            );

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|instrument| self.research_one(account, instrument, portfolio)),
            )
            .await;

            for outcome in outcomes {
                match outcome {
                    Ok(result) => {
                        info!(
                            event = events::RESEARCH_COMPLETED,
                            "✅ [RESEARCH] {} analyzed", result.symbol
                        );
                        results.push(result);
                    }
                    Err(failure) => {
                        warn!(
                            event = events::RESEARCH_FAILED,
                            "❌ [RESEARCH] {} failed: {}", failure.symbol, failure.error
                        );
                        failures.push(failure);
                    }
                }
            }
        }

        (results, failures)
    }

    async fn research_one(
        &self,
        account: &str,
        instrument: &Instrument,
        portfolio: &PortfolioContext,
    ) -> Result<SymbolAnalysisResult, ResearchFailure> {
        let context = Self::instrument_context(instrument, portfolio);

        let analysis = self
            .agent
            .research(instrument, &context)
            .await
            .map_err(|e| ResearchFailure {
                symbol: instrument.symbol.clone(),
                error: e.to_string(),
            })?;

        // Each report lands in the instrument's conversation under the
        // system portfolio account; the ids ride on the result for order
        // linkage later.
        let stored = self
            .store
            .append_research_message(account, &instrument.symbol, &analysis)
            .await
            .map_err(|e| ResearchFailure {
                symbol: instrument.symbol.clone(),
                error: e.to_string(),
            })?;

        Ok(SymbolAnalysisResult {
            symbol: instrument.symbol.clone(),
            kind: instrument.kind,
            analysis,
            analysis_id: Uuid::new_v4().to_string(),
            conversation_id: stored.conversation_id,
            message_id: stored.message_id,
        })
    }

    /// Only this instrument's slice of the portfolio: research is
    /// deliberately context-free so each report stands on its own.
    fn instrument_context(instrument: &Instrument, portfolio: &PortfolioContext) -> String {
        match portfolio.position(&instrument.symbol) {
            Some(position) => format!(
                "Position: {} share(s), market value ${:.2}, unrealized P/L {:.2}%",
                position.quantity, position.market_value, position.unrealized_pl_percent
            ),
            None => "Not currently held; under watchlist review".to_string(),
        }
    }
}
