//! Data model for the review pipeline. Everything here is plain data:
//! created by one phase, consumed read-only by the next.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::exchange::types::{AccountSummary, Position, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Holding,
    Watchlist,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::Holding => write!(f, "holding"),
            AnalysisKind::Watchlist => write!(f, "watchlist"),
        }
    }
}

/// One instrument queued for research.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    pub symbol: String,
    pub kind: AnalysisKind,
}

/// Immutable output of one instrument's research. Produced once per run,
/// consumed by the synthesizer and, for order linkage, the executor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolAnalysisResult {
    pub symbol: String,
    pub kind: AnalysisKind,
    pub analysis: String,
    pub analysis_id: String,
    pub conversation_id: String,
    pub message_id: String,
}

/// Research that did not produce a result. Recorded, never raised.
#[derive(Clone, Debug)]
pub struct ResearchFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Swap,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradingDecision {
    pub symbol: String,
    pub action: Action,
    /// Percent of buying power (BUY) or held quantity (SELL). None iff HOLD.
    pub position_size_percent: Option<u8>,
    #[serde(default)]
    pub swap_from_symbol: Option<String>,
    pub confidence: u8,
    #[serde(default)]
    pub reasoning_summary: String,
}

impl TradingDecision {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |reason: &str| PipelineError::InvalidDecision {
            symbol: self.symbol.clone(),
            reason: reason.to_string(),
        };

        match (self.action, self.position_size_percent) {
            (Action::Hold, Some(_)) => {
                return Err(invalid("HOLD must not carry a position size"))
            }
            (Action::Hold, None) => {}
            (_, None) => return Err(invalid("position_size_percent is required")),
            (_, Some(pct)) if pct < 1 || pct > 100 => {
                return Err(invalid("position_size_percent must be 1-100"))
            }
            _ => {}
        }

        if self.confidence < 1 || self.confidence > 10 {
            return Err(invalid("confidence must be 1-10"));
        }

        Ok(())
    }
}

/// The synthesizer's full response.
#[derive(Clone, Debug, Deserialize)]
pub struct DecisionBatch {
    #[serde(default)]
    pub portfolio_assessment: String,
    pub decisions: Vec<TradingDecision>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub symbol: String,
    /// Signed; negative = short
    pub quantity: f64,
    /// Signed to match quantity
    pub market_value: f64,
    pub unrealized_pl_percent: f64,
    pub avg_entry_price: Option<f64>,
}

/// Point-in-time account snapshot. Fetched once per user per run and never
/// mutated; the staleness window until execution is accepted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioContext {
    pub total_equity: f64,
    pub buying_power: f64,
    pub cash: f64,
    pub positions: Vec<PortfolioPosition>,
}

impl PortfolioContext {
    pub fn from_snapshot(account: &AccountSummary, positions: &[Position]) -> Self {
        Self {
            total_equity: account.equity,
            buying_power: account.buying_power,
            cash: account.cash,
            positions: positions
                .iter()
                .map(|p| PortfolioPosition {
                    symbol: p.symbol.clone(),
                    quantity: p.qty,
                    market_value: p.market_value,
                    unrealized_pl_percent: p.unrealized_pl_percent,
                    avg_entry_price: p.avg_entry_price,
                })
                .collect(),
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&PortfolioPosition> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}

/// Why a decision produced no order. Counted in the plan, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPosition,
    MissingSizePercent,
    UnderOneShare,
    MissingSwapSource,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPosition => write!(f, "no position held"),
            SkipReason::MissingSizePercent => write!(f, "no position size given"),
            SkipReason::UnderOneShare => write!(f, "computed size under one share"),
            SkipReason::MissingSwapSource => write!(f, "swap has no source symbol"),
        }
    }
}

/// One order in an execution plan. Created by the planner, consumed
/// read-only by the executor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizedOrder {
    pub symbol: String,
    pub side: Side,
    pub shares: u64,
    pub estimated_price: f64,
    pub estimated_cost: f64,
    pub original_size_percent: u8,
    /// Set only when proportional scaling was applied
    pub adjusted_size_percent: Option<u8>,
    /// Unique, ascending; covers < sells < buys
    pub priority: u32,
    pub skip_reason: Option<SkipReason>,
    /// Buy order that closes a short position
    pub is_cover: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderExecutionPlan {
    pub orders: Vec<OptimizedOrder>,
    pub total_sell_proceeds: f64,
    pub total_buy_cost: f64,
    /// Always buying_power + total_sell_proceeds
    pub available_buying_power: f64,
    pub scaling_applied: bool,
    pub scaling_factor: Option<f64>,
    pub orders_skipped: u32,
    pub notes: String,
}

/// Write-once summary of one executor run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub executed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total_orders: u32,
    /// Reason tag when the executor refused to start (venue unavailable)
    pub halted: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub research_completed: u32,
    pub research_failed: u32,
    pub decisions_made: u32,
    pub orders_executed: u32,
    pub orders_failed: u32,
    pub orders_skipped: u32,
    pub duration_secs: f64,
}

/// Per-run summary persisted after all users are processed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub users_analyzed: u32,
    pub portfolios_analyzed: u32,
    pub errors: Vec<String>,
    pub metrics: RunMetrics,
}
