//! Application-wide constants and magic numbers
//!
//! Centralizes hardcoded values so pipeline tuning happens in one place.

/// Research phase constants
pub mod research {
    /// Instruments analyzed concurrently per wave
    pub const DEFAULT_BATCH_SIZE: usize = 5;

    /// Minimum Phase 1 success rate before synthesis is allowed (0.0 - 1.0)
    pub const DEFAULT_MIN_SUCCESS_RATE: f64 = 0.8;
}

/// Planner constants
pub mod planner {
    /// Estimated share price for buys with no existing position.
    /// Real-time pricing happens at the venue; this only sizes the estimate.
    pub const PRICE_PLACEHOLDER: f64 = 100.0;

    /// Tolerance when comparing scaled buy totals against available capital
    pub const ROUNDING_TOLERANCE: f64 = 0.01;
}

/// Account scoping
pub mod accounts {
    /// System-level account that owns the per-instrument research
    /// conversations (research is context-free, not user-scoped)
    pub const SYSTEM_PORTFOLIO_ACCOUNT: &str = "system-portfolio";
}

/// Logging event names for structured logging
pub mod events {
    pub const RESEARCH_COMPLETED: &str = "research_completed";
    pub const RESEARCH_FAILED: &str = "research_failed";
    pub const GATE_FAILED: &str = "gate_failed";
    pub const DECISIONS_SYNTHESIZED: &str = "decisions_synthesized";
    pub const ORDER_PLACED: &str = "order_placed";
    pub const ORDER_FAILED: &str = "order_failed";
    pub const ORDER_SKIPPED: &str = "order_skipped";
    pub const RUN_COMPLETED: &str = "run_completed";
}
