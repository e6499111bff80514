//! Typed errors for the review pipeline.
//!
//! The taxonomy deliberately separates three kinds of "it didn't happen":
//! `SkipReason` (expected, counted, never an error — lives in
//! `pipeline::types`), recoverable errors (a later run may succeed), and
//! fatal errors (abort the current user's run). Callers check
//! `PipelineError::severity` instead of guessing from the variant.

use thiserror::Error;

/// How bad a pipeline error is for the current user's run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Worth logging; a later run may succeed without intervention.
    Recoverable,
    /// Aborts the remaining phases for this user.
    Fatal,
}

/// Top-level pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("research coverage {achieved:.0}% below required {required:.0}%")]
    ResearchGate { achieved: f64, required: f64 },

    #[error("decision synthesis failed: {0}")]
    Synthesis(String),

    #[error("decision model returned no decisions")]
    EmptySynthesis,

    #[error("invalid decision for {symbol}: {reason}")]
    InvalidDecision { symbol: String, reason: String },

    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("trading venue error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn severity(&self) -> Severity {
        match self {
            // Gate and synthesis failures end the user's run: decisions must
            // be holistic or not made at all.
            PipelineError::ResearchGate { .. }
            | PipelineError::Synthesis(_)
            | PipelineError::EmptySynthesis
            | PipelineError::InvalidDecision { .. }
            | PipelineError::Config(_) => Severity::Fatal,
            PipelineError::Llm(_)
            | PipelineError::Exchange(_)
            | PipelineError::Storage(_) => Severity::Recoverable,
        }
    }
}

/// Trading venue errors.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("order rejected: {reason}")]
    OrderRejected { reason: String },

    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("no credentials configured for user {user_id}")]
    UnknownUser { user_id: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// Persistence-layer errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
