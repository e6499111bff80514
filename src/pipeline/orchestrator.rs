//! Drives the three phases per tracked user and isolates failures: one
//! user's bad run never stops the fleet. Phases are explicit collaborators
//! owned by the orchestrator and called in sequence on immutable data.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::ResearchAgent;
use crate::config::{AppConfig, TrackedUser};
use crate::constants::{accounts, events};
use crate::error::{PipelineError, Severity};
use crate::exchange::traits::TradingApi;
use crate::storage::Persistence;

use super::executor::OrderExecutor;
use super::planner::ExecutionPlanner;
use super::research::{collect_instruments, success_rate, ResearchCoordinator};
use super::synthesis::DecisionSynthesizer;
use super::types::{PortfolioContext, RunMetrics, RunRecord, SymbolAnalysisResult};

pub struct PipelineOrchestrator {
    config: AppConfig,
    research: ResearchCoordinator,
    synthesizer: DecisionSynthesizer,
    planner: ExecutionPlanner,
    executor: OrderExecutor,
    trading: Option<Arc<dyn TradingApi>>,
    store: Arc<dyn Persistence>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: AppConfig,
        agent: Arc<dyn ResearchAgent>,
        trading: Option<Arc<dyn TradingApi>>,
        store: Arc<dyn Persistence>,
    ) -> Self {
        let research = ResearchCoordinator::new(
            agent.clone(),
            store.clone(),
            config.pipeline.research_batch_size,
        );
        let synthesizer = DecisionSynthesizer::new(agent);
        let planner = ExecutionPlanner::default();
        let executor = OrderExecutor::new(trading.clone(), store.clone());

        Self {
            config,
            research,
            synthesizer,
            planner,
            executor,
            trading,
            store,
        }
    }

    /// Process every tracked user, then persist the run summary. Always
    /// returns a record; per-user failures are collected, not propagated.
    pub async fn run(&self) -> RunRecord {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now().to_rfc3339();
        let clock = Instant::now();

        info!("▶️ [RUN {}] Reviewing {} user(s)", run_id, self.config.users.len());

        let mut metrics = RunMetrics::default();
        let mut errors: Vec<String> = Vec::new();
        let mut users_analyzed: u32 = 0;
        let mut portfolios_analyzed: u32 = 0;

        for user in &self.config.users {
            users_analyzed += 1;
            match self.run_user(user, &mut metrics).await {
                Ok(()) => portfolios_analyzed += 1,
                Err(e) => {
                    match e.severity() {
                        Severity::Fatal => {
                            error!("❌ [RUN] User {} aborted: {}", user.id, e)
                        }
                        Severity::Recoverable => {
                            warn!("⚠️ [RUN] User {} failed: {}", user.id, e)
                        }
                    }
                    errors.push(format!("{}: {}", user.id, e));
                }
            }
        }

        metrics.duration_secs = clock.elapsed().as_secs_f64();

        let record = RunRecord {
            run_id: run_id.clone(),
            started_at,
            completed_at: Utc::now().to_rfc3339(),
            users_analyzed,
            portfolios_analyzed,
            errors,
            metrics,
        };

        // A failed summary write must not retroactively fail a finished run.
        if let Err(e) = self.store.save_run_record(&record).await {
            error!("❌ [RUN {}] Failed to persist run record: {}", run_id, e);
        }

        info!(
            event = events::RUN_COMPLETED,
            "🏁 [RUN {}] {} user(s), {} error(s), {:.1}s",
            run_id,
            record.users_analyzed,
            record.errors.len(),
            record.metrics.duration_secs
        );

        record
    }

    async fn run_user(
        &self,
        user: &TrackedUser,
        metrics: &mut RunMetrics,
    ) -> Result<(), PipelineError> {
        let Some(trading) = &self.trading else {
            return Err(PipelineError::Config(
                "no trading venue configured".to_string(),
            ));
        };

        // Point-in-time snapshot; everything downstream reads this copy.
        let account = trading.get_account(&user.id).await?;
        let positions = trading.get_positions(&user.id).await?;
        let portfolio = PortfolioContext::from_snapshot(&account, &positions);

        let mut instruments = collect_instruments(&portfolio, &user.watchlist);
        if let Some(filter) = &self.config.pipeline.symbol_filter {
            instruments.retain(|i| filter.contains(&i.symbol));
            info!(
                "🧪 [RUN] Dev symbol filter active, {} instrument(s) remain",
                instruments.len()
            );
        }

        if instruments.is_empty() {
            self.notice(&user.id, "Portfolio review skipped: nothing held or watched")
                .await;
            info!("ℹ️ [RUN] User {} has nothing to analyze", user.id);
            return Ok(());
        }

        // Phase 1: research
        let (results, failures) = self
            .research
            .run(accounts::SYSTEM_PORTFOLIO_ACCOUNT, &instruments, &portfolio)
            .await;
        metrics.research_completed += results.len() as u32;
        metrics.research_failed += failures.len() as u32;

        // Gate: decisions must be holistic or not made at all.
        let rate = success_rate(results.len(), instruments.len());
        let required = self.config.pipeline.min_research_success_rate;
        if rate < required {
            warn!(
                event = events::GATE_FAILED,
                "🚧 [GATE] User {}: coverage {:.0}% below {:.0}%",
                user.id,
                rate * 100.0,
                required * 100.0
            );
            self.notice(
                &user.id,
                &format!(
                    "Portfolio review aborted: only {} of {} instruments analyzed ({:.0}% coverage, {:.0}% required)",
                    results.len(),
                    instruments.len(),
                    rate * 100.0,
                    required * 100.0
                ),
            )
            .await;
            return Err(PipelineError::ResearchGate {
                achieved: rate * 100.0,
                required: required * 100.0,
            });
        }

        // Phase 2: one holistic decision pass
        let batch = match self.synthesizer.synthesize(&results, &portfolio).await {
            Ok(batch) => batch,
            Err(e) => {
                self.notice(
                    &user.id,
                    &format!("Portfolio review aborted: decision synthesis failed ({})", e),
                )
                .await;
                return Err(e);
            }
        };
        metrics.decisions_made += batch.decisions.len() as u32;

        // The prompt demands one decision per analyzed symbol; surface any
        // gap rather than failing the run over it.
        for result in &results {
            if !batch.decisions.iter().any(|d| d.symbol == result.symbol) {
                warn!("⚠️ [DECIDE] No decision returned for {}", result.symbol);
            }
        }

        if !batch.portfolio_assessment.is_empty() {
            self.notice(&user.id, &batch.portfolio_assessment).await;
        }

        // Phase 3: plan and execute
        let Some(plan) = self.planner.build_plan(&batch.decisions, &portfolio) else {
            info!("ℹ️ [RUN] User {}: no decisions to execute", user.id);
            return Ok(());
        };
        metrics.orders_skipped += plan.orders_skipped;
        self.notice(&user.id, &plan.notes).await;

        let analyses: HashMap<String, SymbolAnalysisResult> = results
            .into_iter()
            .map(|r| (r.symbol.clone(), r))
            .collect();

        let result = self.executor.execute(&user.id, &plan, &analyses).await;
        metrics.orders_executed += result.executed;
        metrics.orders_failed += result.failed;
        metrics.orders_skipped += result.skipped;

        if let Some(reason) = &result.halted {
            self.notice(&user.id, &format!("Order execution halted: {}", reason))
                .await;
        }

        Ok(())
    }

    /// Best-effort user-facing notice; a storage hiccup here never aborts
    /// the phase that produced the message.
    async fn notice(&self, user_id: &str, text: &str) {
        if let Err(e) = self.store.append_notice(user_id, text).await {
            warn!("⚠️ [RUN] Failed to write notice for {}: {}", user_id, e);
        }
    }
}
