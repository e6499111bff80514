//! Turns trading decisions into a priority-ordered, capital-feasible order
//! plan: covers first (risk reduction), sells next (liquidity), buys last,
//! proportionally scaled when aggregate demand exceeds available capital.

use tracing::{debug, info};

use crate::constants::planner::PRICE_PLACEHOLDER;
use crate::exchange::types::Side;

use super::types::{
    Action, OptimizedOrder, OrderExecutionPlan, PortfolioContext, SkipReason, TradingDecision,
};

pub struct ExecutionPlanner {
    /// Estimated price for buys with no existing position
    price_placeholder: f64,
}

impl Default for ExecutionPlanner {
    fn default() -> Self {
        Self {
            price_placeholder: PRICE_PLACEHOLDER,
        }
    }
}

struct BuyEstimate {
    symbol: String,
    percent: u8,
    cost: f64,
    price: f64,
}

impl ExecutionPlanner {
    pub fn new(price_placeholder: f64) -> Self {
        Self { price_placeholder }
    }

    /// Build the execution plan. Returns None when there are no decisions at
    /// all (nothing to execute); an all-HOLD set yields an empty plan.
    pub fn build_plan(
        &self,
        decisions: &[TradingDecision],
        portfolio: &PortfolioContext,
    ) -> Option<OrderExecutionPlan> {
        if decisions.is_empty() {
            return None;
        }

        let mut skipped: u32 = 0;

        // Step 1: partition. HOLD drops out; SWAP expands into a sell of the
        // source plus a buy of the target, both at the decision's percent.
        let mut sell_intents: Vec<(String, Option<u8>)> = Vec::new();
        let mut buy_intents: Vec<(String, Option<u8>)> = Vec::new();
        for decision in decisions {
            match decision.action {
                Action::Hold => {}
                Action::Sell => {
                    sell_intents.push((decision.symbol.clone(), decision.position_size_percent))
                }
                Action::Buy => {
                    buy_intents.push((decision.symbol.clone(), decision.position_size_percent))
                }
                Action::Swap => match &decision.swap_from_symbol {
                    Some(from) => {
                        sell_intents.push((from.clone(), decision.position_size_percent));
                        buy_intents
                            .push((decision.symbol.clone(), decision.position_size_percent));
                    }
                    None => {
                        debug!(
                            "⏭️ [PLAN] {} skipped: {}",
                            decision.symbol,
                            SkipReason::MissingSwapSource
                        );
                        skipped += 1;
                    }
                },
            }
        }

        // Step 2: derive covers and ordinary sells. Covers close shorts and
        // consume funds; only ordinary sells generate liquidity.
        let mut covers: Vec<OptimizedOrder> = Vec::new();
        let mut sells: Vec<OptimizedOrder> = Vec::new();
        let mut total_sell_proceeds = 0.0;

        for (symbol, percent) in &sell_intents {
            let Some(pct) = percent else {
                debug!("⏭️ [PLAN] {} skipped: {}", symbol, SkipReason::MissingSizePercent);
                skipped += 1;
                continue;
            };
            let Some(position) = portfolio.position(symbol) else {
                debug!("⏭️ [PLAN] {} skipped: {}", symbol, SkipReason::NoPosition);
                skipped += 1;
                continue;
            };

            if position.quantity < 0.0 {
                // Selling a short means closing it: a buy-to-cover.
                let shares = (position.quantity.abs() * f64::from(*pct) / 100.0).floor() as u64;
                if shares < 1 {
                    debug!("⏭️ [PLAN] {} skipped: {}", symbol, SkipReason::UnderOneShare);
                    skipped += 1;
                    continue;
                }
                let price = position.market_value.abs() / position.quantity.abs();
                covers.push(OptimizedOrder {
                    symbol: symbol.clone(),
                    side: Side::Buy,
                    shares,
                    estimated_price: price,
                    estimated_cost: shares as f64 * price,
                    original_size_percent: *pct,
                    adjusted_size_percent: None,
                    priority: 0,
                    skip_reason: None,
                    is_cover: true,
                });
            } else {
                let shares = (position.quantity * f64::from(*pct) / 100.0).floor() as u64;
                if shares < 1 {
                    debug!("⏭️ [PLAN] {} skipped: {}", symbol, SkipReason::UnderOneShare);
                    skipped += 1;
                    continue;
                }
                let price = position.market_value / position.quantity;
                let proceeds = shares as f64 * price;
                total_sell_proceeds += proceeds;
                sells.push(OptimizedOrder {
                    symbol: symbol.clone(),
                    side: Side::Sell,
                    shares,
                    estimated_price: price,
                    estimated_cost: proceeds,
                    original_size_percent: *pct,
                    adjusted_size_percent: None,
                    priority: 0,
                    skip_reason: None,
                    is_cover: false,
                });
            }
        }

        // Priority blocks: covers first, then sells, decision order preserved
        // within each block.
        let cover_count = covers.len();
        let sell_count = sells.len();
        let mut orders: Vec<OptimizedOrder> = Vec::new();
        let mut priority: u32 = 0;
        for mut order in covers.into_iter().chain(sells.into_iter()) {
            priority += 1;
            order.priority = priority;
            orders.push(order);
        }

        // Step 3: capital available once the sells have executed.
        let available_buying_power = portfolio.buying_power + total_sell_proceeds;

        // Step 4: buy estimates. The percent is of PRE-sell buying power by
        // contract, even though feasibility is checked post-sell.
        let mut estimates: Vec<BuyEstimate> = Vec::new();
        for (symbol, percent) in &buy_intents {
            let Some(pct) = percent else {
                debug!("⏭️ [PLAN] {} skipped: {}", symbol, SkipReason::MissingSizePercent);
                skipped += 1;
                continue;
            };
            let cost = portfolio.buying_power * f64::from(*pct) / 100.0;
            let price = match portfolio.position(symbol) {
                Some(position) => position.avg_entry_price.unwrap_or_else(|| {
                    if position.quantity != 0.0 {
                        (position.market_value / position.quantity).abs()
                    } else {
                        self.price_placeholder
                    }
                }),
                None => self.price_placeholder,
            };
            estimates.push(BuyEstimate {
                symbol: symbol.clone(),
                percent: *pct,
                cost,
                price,
            });
        }
        let total_buy_cost_estimate: f64 = estimates.iter().map(|e| e.cost).sum();

        // Step 5: uniform scaling when demand exceeds available capital.
        let scaling_applied =
            total_buy_cost_estimate > available_buying_power && total_buy_cost_estimate > 0.0;
        let scaling_factor =
            scaling_applied.then(|| available_buying_power / total_buy_cost_estimate);

        // Step 6: emit buy orders, priorities continuing after the sell block.
        let mut total_buy_cost = 0.0;
        let mut buy_count = 0usize;
        for estimate in estimates {
            let (cost, adjusted_pct) = match scaling_factor {
                Some(factor) => (
                    estimate.cost * factor,
                    Some((f64::from(estimate.percent) * factor).floor() as u8),
                ),
                None => (estimate.cost, None),
            };
            let shares = (cost / estimate.price).floor() as u64;
            if shares < 1 {
                debug!(
                    "⏭️ [PLAN] {} skipped: {}",
                    estimate.symbol,
                    SkipReason::UnderOneShare
                );
                skipped += 1;
                continue;
            }
            priority += 1;
            total_buy_cost += cost;
            buy_count += 1;
            orders.push(OptimizedOrder {
                symbol: estimate.symbol,
                side: Side::Buy,
                shares,
                estimated_price: estimate.price,
                estimated_cost: cost,
                original_size_percent: estimate.percent,
                adjusted_size_percent: adjusted_pct,
                priority,
                skip_reason: None,
                is_cover: false,
            });
        }

        // Step 7: assemble.
        let notes = Self::compose_notes(
            cover_count,
            sell_count,
            buy_count,
            total_sell_proceeds,
            scaling_factor,
            skipped,
            orders.is_empty(),
        );

        info!(
            "📋 [PLAN] {} order(s): {} cover, {} sell (${:.2} liquidity), {} buy; scaling={}; {} skipped",
            orders.len(),
            cover_count,
            sell_count,
            total_sell_proceeds,
            buy_count,
            scaling_applied,
            skipped
        );

        Some(OrderExecutionPlan {
            orders,
            total_sell_proceeds,
            total_buy_cost,
            available_buying_power,
            scaling_applied,
            scaling_factor,
            orders_skipped: skipped,
            notes,
        })
    }

    fn compose_notes(
        covers: usize,
        sells: usize,
        buys: usize,
        proceeds: f64,
        scaling_factor: Option<f64>,
        skipped: u32,
        empty: bool,
    ) -> String {
        if empty && skipped == 0 {
            return "No action required - all decisions are HOLD".to_string();
        }
        if empty {
            return format!("No executable orders; {} decision(s) skipped", skipped);
        }

        let mut parts: Vec<String> = Vec::new();
        if covers > 0 {
            parts.push(format!("{} cover order(s) reducing short exposure", covers));
        }
        if sells > 0 {
            parts.push(format!(
                "{} sell order(s) generating ${:.2} of liquidity",
                sells, proceeds
            ));
        }
        if buys > 0 {
            match scaling_factor {
                Some(factor) => parts.push(format!(
                    "{} buy order(s) scaled to {:.1}% of requested size",
                    buys,
                    factor * 100.0
                )),
                None => parts.push(format!("{} buy order(s) at requested size", buys)),
            }
        }
        if skipped > 0 {
            parts.push(format!("{} decision(s) skipped", skipped));
        }
        parts.join("; ")
    }
}
