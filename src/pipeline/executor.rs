//! Submits a plan's orders to the trading venue, strictly one at a time in
//! priority order. Buying power is shared mutable state at the venue, so no
//! two orders from one plan may ever be in flight together.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::constants::events;
use crate::exchange::traits::TradingApi;
use crate::exchange::types::{PlaceOrderRequest, TimeInForce};
use crate::storage::{MessageMetaUpdate, OrderRecord, Persistence};

use super::types::{ExecutionResult, OptimizedOrder, OrderExecutionPlan, SymbolAnalysisResult};

pub struct OrderExecutor {
    /// None when no venue credentials resolved; execution then refuses to start
    trading: Option<Arc<dyn TradingApi>>,
    store: Arc<dyn Persistence>,
}

impl OrderExecutor {
    pub fn new(trading: Option<Arc<dyn TradingApi>>, store: Arc<dyn Persistence>) -> Self {
        Self { trading, store }
    }

    pub async fn execute(
        &self,
        user_id: &str,
        plan: &OrderExecutionPlan,
        analyses: &HashMap<String, SymbolAnalysisResult>,
    ) -> ExecutionResult {
        let total_orders = plan.orders.len() as u32;

        let Some(trading) = &self.trading else {
            warn!("⛔ [EXEC] Trading venue unavailable, refusing to submit {} order(s)", total_orders);
            return ExecutionResult {
                executed: 0,
                failed: 0,
                skipped: 0,
                total_orders,
                halted: Some("trading venue unavailable".to_string()),
            };
        };

        let mut ordered: Vec<&OptimizedOrder> = plan.orders.iter().collect();
        ordered.sort_by_key(|o| o.priority);

        let mut executed: u32 = 0;
        let mut failed: u32 = 0;
        let mut skipped: u32 = 0;
        let mut succeeded_records: Vec<OrderRecord> = Vec::new();
        let mut failed_records: Vec<OrderRecord> = Vec::new();
        let mut meta_updates: Vec<MessageMetaUpdate> = Vec::new();

        for order in ordered {
            if let Some(reason) = order.skip_reason {
                info!(
                    event = events::ORDER_SKIPPED,
                    "⏭️ [EXEC] #{} {} skipped: {}",
                    order.priority,
                    order.symbol,
                    reason
                );
                skipped += 1;
                continue;
            }

            let linkage = analyses.get(&order.symbol);
            let request = PlaceOrderRequest {
                symbol: order.symbol.clone(),
                qty: order.shares as f64,
                side: order.side,
                time_in_force: TimeInForce::Day,
                client_order_id: linkage.map(|a| a.analysis_id.clone()),
            };

            info!(
                "🚀 [EXEC] #{} {} {} x{}{}",
                order.priority,
                order.side.as_str(),
                order.symbol,
                order.shares,
                if order.is_cover { " (cover)" } else { "" }
            );

            match trading.place_order(user_id, request).await {
                Ok(ack) => {
                    info!(
                        event = events::ORDER_PLACED,
                        "✅ [EXEC] {} accepted as {} ({})", order.symbol, ack.id, ack.status
                    );
                    executed += 1;
                    succeeded_records.push(Self::audit_record(
                        user_id,
                        order,
                        linkage,
                        Some(ack.id.clone()),
                        ack.status,
                        None,
                    ));
                    if let Some(analysis) = linkage {
                        meta_updates.push(MessageMetaUpdate {
                            message_id: analysis.message_id.clone(),
                            order_placed: true,
                            external_order_id: Some(ack.id),
                        });
                    }
                }
                Err(e) => {
                    error!(
                        event = events::ORDER_FAILED,
                        "❌ [EXEC] {} failed: {}", order.symbol, e
                    );
                    failed += 1;
                    failed_records.push(Self::audit_record(
                        user_id,
                        order,
                        linkage,
                        None,
                        "failed".to_string(),
                        Some(e.to_string()),
                    ));
                    // The batch continues: later orders may still be feasible.
                }
            }
        }

        // One batched write per category. Orders already sit at the venue, so
        // a persistence failure here is logged, never rolled back.
        if let Err(e) = self.store.save_orders_batch(&succeeded_records).await {
            error!("❌ [EXEC] Failed to persist {} order record(s): {}", succeeded_records.len(), e);
        }
        if let Err(e) = self.store.save_failed_orders_batch(&failed_records).await {
            error!("❌ [EXEC] Failed to persist {} failed-order record(s): {}", failed_records.len(), e);
        }
        if let Err(e) = self.store.update_message_metadata_batch(&meta_updates).await {
            error!("❌ [EXEC] Failed to update {} message linkage(s): {}", meta_updates.len(), e);
        }

        info!(
            "🏁 [EXEC] {} executed, {} failed, {} skipped of {}",
            executed, failed, skipped, total_orders
        );

        ExecutionResult {
            executed,
            failed,
            skipped,
            total_orders,
            halted: None,
        }
    }

    fn audit_record(
        user_id: &str,
        order: &OptimizedOrder,
        linkage: Option<&SymbolAnalysisResult>,
        external_order_id: Option<String>,
        status: String,
        error_message: Option<String>,
    ) -> OrderRecord {
        OrderRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            symbol: order.symbol.clone(),
            side: order.side,
            shares: order.shares,
            estimated_price: order.estimated_price,
            is_cover: order.is_cover,
            external_order_id,
            status,
            error_message,
            analysis_id: linkage.map(|a| a.analysis_id.clone()),
            message_id: linkage.map(|a| a.message_id.clone()),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
