use async_trait::async_trait;

use crate::error::ExchangeError;

use super::types::{AccountSummary, OrderAck, PlaceOrderRequest, Position};

pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// The trading venue, keyed by tracked user. Every call hits the real
/// account; nothing here is cached.
#[async_trait]
pub trait TradingApi: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_account(&self, user_id: &str) -> ExchangeResult<AccountSummary>;
    async fn get_positions(&self, user_id: &str) -> ExchangeResult<Vec<Position>>;
    async fn place_order(
        &self,
        user_id: &str,
        order: PlaceOrderRequest,
    ) -> ExchangeResult<OrderAck>;
}
