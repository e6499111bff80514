use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountSummary {
    pub equity: f64,
    pub buying_power: f64,
    pub cash: f64,
    pub position_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed; negative quantity is a short position
    pub qty: f64,
    /// Signed to match qty; a short's market value is negative
    pub market_value: f64,
    pub unrealized_pl_percent: f64,
    pub avg_entry_price: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub qty: f64,
    pub side: Side,
    pub time_in_force: TimeInForce,
    /// Linkage back to the originating analysis, surfaced in the venue's
    /// order record for audit
    pub client_order_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
    pub filled_qty: Option<f64>,
    pub filled_avg_price: Option<f64>,
    pub raw: Value,
}
