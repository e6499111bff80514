use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ExchangeError;

use super::traits::{ExchangeResult, TradingApi};
use super::types::{
    AccountSummary, OrderAck, PlaceOrderRequest, Position, Side, TimeInForce,
};

#[derive(Clone)]
struct Credentials {
    api_key: String,
    secret_key: String,
}

/// Alpaca trading client covering the whole tracked-user fleet.
/// Each user resolves to their own API keys against the same base URL.
#[derive(Clone)]
pub struct AlpacaBroker {
    client: Client,
    base_url: String,
    credentials: HashMap<String, Credentials>,
}

#[derive(Serialize, Debug)]
struct AlpacaOrderBody {
    symbol: String,
    qty: f64,
    side: &'static str,
    #[serde(rename = "type")]
    type_: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_order_id: Option<String>,
}

impl AlpacaBroker {
    /// Build a broker from the config's user list. Returns None when no user
    /// resolves to a usable credential pair - the executor treats that as
    /// "venue unavailable" and refuses to submit anything.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let base_url = config.alpaca.as_ref()?.base_url.clone();

        let mut credentials = HashMap::new();
        for user in &config.users {
            if let Some((api_key, secret_key)) = config.credentials_for(user) {
                credentials.insert(user.id.clone(), Credentials { api_key, secret_key });
            }
        }

        if credentials.is_empty() {
            return None;
        }

        Some(Self {
            client: Client::new(),
            base_url,
            credentials,
        })
    }

    fn creds(&self, user_id: &str) -> ExchangeResult<&Credentials> {
        self.credentials
            .get(user_id)
            .ok_or_else(|| ExchangeError::UnknownUser {
                user_id: user_id.to_string(),
            })
    }

    async fn get_json(&self, user_id: &str, path: &str) -> ExchangeResult<Value> {
        let creds = self.creds(user_id)?;
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header("APCA-API-KEY-ID", &creds.api_key)
            .header("APCA-API-SECRET-KEY", &creds.secret_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExchangeError::Http {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.json().await?)
    }

    /// Alpaca reports numerics as JSON strings; tolerate either encoding.
    fn num(v: &Value, key: &str) -> Option<f64> {
        v.get(key)
            .and_then(|x| x.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| v.get(key).and_then(|x| x.as_f64()))
    }
}

#[async_trait]
impl TradingApi for AlpacaBroker {
    fn name(&self) -> &'static str {
        "alpaca"
    }

    async fn get_account(&self, user_id: &str) -> ExchangeResult<AccountSummary> {
        let raw = self.get_json(user_id, "/v2/account").await?;
        let positions = self.get_json(user_id, "/v2/positions").await?;

        Ok(AccountSummary {
            equity: Self::num(&raw, "equity").unwrap_or(0.0),
            buying_power: Self::num(&raw, "buying_power").unwrap_or(0.0),
            cash: Self::num(&raw, "cash").unwrap_or(0.0),
            position_count: positions.as_array().map(|a| a.len()).unwrap_or(0),
        })
    }

    async fn get_positions(&self, user_id: &str) -> ExchangeResult<Vec<Position>> {
        let raw = self.get_json(user_id, "/v2/positions").await?;
        let vals = raw.as_array().cloned().unwrap_or_default();

        let mut out = Vec::with_capacity(vals.len());
        for v in vals {
            let symbol = v
                .get("symbol")
                .and_then(|x| x.as_str())
                .unwrap_or_default()
                .to_string();
            out.push(Position {
                symbol,
                qty: Self::num(&v, "qty").unwrap_or(0.0),
                market_value: Self::num(&v, "market_value").unwrap_or(0.0),
                unrealized_pl_percent: Self::num(&v, "unrealized_plpc")
                    .map(|plpc| plpc * 100.0)
                    .unwrap_or(0.0),
                avg_entry_price: Self::num(&v, "avg_entry_price"),
            });
        }
        Ok(out)
    }

    async fn place_order(
        &self,
        user_id: &str,
        order: PlaceOrderRequest,
    ) -> ExchangeResult<OrderAck> {
        let creds = self.creds(user_id)?;
        let url = format!("{}/v2/orders", self.base_url);

        let body = AlpacaOrderBody {
            symbol: order.symbol.clone(),
            qty: order.qty,
            side: match order.side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            },
            type_: "market",
            time_in_force: match order.time_in_force {
                TimeInForce::Day => "day",
                TimeInForce::Gtc => "gtc",
            },
            client_order_id: order.client_order_id.clone(),
        };

        let resp = self
            .client
            .post(&url)
            .header("APCA-API-KEY-ID", &creds.api_key)
            .header("APCA-API-SECRET-KEY", &creds.secret_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExchangeError::Http {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let raw: Value = resp.json().await?;
        let id = match raw.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => {
                return Err(ExchangeError::OrderRejected {
                    reason: raw.to_string(),
                })
            }
        };
        let order_status = raw
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(OrderAck {
            id,
            status: order_status,
            filled_qty: Self::num(&raw, "filled_qty"),
            filled_avg_price: Self::num(&raw, "filled_avg_price"),
            raw,
        })
    }
}
