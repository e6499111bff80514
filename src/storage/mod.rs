pub mod store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::exchange::types::Side;
use crate::pipeline::types::RunRecord;

pub use store::FileStore;

pub type StorageResult<T> = Result<T, StorageError>;

/// Ids of a message appended to an instrument conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub message_id: String,
}

/// Permanent audit record of one attempted order, successful or failed.
/// Written once, never updated, never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub side: Side,
    pub shares: u64,
    pub estimated_price: f64,
    pub is_cover: bool,
    /// Venue order id; None for orders that never reached the venue
    pub external_order_id: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub analysis_id: Option<String>,
    pub message_id: Option<String>,
    pub created_at: String,
}

/// Marks a research message as having produced a placed order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageMetaUpdate {
    pub message_id: String,
    pub order_placed: bool,
    pub external_order_id: Option<String>,
}

/// Everything the pipeline persists. One implementation writes JSONL files;
/// tests substitute an in-memory store.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Append a research report to the per-instrument conversation owned by
    /// the system portfolio account.
    async fn append_research_message(
        &self,
        account: &str,
        symbol: &str,
        body: &str,
    ) -> StorageResult<StoredMessage>;

    /// Append a human-readable notice to a user's decision log. Every abort
    /// path goes through here so nothing fails silently.
    async fn append_notice(&self, user_id: &str, text: &str) -> StorageResult<()>;

    async fn save_orders_batch(&self, records: &[OrderRecord]) -> StorageResult<()>;
    async fn save_failed_orders_batch(&self, records: &[OrderRecord]) -> StorageResult<()>;
    async fn update_message_metadata_batch(
        &self,
        updates: &[MessageMetaUpdate],
    ) -> StorageResult<()>;

    async fn save_run_record(&self, record: &RunRecord) -> StorageResult<()>;
}
