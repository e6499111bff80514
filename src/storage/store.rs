use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StorageError;
use crate::pipeline::types::RunRecord;

use super::{MessageMetaUpdate, OrderRecord, Persistence, StorageResult, StoredMessage};

/// Append-only JSONL persistence rooted at a data directory:
///
/// ```text
/// data/
///   conversations.jsonl   research messages, one conversation per instrument
///   notices.jsonl         user-facing decision log notices
///   orders.jsonl          successful order audit records
///   failed_orders.jsonl   failed order audit records
///   message_meta.jsonl    message -> placed-order linkage updates
///   runs.jsonl            per-run summaries
/// ```
#[derive(Clone)]
pub struct FileStore {
    base_dir: PathBuf,
    /// account/symbol -> conversation id, so repeated runs keep appending to
    /// the same instrument thread
    conversations: DashMap<String, String>,
}

#[derive(Serialize)]
struct ConversationEntry<'a> {
    ts: String,
    account: &'a str,
    symbol: &'a str,
    conversation_id: &'a str,
    message_id: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct NoticeEntry<'a> {
    ts: String,
    user_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct MetaEntry<'a> {
    ts: String,
    #[serde(flatten)]
    update: &'a MessageMetaUpdate,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            conversations: DashMap::new(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.base_dir.join(file)
    }

    fn append_lines<T: Serialize>(path: &Path, entries: &[T]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // One buffer, one append: a batch lands in a single write call.
        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&serde_json::to_string(entry)?);
            buf.push('\n');
        }

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        f.write_all(buf.as_bytes())?;
        Ok(())
    }

    fn conversation_id(&self, account: &str, symbol: &str) -> String {
        let key = format!("{}/{}", account, symbol);
        self.conversations
            .entry(key)
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }
}

#[async_trait]
impl Persistence for FileStore {
    async fn append_research_message(
        &self,
        account: &str,
        symbol: &str,
        body: &str,
    ) -> StorageResult<StoredMessage> {
        let conversation_id = self.conversation_id(account, symbol);
        let message_id = Uuid::new_v4().to_string();

        let entry = ConversationEntry {
            ts: Utc::now().to_rfc3339(),
            account,
            symbol,
            conversation_id: &conversation_id,
            message_id: &message_id,
            body,
        };
        Self::append_lines(&self.path("conversations.jsonl"), &[entry])?;

        Ok(StoredMessage {
            conversation_id,
            message_id,
        })
    }

    async fn append_notice(&self, user_id: &str, text: &str) -> StorageResult<()> {
        let entry = NoticeEntry {
            ts: Utc::now().to_rfc3339(),
            user_id,
            text,
        };
        Self::append_lines(&self.path("notices.jsonl"), &[entry])
    }

    async fn save_orders_batch(&self, records: &[OrderRecord]) -> StorageResult<()> {
        Self::append_lines(&self.path("orders.jsonl"), records)
    }

    async fn save_failed_orders_batch(&self, records: &[OrderRecord]) -> StorageResult<()> {
        Self::append_lines(&self.path("failed_orders.jsonl"), records)
    }

    async fn update_message_metadata_batch(
        &self,
        updates: &[MessageMetaUpdate],
    ) -> StorageResult<()> {
        let ts = Utc::now().to_rfc3339();
        let entries: Vec<MetaEntry> = updates
            .iter()
            .map(|update| MetaEntry {
                ts: ts.clone(),
                update,
            })
            .collect();
        Self::append_lines(&self.path("message_meta.jsonl"), &entries)
    }

    async fn save_run_record(&self, record: &RunRecord) -> StorageResult<()> {
        Self::append_lines(&self.path("runs.jsonl"), std::slice::from_ref(record))
    }
}
