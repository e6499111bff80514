use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, info};

use super::LLMClient;
use crate::error::PipelineError;

/// Priority lane for LLM requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Decision synthesis: one call the whole user run is waiting on
    High,
    /// Per-instrument research: many calls, bounded by the wave size
    Normal,
}

struct QueuedRequest {
    system_prompt: String,
    user_input: String,
    response_tx: oneshot::Sender<Result<String, String>>,
}

/// Bounds concurrent LLM requests and drains the synthesis lane before
/// the research lane.
#[derive(Clone)]
pub struct LLMQueue {
    high_tx: mpsc::Sender<QueuedRequest>,
    normal_tx: mpsc::Sender<QueuedRequest>,
}

impl LLMQueue {
    pub fn new(client: LLMClient, max_concurrent: usize, queue_size: usize) -> Self {
        let (high_tx, high_rx) = mpsc::channel::<QueuedRequest>(queue_size);
        let (normal_tx, normal_rx) = mpsc::channel::<QueuedRequest>(queue_size);

        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        tokio::spawn(Self::process_queue(client, semaphore, high_rx, normal_rx));

        Self { high_tx, normal_tx }
    }

    async fn process_queue(
        client: LLMClient,
        semaphore: Arc<Semaphore>,
        mut high_rx: mpsc::Receiver<QueuedRequest>,
        mut normal_rx: mpsc::Receiver<QueuedRequest>,
    ) {
        info!(
            "📬 [QUEUE] LLM queue processor started (max concurrent: {})",
            semaphore.available_permits()
        );

        loop {
            let request = tokio::select! {
                biased;

                Some(req) = high_rx.recv() => req,
                Some(req) = normal_rx.recv() => req,
                else => {
                    info!("📬 [QUEUE] All channels closed, shutting down");
                    break;
                }
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    let _ = request
                        .response_tx
                        .send(Err("semaphore closed".to_string()));
                    continue;
                }
            };

            debug!(
                "📬 [QUEUE] Acquired permit, {} slots remaining",
                semaphore.available_permits()
            );

            let client_clone = client.clone();
            tokio::spawn(async move {
                let result = client_clone
                    .chat(&request.system_prompt, &request.user_input)
                    .await
                    .map_err(|e| e.to_string());

                let _ = request.response_tx.send(result);
                drop(permit);
            });
        }
    }

    pub async fn chat(
        &self,
        system_prompt: &str,
        user_input: &str,
        priority: Priority,
    ) -> Result<String, PipelineError> {
        let (response_tx, response_rx) = oneshot::channel();

        let request = QueuedRequest {
            system_prompt: system_prompt.to_string(),
            user_input: user_input.to_string(),
            response_tx,
        };

        let send_result = match priority {
            Priority::High => self.high_tx.send(request).await,
            Priority::Normal => self.normal_tx.send(request).await,
        };

        if send_result.is_err() {
            return Err(PipelineError::Llm("failed to queue request".to_string()));
        }

        match response_rx.await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(PipelineError::Llm(e)),
            Err(_) => Err(PipelineError::Llm("request was cancelled".to_string())),
        }
    }
}
