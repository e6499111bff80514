mod agents;
mod config;
mod constants;
mod error;
mod exchange;
mod llm;
mod pipeline;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use agents::LlmResearchAgent;
use config::AppConfig;
use exchange::{AlpacaBroker, TradingApi};
use llm::{LLMClient, LLMQueue};
use pipeline::PipelineOrchestrator;
use storage::FileStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup Logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    dotenvy::dotenv().ok();

    info!("Starting AutoFolio...");

    let config = AppConfig::load();
    info!(
        "Loaded configuration: {} tracked user(s), schedule: {:?}",
        config.users.len(),
        config.schedule
    );

    // LLM client + bounded queue
    let api_key = config
        .llm
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_default();
    let llm_client = LLMClient::new(api_key, config.llm.base_url.clone(), config.llm.model.clone());
    info!(
        "📬 Initializing LLM queue (max concurrent: {}, size: {})",
        config.llm_max_concurrent, config.llm_queue_size
    );
    let llm_queue = LLMQueue::new(llm_client, config.llm_max_concurrent, config.llm_queue_size);
    let agent = Arc::new(LlmResearchAgent::new(llm_queue));

    // Trading venue; without credentials the pipeline runs research-only and
    // the executor refuses to submit.
    let broker: Option<Arc<dyn TradingApi>> = match AlpacaBroker::from_config(&config) {
        Some(b) => Some(Arc::new(b)),
        None => {
            warn!("⚠️ No venue credentials resolved - orders will not be submitted");
            None
        }
    };

    let store = Arc::new(FileStore::new(config.data_dir.clone()));
    let schedule = config.schedule.clone();

    let orchestrator = Arc::new(PipelineOrchestrator::new(config, agent, broker, store));

    match schedule {
        Some(cron) => {
            info!("📅 Scheduling portfolio reviews: {}", cron);
            let scheduler = JobScheduler::new().await?;

            let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
                let orchestrator = orchestrator.clone();
                Box::pin(async move {
                    let record = orchestrator.run().await;
                    info!(
                        "Run {} finished: {} user(s), {} error(s)",
                        record.run_id,
                        record.users_analyzed,
                        record.errors.len()
                    );
                })
            })?;

            scheduler.add(job).await?;
            scheduler.start().await?;

            // Park the main task; the scheduler owns the work from here.
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
        None => {
            let record = orchestrator.run().await;
            info!(
                "Run {} finished: {} user(s), {} portfolio(s), {} error(s)",
                record.run_id,
                record.users_analyzed,
                record.portfolios_analyzed,
                record.errors.len()
            );
            for err in &record.errors {
                warn!("  - {}", err);
            }
        }
    }

    Ok(())
}
