//! # falldetectd — fall-detection daemon
//!
//! Composition root that wires all adapters together and runs the pipeline.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the fall log service, injecting repositories via port traits
//! - Spawn the sink relay and the pipeline on the selected transport
//! - Start scanning, and shut down cleanly on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use anyhow::Context as _;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use falldetect_adapter_ble::BtleplugTransport;
use falldetect_adapter_storage_sqlite_sqlx::{
    Config as StorageConfig, SqliteFallEventRepository, SqliteLinkRepository,
};
use falldetect_adapter_virtual::VirtualTransport;
use falldetect_app::notifier::TracingNotifier;
use falldetect_app::pipeline::{FallPipeline, Inbox, PipelineConfig, PipelineHandle};
use falldetect_app::ports::{AlwaysGranted, BleTransport};
use falldetect_app::relay::SinkRelay;
use falldetect_app::services::fall_log_service::FallLogService;

use crate::config::{Config, TransportKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let pool = db.pool().clone();

    // Services
    let owner = config.owner()?;
    let fall_log = FallLogService::new(
        owner.clone(),
        SqliteFallEventRepository::new(pool.clone()),
        SqliteLinkRepository::new(pool),
        TracingNotifier,
    );
    if let Some(linked) = &config.account.linked_user_id {
        fall_log
            .link_users(owner.as_str(), linked)
            .await
            .context("failed to link caregiver account")?;
    }
    let (relay, relay_task) = SinkRelay::spawn(fall_log);

    // Pipeline
    let (handle, inbox) = PipelineHandle::channel();
    let pipeline_config = config.pipeline_config();
    let pipeline_task = match config.transport_kind()? {
        TransportKind::Ble => {
            let transport = BtleplugTransport::start(&config.ble, handle.clone())
                .await
                .context("failed to open BLE adapter")?;
            launch(pipeline_config, transport, relay, inbox)
        }
        TransportKind::Virtual => {
            tracing::info!("running on the virtual fall sensor");
            let transport = VirtualTransport::new(config.virtual_sensor.clone(), handle.clone());
            launch(pipeline_config, transport, relay, inbox)
        }
    };

    handle.start_scanning()?;
    tracing::info!(target_name = %config.ble.target_name, %owner, "falldetectd started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Ctrl-C received, shutting down");

    handle.shutdown()?;
    pipeline_task.await?;
    drop(handle);
    relay_task.await?;
    db.close().await;

    Ok(())
}

/// Spawn the pipeline actor with the relay as its consumer.
fn launch<T>(config: PipelineConfig, transport: T, relay: SinkRelay, inbox: Inbox) -> JoinHandle<()>
where
    T: BleTransport + Send + 'static,
{
    let mut pipeline = FallPipeline::new(config, transport, AlwaysGranted);
    pipeline.register_consumer(relay.into_consumer());
    pipeline.spawn(inbox)
}
