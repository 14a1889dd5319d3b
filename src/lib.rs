//! NVIDIA Docker Monitor: attributes per-GPU utilization to the Docker containers that were
//! granted the GPU devices and publishes one aggregated record per running container.
//!
//! Every sampling cycle lists the running containers through the Docker Engine API, queries
//! all GPUs with `nvidia-smi`, and reduces the statuses of each container's GPUs into a
//! [`record::ContainerRecord`]. Records are served by a small HTTP API and, optionally,
//! persisted to a MySQL database.

use std::sync::Arc;

use error::ResultOkLogExt;
use persistence::RecordPersister;

pub mod api;
pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod gpu;
pub mod http;
pub mod monitor;
pub mod persistence;
pub mod record;
pub mod sampler;

/// Runs the monitor until a fatal error occurs.
///
/// A failing sampling cycle is logged and does not stop the monitor.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration (see [`config::Config`]).
/// - Failure to connect to or migrate the database, if `DATABASE_URL` is set.
/// - Failure to bind the API listen address.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {:?}", config);

    let monitor = Arc::new(monitor::Monitor::default());

    let db = match config.database_url.as_deref() {
        Some(url) => Some(persistence::connect(url).await?),
        None => {
            log::info!("`DATABASE_URL` not set, records are not persisted");
            None
        }
    };

    let records_tx = db.clone().map(|db| {
        let persister = persistence::MySqlRecordPersister::new(db);
        let (tx, mut rx) = tokio::sync::mpsc::channel::<sampler::TimestampedRecords>(10);
        tokio::spawn(async move {
            while let Some((timestamp, records)) = rx.recv().await {
                persister
                    .persist_records(timestamp, &records)
                    .await
                    .ok_log();
            }
        });
        tx
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    {
        let api = api::APIServer::new(Arc::clone(&monitor), db);
        tokio::spawn(async move {
            if let Err(err) = api.serve(listener).await {
                log::error!("API server stopped: {}", err);
            }
        });
    }

    let sampler = sampler::Sampler::new(
        discovery::Docker::new(config.docker_socket_path),
        gpu::NvidiaSmi::new(config.nvidia_smi_path, config.query_timeout),
    );

    let mut interval = tokio::time::interval(config.sample_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        sampler.run_cycle(&monitor, records_tx.as_ref()).await?;
    }
}
