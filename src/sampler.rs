use tokio::sync::mpsc;

use crate::discovery::{self, ContainerInventory};
use crate::gpu::{self, DeviceQuery, DeviceStatus};
use crate::monitor::Monitor;
use crate::record::{self, ContainerRecord};

/// Records of one successful cycle, stamped with seconds since the Unix epoch.
pub type TimestampedRecords = (u64, Vec<ContainerRecord>);

/// Reasons a whole sampling cycle produced no records.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("failed to list containers: {0}")]
    Inventory(#[from] discovery::Error),
    #[error("failed to query GPU devices: {0}")]
    Query(#[from] gpu::QueryError),
    #[error("failed to parse GPU device status: {0}")]
    Parse(#[from] gpu::DeviceParseError),
    #[error("system clock is before the Unix epoch: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

/// The receiving end of the persistence channel was dropped.
#[derive(Debug, thiserror::Error)]
#[error("persistence task stopped")]
pub struct PersisterStopped;

/// Runs sampling cycles against a container inventory and a GPU query.
#[derive(Debug)]
pub struct Sampler<I, Q> {
    inventory: I,
    query: Q,
}

impl<I, Q> Sampler<I, Q>
where
    I: ContainerInventory,
    Q: DeviceQuery,
{
    pub fn new(inventory: I, query: Q) -> Self {
        Self { inventory, query }
    }

    /// Runs one sampling cycle and returns one record per running container, in inventory
    /// order.
    ///
    /// The GPU query is skipped if no container is running.
    ///
    /// # Errors
    ///
    /// Returns a [`CycleError`] if the inventory or the query fails, or if the query output
    /// contains a malformed value. No partial result is returned in that case.
    pub async fn sample(&self) -> Result<Vec<ContainerRecord>, CycleError> {
        let before = std::time::Instant::now();
        let containers = self.inventory.list_containers().await?;
        if containers.is_empty() {
            log::trace!("no running containers, skipping GPU query");
            return Ok(Vec::new());
        }

        let raw = self.query.query().await?;
        let devices = gpu::parse_device_statuses(&raw)?;
        warn_on_index_mismatch(&devices);
        log::debug!(
            "sampled {} GPU devices for {} containers",
            devices.len(),
            containers.len()
        );

        let records = record::build_records(&containers, &devices);
        log::trace!("sample() took {} microseconds", before.elapsed().as_micros());
        Ok(records)
    }

    /// Runs one cycle of the collector loop: samples, publishes the records to `monitor` and
    /// forwards them to the persistence task, if any.
    ///
    /// A failed cycle is logged and leaves `monitor` and `records_tx` untouched. Returns
    /// whether the cycle published new records.
    ///
    /// # Errors
    ///
    /// Returns [`PersisterStopped`] if `records_tx` is closed.
    pub async fn run_cycle(
        &self,
        monitor: &Monitor,
        records_tx: Option<&mpsc::Sender<TimestampedRecords>>,
    ) -> Result<bool, PersisterStopped> {
        let (timestamp, records) = match self.timestamped_sample().await {
            Ok(sample) => sample,
            Err(err) => {
                log::error!("sampling cycle failed: {}", err);
                return Ok(false);
            }
        };
        monitor.update(&records);

        if let Some(tx) = records_tx {
            tx.send((timestamp, records))
                .await
                .map_err(|_| PersisterStopped)?;
        }
        Ok(true)
    }

    async fn timestamped_sample(&self) -> Result<TimestampedRecords, CycleError> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs();
        log::trace!("Sampling containers@{timestamp}");
        Ok((timestamp, self.sample().await?))
    }
}

/// Devices are attributed by position, which assumes the tool lists them by index.
fn warn_on_index_mismatch(devices: &[DeviceStatus]) {
    for (position, device) in devices.iter().enumerate() {
        if let Some(index) = device.index {
            if index != position as u64 {
                log::warn!(
                    "GPU at position {} reports index {}, attributing by position",
                    position,
                    index
                );
            }
        }
    }
}
