use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::container::ContainerID;
use crate::record::ContainerRecord;

type Snapshot = BTreeMap<ContainerID, ContainerRecord>;

/// Keeps the records of the latest successful sampling cycle.
///
/// The records of a cycle are swapped in as a whole, so readers never observe a mix of two
/// cycles.
#[derive(Debug, Default)]
pub struct Monitor {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Monitor {
    /// Replaces the stored records with those of a new cycle.
    ///
    /// Containers missing from `records` are considered stopped and removed.
    pub fn update(&self, records: &[ContainerRecord]) {
        let snapshot: Snapshot = records
            .iter()
            .map(|record| (record.container_id.clone(), record.clone()))
            .collect();
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the latest record of a container.
    pub fn get(&self, container_id: &str) -> Option<ContainerRecord> {
        self.snapshot().get(container_id).cloned()
    }

    /// Returns all latest records, ordered by container id.
    pub fn records(&self) -> Vec<ContainerRecord> {
        self.snapshot().values().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.snapshot().len()
    }
}
