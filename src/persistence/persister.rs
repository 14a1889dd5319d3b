use crate::record::ContainerRecord;

use super::Result;

pub trait RecordPersister {
    /// Stores the records of one sampling cycle taken at `timestamp` (UNIX epoch seconds).
    fn persist_records(
        &self,
        timestamp: u64,
        records: &[ContainerRecord],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
