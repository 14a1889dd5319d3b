use sqlx::MySqlPool;

use crate::record::ContainerRecord;

use super::{Error, RecordPersister, Result, models};

/// Connects to the database at `url` and applies pending migrations.
///
/// # Errors
///
/// Returns [`Error::ConnectionError`] if no connection can be established, or
/// [`Error::MigrationError`] if a migration fails.
pub async fn connect(url: &str) -> Result<MySqlPool> {
    let db = sqlx::mysql::MySqlPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(10))
        .max_connections(10)
        .connect(url)
        .await
        .map_err(Error::ConnectionError)?;

    sqlx::migrate!()
        .run(&db)
        .await
        .map_err(Error::MigrationError)?;

    Ok(db)
}

#[derive(Debug, Clone)]
pub struct MySqlRecordPersister {
    db: MySqlPool,
}

impl MySqlRecordPersister {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }
}

impl RecordPersister for MySqlRecordPersister {
    /// Inserts the records of one cycle and upserts the container labels.
    ///
    /// All statements run in a single transaction. If any of them fails, nothing of the
    /// cycle is stored.
    ///
    /// # Errors
    ///
    /// Returns an `Error::InsertError` if the database transaction or any insert query fails.
    async fn persist_records(&self, timestamp: u64, records: &[ContainerRecord]) -> Result<()> {
        const INSERT_STATS_QUERY: &str = r#"
INSERT INTO container_gpu_stats (
    timestamp, container_id, container_name,
    utilization_gpu_sum, utilization_memory_sum, temperature_average
) VALUES (
    ?, ?, ?,
    ?, ?, ?
)
"#;
        const UPSERT_LABEL_QUERY: &str = r#"
INSERT INTO container_labels (
    container_id, label_key, label_value
) VALUES (
    ?, ?, ?
)
ON DUPLICATE KEY UPDATE
    label_value = VALUES(label_value)
"#;
        let mut tx: sqlx::Transaction<'_, sqlx::MySql> =
            self.db.begin().await.map_err(Error::InsertError)?;

        for record in records {
            let row: models::ContainerGpuStats = (timestamp, record).into();
            let query = row.bind_all(sqlx::query(INSERT_STATS_QUERY));
            query.execute(&mut *tx).await.map_err(Error::InsertError)?;

            for (key, value) in &record.labels {
                sqlx::query(UPSERT_LABEL_QUERY)
                    .bind(record.container_id.as_str())
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::InsertError)?;
            }
        }
        tx.commit().await.map_err(Error::InsertError)?;

        Ok(())
    }
}
