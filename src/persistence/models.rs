use crate::record::ContainerRecord;

/// One row of `container_gpu_stats`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct ContainerGpuStats {
    pub timestamp: u64,
    pub container_id: String,
    pub container_name: String,
    pub utilization_gpu_sum: u64,
    pub utilization_memory_sum: u64,
    pub temperature_average: f64,
}

impl ContainerGpuStats {
    pub fn bind_all<'q>(
        &'q self,
        query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    ) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
        query
            .bind(self.timestamp)
            .bind(self.container_id.as_str())
            .bind(self.container_name.as_str())
            .bind(self.utilization_gpu_sum)
            .bind(self.utilization_memory_sum)
            .bind(self.temperature_average)
    }
}

impl From<(u64, &ContainerRecord)> for ContainerGpuStats {
    fn from((timestamp, record): (u64, &ContainerRecord)) -> Self {
        let summary = record.device_summary;
        Self {
            timestamp,
            container_id: record.container_id.to_string(),
            container_name: record.container_name.to_string(),
            utilization_gpu_sum: summary.utilization_gpu_sum,
            utilization_memory_sum: summary.utilization_memory_sum,
            temperature_average: summary.temperature_average,
        }
    }
}

/// One row of `container_labels`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContainerLabel {
    pub container_id: String,
    pub label_key: String,
    pub label_value: String,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::container::{ContainerID, ContainerName};
    use crate::gpu::DeviceSummary;

    #[test]
    fn test_row_from_record() {
        let record = ContainerRecord {
            container_id: ContainerID::new("abc").unwrap(),
            container_name: ContainerName::new("/trainer"),
            labels: HashMap::default(),
            device_summary: DeviceSummary {
                utilization_gpu_sum: 40,
                utilization_memory_sum: 60,
                temperature_average: 70.0,
            },
        };

        let row = ContainerGpuStats::from((1_700_000_000, &record));

        assert_eq!(
            row,
            ContainerGpuStats {
                timestamp: 1_700_000_000,
                container_id: "abc".to_owned(),
                container_name: "trainer".to_owned(),
                utilization_gpu_sum: 40,
                utilization_memory_sum: 60,
                temperature_average: 70.0,
            }
        );
    }
}
