use std::collections::HashMap;

use crate::persistence;

#[derive(Debug, Default, serde::Serialize)]
pub struct ExportedContainer {
    pub container_name: String,
    pub labels: HashMap<String, String>,
    pub stats: Vec<GpuStatsSample>,
}

#[derive(Debug, serde::Serialize)]
pub struct GpuStatsSample {
    pub timestamp: u64,
    pub utilization_gpu_sum: u64,
    pub utilization_memory_sum: u64,
    pub temperature_average: f64,
}

impl From<persistence::ContainerGpuStats> for GpuStatsSample {
    fn from(value: persistence::ContainerGpuStats) -> Self {
        Self {
            timestamp: value.timestamp,
            utilization_gpu_sum: value.utilization_gpu_sum,
            utilization_memory_sum: value.utilization_memory_sum,
            temperature_average: value.temperature_average,
        }
    }
}
