//! The per-container record produced by every sampling cycle.
//!
//! Records serialize to the layout consumed downstream:
//!
//! ```json
//! {
//!   "containerid": "4f1c...",
//!   "containername": "trainer",
//!   "labels": { "team": "ml" },
//!   "device": {
//!     "Utilization": { "GPU": 40, "Memory": 60 },
//!     "Temperature": 70.0
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::ser::SerializeStruct;

use crate::container::{ContainerID, ContainerInfo, ContainerName};
use crate::gpu::{ContainerStatus, DeviceStatus, DeviceSummary, match_devices};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContainerRecord {
    #[serde(rename = "containerid")]
    pub container_id: ContainerID,
    #[serde(rename = "containername")]
    pub container_name: ContainerName,
    pub labels: HashMap<String, String>,
    #[serde(rename = "device")]
    pub device_summary: DeviceSummary,
}

impl serde::Serialize for DeviceSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(serde::Serialize)]
        struct Utilization {
            #[serde(rename = "GPU")]
            gpu: u64,
            #[serde(rename = "Memory")]
            memory: u64,
        }

        let mut state = serializer.serialize_struct("DeviceSummary", 2)?;
        state.serialize_field(
            "Utilization",
            &Utilization {
                gpu: self.utilization_gpu_sum,
                memory: self.utilization_memory_sum,
            },
        )?;
        state.serialize_field("Temperature", &self.temperature_average)?;
        state.end()
    }
}

/// Attributes the sampled devices to one container and reduces them into its record.
pub fn build_record(container: &ContainerInfo, devices: &[DeviceStatus]) -> ContainerRecord {
    let mut status = ContainerStatus::new(devices);
    for position in match_devices(&container.host_device_paths, devices) {
        status.add_device(position);
    }

    ContainerRecord {
        container_id: container.id.clone(),
        container_name: container.name.clone(),
        labels: container.labels.clone(),
        device_summary: status.summary(),
    }
}

/// Builds one record per container, in inventory order.
pub fn build_records(
    containers: &[ContainerInfo],
    devices: &[DeviceStatus],
) -> Vec<ContainerRecord> {
    containers
        .iter()
        .map(|container| build_record(container, devices))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::parse_device_statuses;

    fn container(id: &str, name: &str, paths: &[&str]) -> ContainerInfo {
        ContainerInfo {
            id: ContainerID::new(id).unwrap(),
            name: ContainerName::new(name),
            labels: HashMap::from([("team".to_owned(), "ml".to_owned())]),
            host_device_paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_build_record_end_to_end() {
        let devices = parse_device_statuses("0, 10, 20, 60\n1, 30, 40, 80").unwrap();
        let record = build_record(
            &container("abc", "/trainer", &["/dev/nvidia0", "/dev/null"]),
            &devices,
        );

        assert_eq!(record.container_name.as_str(), "trainer");
        assert_eq!(
            record.device_summary,
            DeviceSummary {
                utilization_gpu_sum: 10,
                utilization_memory_sum: 20,
                temperature_average: 60.0,
            }
        );
    }

    #[test]
    fn test_build_records_keeps_inventory_order_and_gpu_less_containers() {
        let devices = parse_device_statuses("0, 10, 20, 60\n1, 30, 40, 80").unwrap();
        let containers = vec![
            container("b", "/second", &["/dev/nvidia1", "/dev/nvidia0"]),
            container("a", "/first", &[]),
        ];
        let records = build_records(&containers, &devices);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].container_id.as_str(), "b");
        assert_eq!(records[0].device_summary.utilization_gpu_sum, 40);
        assert_eq!(records[0].device_summary.utilization_memory_sum, 60);
        assert_eq!(records[0].device_summary.temperature_average, 70.0);
        assert_eq!(records[1].container_id.as_str(), "a");
        assert_eq!(records[1].device_summary, DeviceSummary::default());
    }

    #[test]
    fn test_record_wire_layout() {
        let devices = parse_device_statuses("0, 10, 20, 60\n1, 30, 40, 80").unwrap();
        let record = build_record(
            &container("abc", "/trainer", &["/dev/nvidia0", "/dev/nvidia1"]),
            &devices,
        );

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "containerid": "abc",
                "containername": "trainer",
                "labels": { "team": "ml" },
                "device": {
                    "Utilization": { "GPU": 40, "Memory": 60 },
                    "Temperature": 70.0,
                },
            })
        );
    }
}
