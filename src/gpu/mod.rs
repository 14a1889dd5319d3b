//! Attribution of GPU utilization to containers.
//!
//! A sampling cycle reads one status per physical GPU, then reduces the statuses of the GPUs
//! granted to each container into a single [`DeviceSummary`].
//!
//! # Key Components
//!
//! - [`parse_device_statuses`] — Parses the query tool's table into [`DeviceStatus`] values.
//! - [`match_devices`] — Selects the statuses belonging to a container from its host device paths.
//! - [`ContainerStatus`] — Holds the selected statuses and reduces them (sums and averages).
//! - [`NvidiaSmi`] — Runs the query tool, implementing [`DeviceQuery`].
//!
//! # Example
//!
//! ```rust
//! use nvdocker_monitor::gpu::{ContainerStatus, match_devices, parse_device_statuses};
//!
//! let devices = parse_device_statuses("0, 10, 20, 60\n1, 30, 40, 80").unwrap();
//! let mut status = ContainerStatus::new(&devices);
//! for position in match_devices(&["/dev/nvidia1", "/dev/null"], &devices) {
//!     status.add_device(position);
//! }
//! let summary = status.summary();
//! assert_eq!(summary.utilization_gpu_sum, 30);
//! assert_eq!(summary.temperature_average, 80.0);
//! ```
mod aggregate;
mod device;
mod error;
mod matcher;
mod query;

pub use aggregate::{ContainerStatus, DeviceSummary};
pub use device::{DeviceStatus, Utilization, parse_device_statuses};
pub use error::{DeviceField, DeviceParseError, QueryError};
pub use matcher::{device_index_from_path, match_devices};
pub use query::{DeviceQuery, NVIDIA_SMI_QUERY_ARGS, NvidiaSmi};
