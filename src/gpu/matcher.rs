use super::DeviceStatus;

/// Prefix of the host device files backing NVIDIA GPUs, e.g., `/dev/nvidia0`.
const NVIDIA_DEVICE_PREFIX: &str = "/dev/nvidia";

/// Extracts the GPU index from a host device path of the form `/dev/nvidia<N>`.
///
/// The whole path must match: `/dev/nvidiactl`, `/dev/nvidia-uvm` or `/dev/nvidia0x` yield
/// `None`, as does an index too large to represent.
///
/// # Examples
///
/// ```
/// # use nvdocker_monitor::gpu::device_index_from_path;
/// assert_eq!(device_index_from_path("/dev/nvidia3"), Some(3));
/// assert_eq!(device_index_from_path("/dev/nvidiactl"), None);
/// ```
pub fn device_index_from_path(path: &str) -> Option<usize> {
    let digits = path.strip_prefix(NVIDIA_DEVICE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Selects the devices granted to a container.
///
/// Returns positions into `devices`, in the order the paths are given. Paths that are not GPU
/// device files and GPU indices outside of `devices` are dropped. Repeated paths are selected
/// repeatedly.
pub fn match_devices<S>(host_device_paths: &[S], devices: &[DeviceStatus]) -> Vec<usize>
where
    S: AsRef<str>,
{
    host_device_paths
        .iter()
        .filter_map(|path| device_index_from_path(path.as_ref()))
        .filter(|&index| {
            let present = index < devices.len();
            if !present {
                log::debug!(
                    "GPU {} is granted but missing from the current sample of {} devices",
                    index,
                    devices.len()
                );
            }
            present
        })
        .collect()
}
