use super::DeviceStatus;

/// Reduced view of all devices attributed to one container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceSummary {
    pub utilization_gpu_sum: u64,
    pub utilization_memory_sum: u64,
    /// Mean temperature of the devices, `0.0` for a container without devices.
    pub temperature_average: f64,
}

/// Devices attributed to a single container during one sampling cycle.
///
/// Devices are held as positions into the cycle's device slice, which the status borrows, so a
/// status can never outlive or mix samples.
#[derive(Debug, Clone)]
pub struct ContainerStatus<'a> {
    sample: &'a [DeviceStatus],
    devices: Vec<usize>,
}

impl<'a> ContainerStatus<'a> {
    /// Creates an empty status over the devices of the current sample.
    pub fn new(sample: &'a [DeviceStatus]) -> Self {
        Self {
            sample,
            devices: Vec::new(),
        }
    }

    /// Adds the device at `position` in the sample.
    ///
    /// Positions are expected to come from [`match_devices`](super::match_devices) over the
    /// same sample. A position outside the sample is ignored.
    pub fn add_device(&mut self, position: usize) {
        if position >= self.sample.len() {
            log::debug!(
                "ignoring device position {} outside of a sample of {} devices",
                position,
                self.sample.len()
            );
            return;
        }
        self.devices.push(position);
    }

    /// Returns the number of held devices, counting repeats.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterates over the held devices in insertion order.
    pub fn devices(&self) -> impl Iterator<Item = &'a DeviceStatus> + '_ {
        let sample = self.sample;
        self.devices.iter().map(move |&position| &sample[position])
    }

    pub fn gpu_utilization_sum(&self) -> u64 {
        self.prop_sum(|device| device.utilization.gpu)
    }

    pub fn memory_utilization_sum(&self) -> u64 {
        self.prop_sum(|device| device.utilization.memory)
    }

    pub fn temperature_average(&self) -> f64 {
        self.prop_average(|device| device.temperature)
    }

    /// Sums the selected property over all held devices. Zero if there are none.
    ///
    /// Saturates at `u64::MAX`.
    pub fn prop_sum(&self, prop: impl Fn(&DeviceStatus) -> u64) -> u64 {
        self.devices()
            .map(prop)
            .fold(0, |sum, value| sum.saturating_add(value))
    }

    /// Averages the selected property over all held devices. Zero if there are none.
    pub fn prop_average(&self, prop: impl Fn(&DeviceStatus) -> u64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.devices().map(|device| prop(device) as f64).sum();
        sum / self.len() as f64
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            utilization_gpu_sum: self.gpu_utilization_sum(),
            utilization_memory_sum: self.memory_utilization_sum(),
            temperature_average: self.temperature_average(),
        }
    }
}
