//! Parsing of the per-device status table reported by the GPU query tool.
//!
//! The input is the output of
//! `nvidia-smi --query-gpu=index,utilization.gpu,utilization.memory,temperature.gpu --format=csv,noheader,nounits`,
//! i.e., one device per line with four comma-separated integer columns:
//!
//! ```text
//! 0, 10, 20, 60
//! 1, 30, 40, 80
//! ```
//!
//! # Parsing rules
//!
//! - Lines that do not consist of exactly four fields are skipped. The tool may emit blank or
//!   diagnostic lines which carry no device data.
//! - Within a four-field line every value must be an unsigned decimal integer of at most 64
//!   bits, without sign. A single malformed value fails the whole parse and no partial result
//!   is returned.
//!
//! # Examples
//!
//! ```rust
//! use nvdocker_monitor::gpu::parse_device_statuses;
//!
//! let devices = parse_device_statuses("0, 10, 20, 60\n1, 30, 40, 80\n").unwrap();
//! assert_eq!(devices.len(), 2);
//! assert_eq!(devices[1].utilization.gpu, 30);
//! assert_eq!(devices[1].temperature, 80);
//! ```

use super::error::{DeviceField, DeviceParseError};

/// Number of columns requested from the query tool.
const FIELD_COUNT: usize = 4;

/// Utilization percentages of a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Utilization {
    /// Percent of time a kernel was executing on the device.
    pub gpu: u64,
    /// Percent of time device memory was being read or written.
    pub memory: u64,
}

/// Instantaneous reading of one physical GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    /// Index as reported by the query tool. `None` if never set.
    pub index: Option<u64>,
    /// Core temperature in degrees Celsius.
    pub temperature: u64,
    pub utilization: Utilization,
}

/// Parses the raw query output into device statuses, preserving line order.
///
/// The position of a status in the returned vector is the position of its line among the
/// accepted (four-field) lines.
///
/// # Errors
///
/// Returns [`DeviceParseError::MalformedNumericField`] if any field of a four-field line is
/// not an unsigned decimal integer.
pub fn parse_device_statuses(raw: &str) -> Result<Vec<DeviceStatus>, DeviceParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut devices = Vec::with_capacity(raw.lines().count());
    for (lineno, line) in raw.split('\n').enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        let Ok(fields) = <[&str; FIELD_COUNT]>::try_from(fields) else {
            log::trace!("skipping device status line {}: `{}`", lineno + 1, line);
            continue;
        };
        devices.push(parse_device_line(fields, lineno + 1)?);
    }

    Ok(devices)
}

fn parse_device_line(
    [index, gpu, memory, temperature]: [&str; FIELD_COUNT],
    lineno: usize,
) -> Result<DeviceStatus, DeviceParseError> {
    Ok(DeviceStatus {
        index: Some(parse_field(index, DeviceField::Index, lineno)?),
        temperature: parse_field(temperature, DeviceField::Temperature, lineno)?,
        utilization: Utilization {
            gpu: parse_field(gpu, DeviceField::UtilizationGpu, lineno)?,
            memory: parse_field(memory, DeviceField::UtilizationMemory, lineno)?,
        },
    })
}

fn parse_field(value: &str, field: DeviceField, line: usize) -> Result<u64, DeviceParseError> {
    let value = value.trim();
    let malformed = |source| DeviceParseError::MalformedNumericField {
        field,
        value: value.to_owned(),
        line,
        source,
    };

    // `u64::from_str` would also accept a leading `+`.
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(None));
    }
    value.parse::<u64>().map_err(|err| malformed(Some(err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_table() {
        let data = "0, 10, 20, 60\n1, 30, 40, 80\n2, 0, 0, 35";
        let devices = parse_device_statuses(data).unwrap();

        assert_eq!(devices.len(), 3);
        assert_eq!(
            devices[0],
            DeviceStatus {
                index: Some(0),
                temperature: 60,
                utilization: Utilization { gpu: 10, memory: 20 },
            }
        );
        assert_eq!(devices[1].index, Some(1));
        assert_eq!(devices[1].utilization, Utilization { gpu: 30, memory: 40 });
        assert_eq!(devices[1].temperature, 80);
        assert_eq!(devices[2].index, Some(2));
        assert_eq!(devices[2].temperature, 35);
    }

    #[test]
    fn test_parse_trims_whitespace_around_fields() {
        let data = "  0 ,\t55 ,  7,61  \n";
        let devices = parse_device_statuses(data).unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].utilization, Utilization { gpu: 55, memory: 7 });
        assert_eq!(devices[0].temperature, 61);
    }

    #[test]
    fn test_parse_skips_lines_with_wrong_field_count() {
        let data = "\
0, 10, 20, 60
1, 30, 40
2, 30, 40, 80, 5

No devices were found
3, 1, 2, 50
";
        let devices = parse_device_statuses(data).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].index, Some(0));
        assert_eq!(devices[1].index, Some(3));
        assert_eq!(devices[1].temperature, 50);
    }

    #[test]
    fn test_parse_malformed_numeric_field_fails_whole_parse() {
        let data = "1, 5, 5, 40\n0, abc, 10, 60\n2, 5, 5, 40";
        let err = parse_device_statuses(data).unwrap_err();

        match err {
            DeviceParseError::MalformedNumericField {
                field, value, line, ..
            } => {
                assert_eq!(field, DeviceField::UtilizationGpu);
                assert_eq!(value, "abc");
                assert_eq!(line, 2);
            }
        }
    }

    #[test]
    fn test_parse_rejects_negative_values() {
        let err = parse_device_statuses("0, 10, 20, -5").unwrap_err();
        assert!(matches!(
            err,
            DeviceParseError::MalformedNumericField {
                field: DeviceField::Temperature,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_signed_values() {
        let err = parse_device_statuses("0, +10, 20, 60").unwrap_err();
        match err {
            DeviceParseError::MalformedNumericField {
                field,
                value,
                source,
                ..
            } => {
                assert_eq!(field, DeviceField::UtilizationGpu);
                assert_eq!(value, "+10");
                assert!(source.is_none());
            }
        }
    }

    #[test]
    fn test_parse_rejects_empty_field() {
        let err = parse_device_statuses("0, , 20, 60").unwrap_err();
        assert!(matches!(
            err,
            DeviceParseError::MalformedNumericField {
                field: DeviceField::UtilizationGpu,
                source: None,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_accepts_values_beyond_32_bits() {
        let devices = parse_device_statuses("0, 10, 20, 4294967296").unwrap();
        assert_eq!(devices[0].temperature, 4_294_967_296);
    }

    #[test]
    fn test_parse_rejects_values_beyond_64_bits() {
        let err = parse_device_statuses("0, 18446744073709551616, 20, 60").unwrap_err();
        match err {
            DeviceParseError::MalformedNumericField { source, .. } => {
                assert!(source.is_some());
            }
        }
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_device_statuses("").unwrap().is_empty());
        assert!(parse_device_statuses("  \n\t\n ").unwrap().is_empty());
    }

    #[test]
    fn test_device_field_display() {
        assert_eq!(DeviceField::Index.to_string(), "index");
        assert_eq!(DeviceField::Temperature.to_string(), "temperature.gpu");
    }
}
