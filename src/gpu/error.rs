//! Defines structured error types for reading GPU device status.
//!
//! - [`DeviceParseError`] covers the raw query table, where a malformed numeric field
//!   invalidates the whole sample.
//! - [`QueryError`] covers running the query tool itself.

use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Named columns of a device status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceField {
    Index,
    UtilizationGpu,
    UtilizationMemory,
    Temperature,
}

impl std::fmt::Display for DeviceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceField::Index => "index",
            DeviceField::UtilizationGpu => "utilization.gpu",
            DeviceField::UtilizationMemory => "utilization.memory",
            DeviceField::Temperature => "temperature.gpu",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceParseError {
    /// A field of a four-field line is not an unsigned decimal integer. `source` is `None` if
    /// the value contains anything but ASCII digits.
    #[error("invalid value for `{field}` at line {line}: '{value}'")]
    MalformedNumericField {
        field: DeviceField,
        value: String,
        line: usize,
        #[source]
        source: Option<ParseIntError>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    ExitStatus {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{program}` did not finish within {timeout:?}")]
    Timeout { program: PathBuf, timeout: Duration },
    #[error("`{program}` wrote non UTF-8 output: {source}")]
    Utf8 {
        program: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },
}
