use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use super::error::QueryError;

/// Arguments selecting the columns expected by [`parse_device_statuses`](super::parse_device_statuses).
pub const NVIDIA_SMI_QUERY_ARGS: [&str; 2] = [
    "--query-gpu=index,utilization.gpu,utilization.memory,temperature.gpu",
    "--format=csv,noheader,nounits",
];

/// Source of the raw per-device status table.
pub trait DeviceQuery {
    fn query(&self) -> impl Future<Output = Result<String, QueryError>> + Send;
}

/// Runs `nvidia-smi` and captures its standard output.
#[derive(Debug, Clone)]
pub struct NvidiaSmi {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl NvidiaSmi {
    /// Creates a query for the `nvidia-smi` executable at `program`.
    ///
    /// # Arguments
    ///
    /// * `program` - Name or path of the executable, resolved through `PATH` if relative.
    /// * `timeout` - Upper bound for a single invocation. The process is killed when exceeded.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::with_args(program, NVIDIA_SMI_QUERY_ARGS, timeout)
    }

    /// Creates a query running `program` with custom arguments.
    pub fn with_args<I, A>(program: impl Into<PathBuf>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }
}

impl DeviceQuery for NvidiaSmi {
    async fn query(&self) -> Result<String, QueryError> {
        let before = std::time::Instant::now();
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| QueryError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| QueryError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        log::trace!(
            "`{}` took {} milliseconds",
            self.program.display(),
            before.elapsed().as_millis()
        );

        if !output.status.success() {
            return Err(QueryError::ExitStatus {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|source| QueryError::Utf8 {
            program: self.program.clone(),
            source,
        })
    }
}
