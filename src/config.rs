//! Runtime configuration read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `DOCKER_SOCKET_PATH` | `/var/run/docker.sock` |
//! | `NVIDIA_SMI_PATH` | `nvidia-smi` |
//! | `QUERY_TIMEOUT_SECS` | `10` |
//! | `SAMPLE_INTERVAL_SECS` | `10` |
//! | `LISTEN_ADDR` | `0.0.0.0:3000` |
//! | `DATABASE_URL` | unset, records are only kept in memory |

use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DOCKER_SOCKET_PATH: &str = "/var/run/docker.sock";
const DEFAULT_NVIDIA_SMI_PATH: &str = "nvidia-smi";
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 10;
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{var}` is not a valid number of seconds: '{value}': {source}")]
    InvalidSeconds {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("environment variable `{var}` must be greater than zero")]
    ZeroDuration { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub docker_socket_path: PathBuf,
    pub nvidia_smi_path: PathBuf,
    pub query_timeout: Duration,
    pub sample_interval: Duration,
    pub listen_addr: String,
    pub database_url: Option<String>,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if a duration variable is not a positive integer.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let seconds = |var: &'static str, default: u64| -> Result<Duration, Error> {
            let secs = match lookup(var) {
                Some(value) => {
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|source| Error::InvalidSeconds {
                            var,
                            value: value.clone(),
                            source,
                        })?
                }
                None => default,
            };
            if secs == 0 {
                return Err(Error::ZeroDuration { var });
            }
            Ok(Duration::from_secs(secs))
        };

        Ok(Self {
            docker_socket_path: lookup("DOCKER_SOCKET_PATH")
                .unwrap_or_else(|| DEFAULT_DOCKER_SOCKET_PATH.to_owned())
                .into(),
            nvidia_smi_path: lookup("NVIDIA_SMI_PATH")
                .unwrap_or_else(|| DEFAULT_NVIDIA_SMI_PATH.to_owned())
                .into(),
            query_timeout: seconds("QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT_SECS)?,
            sample_interval: seconds("SAMPLE_INTERVAL_SECS", DEFAULT_SAMPLE_INTERVAL_SECS)?,
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        })
    }
}
