//! Container inventory.
//!
//! Provides the running containers together with the host devices each one was granted.
mod docker;

pub use docker::Docker;

use axum::http::StatusCode;

use crate::container::ContainerInfo;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] crate::http::Error),
    #[error("request `{uri}` returned {status}: {body}")]
    Status {
        uri: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode response of `{uri}`: {source}")]
    Decode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Container(#[from] crate::container::Error),
}

/// Source of the running containers for a sampling cycle.
pub trait ContainerInventory {
    fn list_containers(&self) -> impl Future<Output = Result<Vec<ContainerInfo>, Error>> + Send;
}
