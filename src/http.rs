use std::path::{Path, PathBuf};

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode, header};
use hyper_util::rt::TokioIo;

/// Upper bound for a buffered response body.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to socket `{path}`: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP handshake on `{path}` failed: {source}")]
    Handshake {
        path: PathBuf,
        #[source]
        source: hyper::Error,
    },
    #[error("failed to build request for `{uri}`: {source}")]
    Request {
        uri: String,
        #[source]
        source: axum::http::Error,
    },
    #[error("request `{uri}` failed: {source}")]
    Send {
        uri: String,
        #[source]
        source: hyper::Error,
    },
    #[error("failed to read response body of `{uri}`: {source}")]
    Body {
        uri: String,
        #[source]
        source: axum::Error,
    },
}

/// Issues a `GET` request over the unix domain socket at `path` and buffers the response.
///
/// Every request uses its own connection.
///
/// # Arguments
///
/// * `path` - Path to the unix socket, e.g., `/var/run/docker.sock`.
/// * `uri` - Origin-form request target, e.g., `/containers/json`.
///
/// # Errors
///
/// Returns an [`Error`] if connecting, sending, or reading the response fails. Non-success
/// status codes are returned to the caller and not treated as errors.
pub async fn get_unix(path: impl AsRef<Path>, uri: &str) -> Result<(StatusCode, Bytes), Error> {
    let path = path.as_ref();
    log::trace!("GET {} via {}", uri, path.display());
    let stream = tokio::net::UnixStream::connect(path)
        .await
        .map_err(|source| Error::Connect {
            path: path.to_path_buf(),
            source,
        })?;

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|source| Error::Handshake {
            path: path.to_path_buf(),
            source,
        })?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            log::warn!("unix socket connection closed with error: {}", err);
        }
    });

    let request = Request::get(uri)
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .map_err(|source| Error::Request {
            uri: uri.to_owned(),
            source,
        })?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|source| Error::Send {
            uri: uri.to_owned(),
            source,
        })?;

    let status = response.status();
    let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
        .await
        .map_err(|source| Error::Body {
            uri: uri.to_owned(),
            source,
        })?;

    Ok((status, body))
}
