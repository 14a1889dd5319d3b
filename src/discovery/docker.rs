use std::collections::HashMap;
use std::path::PathBuf;

use axum::http::StatusCode;

use crate::container::{ContainerID, ContainerInfo, ContainerName};
use crate::http;

use super::{ContainerInventory, Error};

/// Entry of `GET /containers/json`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedContainer {
    id: String,
}

/// Relevant subset of `GET /containers/{id}/json`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectedContainer {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    config: Option<ContainerConfig>,
    #[serde(default)]
    host_config: Option<HostConfig>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerConfig {
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostConfig {
    #[serde(default)]
    devices: Option<Vec<DeviceMapping>>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeviceMapping {
    path_on_host: String,
}

impl TryFrom<InspectedContainer> for ContainerInfo {
    type Error = crate::container::Error;

    fn try_from(container: InspectedContainer) -> Result<Self, Self::Error> {
        Ok(ContainerInfo {
            id: ContainerID::new(&container.id)?,
            name: ContainerName::new(&container.name),
            labels: container
                .config
                .and_then(|config| config.labels)
                .unwrap_or_default(),
            host_device_paths: container
                .host_config
                .and_then(|host_config| host_config.devices)
                .unwrap_or_default()
                .into_iter()
                .map(|device| device.path_on_host)
                .collect(),
        })
    }
}

/// Container inventory backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct Docker {
    socket_path: PathBuf,
}

impl Docker {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn get_json<T>(&self, uri: &str) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let (status, body) = http::get_unix(&self.socket_path, uri).await?;
        if status != StatusCode::OK {
            return Err(Error::Status {
                uri: uri.to_owned(),
                status,
                body: String::from_utf8_lossy(&body).trim().to_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            uri: uri.to_owned(),
            source,
        })
    }

    async fn inspect(&self, id: &str) -> Result<ContainerInfo, Error> {
        let inspected: InspectedContainer =
            self.get_json(&format!("/containers/{id}/json")).await?;
        Ok(ContainerInfo::try_from(inspected)?)
    }
}

impl ContainerInventory for Docker {
    /// Lists running containers and inspects each of them.
    ///
    /// Containers that cannot be inspected, e.g., because they stopped in between, are
    /// skipped.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, Error> {
        let listed: Vec<ListedContainer> = self.get_json("/containers/json").await?;
        log::debug!("Found {} running containers", listed.len());

        let mut containers = Vec::with_capacity(listed.len());
        for container in listed {
            match self.inspect(&container.id).await {
                Ok(info) => containers.push(info),
                Err(err) => log::warn!("failed to inspect container `{}`: {}", container.id, err),
            }
        }

        Ok(containers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::extract::Path;
    use axum::response::IntoResponse;
    use axum::routing::get;

    async fn list() -> impl IntoResponse {
        Json(serde_json::json!([
            { "Id": "aaa", "Names": ["/trainer"], "State": "running" },
            { "Id": "gone", "Names": ["/gone"], "State": "running" },
            { "Id": "bbb", "Names": ["/web"], "State": "running" },
        ]))
    }

    async fn inspect(Path(id): Path<String>) -> axum::response::Response {
        match id.as_str() {
            "aaa" => Json(serde_json::json!({
                "Id": "aaa",
                "Name": "/trainer",
                "Config": { "Labels": { "team": "ml" }, "Image": "cuda" },
                "HostConfig": {
                    "Devices": [
                        { "PathOnHost": "/dev/nvidia1", "PathInContainer": "/dev/nvidia1", "CgroupPermissions": "rwm" },
                        { "PathOnHost": "/dev/nvidiactl", "PathInContainer": "/dev/nvidiactl", "CgroupPermissions": "rwm" },
                    ],
                },
            }))
            .into_response(),
            "bbb" => Json(serde_json::json!({
                "Id": "bbb",
                "Name": "/web",
                "Config": { "Labels": null },
                "HostConfig": { "Devices": null },
            }))
            .into_response(),
            _ => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "message": "No such container" })),
            )
                .into_response(),
        }
    }

    async fn serve_fake_docker(router: axum::Router) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let socket_path = dir.path().join("docker.sock");
        let listener = tokio::net::UnixListener::bind(&socket_path).unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });
        (dir, socket_path)
    }

    #[tokio::test]
    async fn test_list_containers_inspects_running_containers() {
        let router = axum::Router::new()
            .route("/containers/json", get(list))
            .route("/containers/{id}/json", get(inspect));
        let (_dir, socket_path) = serve_fake_docker(router).await;

        let containers = Docker::new(&socket_path).list_containers().await.unwrap();

        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id.as_str(), "aaa");
        assert_eq!(containers[0].name.as_str(), "trainer");
        assert_eq!(containers[0].labels.get("team").map(String::as_str), Some("ml"));
        assert_eq!(
            containers[0].host_device_paths,
            vec!["/dev/nvidia1".to_owned(), "/dev/nvidiactl".to_owned()]
        );
        assert_eq!(containers[1].id.as_str(), "bbb");
        assert!(containers[1].labels.is_empty());
        assert!(containers[1].host_device_paths.is_empty());
    }

    #[tokio::test]
    async fn test_list_containers_reports_api_errors() {
        let router = axum::Router::new().route(
            "/containers/json",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "daemon unavailable") }),
        );
        let (_dir, socket_path) = serve_fake_docker(router).await;

        let err = Docker::new(&socket_path)
            .list_containers()
            .await
            .unwrap_err();
        match err {
            Error::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "daemon unavailable");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_containers_missing_socket() {
        let err = Docker::new("/definitely/does/not/exist.sock")
            .list_containers()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(http::Error::Connect { .. })));
    }

    #[test]
    fn test_inspected_container_conversion_defaults() {
        let inspected: InspectedContainer =
            serde_json::from_str(r#"{ "Id": "ccc", "Name": "/bare" }"#).unwrap();
        let info = ContainerInfo::try_from(inspected).unwrap();
        assert_eq!(info.name.as_str(), "bare");
        assert!(info.labels.is_empty());
        assert!(info.host_device_paths.is_empty());
    }
}
