use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use sqlx::MySqlPool;

use crate::monitor::Monitor;
use crate::persistence;

mod models;

#[derive(Debug, serde::Deserialize)]
pub struct ExportParams {
    pub from: u64,
    pub to: u64,
}

#[derive(Debug, Clone)]
struct AppState {
    monitor: Arc<Monitor>,
    db: Option<DB>,
}

async fn list_containers(State(state): State<AppState>) -> Response {
    Json(state.monitor.records()).into_response()
}

async fn get_container(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.monitor.get(&id) {
        Some(record) => Json(record).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown container").into_response(),
    }
}

async fn export_stats(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Response {
    let Some(db) = state.db else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "persistence is not configured",
        )
            .into_response();
    };

    match db.query_by_time_range(params.from, params.to).await {
        Ok(containers) => {
            let mut body = HashMap::with_capacity(1);
            body.insert("containers", containers);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            log::error!("Failed to query container GPU stats: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to export stats",
            )
                .into_response()
        }
    }
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    /// Creates the API over the latest records in `monitor` and, if given, the persisted
    /// history in `db`.
    pub fn new(monitor: Arc<Monitor>, db: Option<MySqlPool>) -> Self {
        let state = AppState {
            monitor,
            db: db.map(DB::new),
        };
        let router = axum::Router::new()
            .route("/containers", get(list_containers))
            .route("/containers/{id}", get(get_container))
            .route("/export", get(export_stats))
            .with_state(state);
        Self { router }
    }

    /// Serves the API on an already bound listener.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> std::io::Result<()> {
        log::debug!("API listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service()).await
    }
}

#[derive(Debug, Clone)]
pub struct DB {
    db: MySqlPool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read database entry: {0}")]
    ReadError(#[source] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl DB {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }

    async fn query_by_time_range(
        &self,
        from: u64,
        to: u64,
    ) -> Result<HashMap<String, models::ExportedContainer>> {
        let stats = sqlx::query_as::<_, persistence::ContainerGpuStats>(
            r#"
SELECT timestamp, container_id, container_name,
       utilization_gpu_sum, utilization_memory_sum, temperature_average
FROM container_gpu_stats
WHERE timestamp BETWEEN ? AND ?
ORDER BY container_id, timestamp
"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await
        .map_err(Error::ReadError)?;

        let labels = sqlx::query_as::<_, persistence::ContainerLabel>(
            r#"
SELECT container_id, label_key, label_value
FROM container_labels
WHERE container_id IN (
    SELECT DISTINCT container_id FROM container_gpu_stats
    WHERE timestamp BETWEEN ? AND ?
)
"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await
        .map_err(Error::ReadError)?;

        let mut out: HashMap<String, models::ExportedContainer> = HashMap::default();
        for stat in stats {
            let entry = out.entry(stat.container_id.clone()).or_default();
            entry.container_name.clone_from(&stat.container_name);
            entry.stats.push(stat.into());
        }
        for label in labels {
            if let Some(entry) = out.get_mut(&label.container_id) {
                entry.labels.insert(label.label_key, label.label_value);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::container::{ContainerID, ContainerName};
    use crate::gpu::DeviceSummary;
    use crate::record::ContainerRecord;

    fn server() -> APIServer {
        let monitor = Arc::new(Monitor::default());
        monitor.update(&[ContainerRecord {
            container_id: ContainerID::new("abc").unwrap(),
            container_name: ContainerName::new("/trainer"),
            labels: HashMap::from([("team".to_owned(), "ml".to_owned())]),
            device_summary: DeviceSummary {
                utilization_gpu_sum: 40,
                utilization_memory_sum: 60,
                temperature_average: 70.0,
            },
        }]);
        APIServer::new(monitor, None)
    }

    async fn get_request(server: APIServer, uri: &str) -> (StatusCode, axum::body::Bytes) {
        let response = server
            .router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_list_containers() {
        let (status, body) = get_request(server(), "/containers").await;

        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!([{
                "containerid": "abc",
                "containername": "trainer",
                "labels": { "team": "ml" },
                "device": {
                    "Utilization": { "GPU": 40, "Memory": 60 },
                    "Temperature": 70.0,
                },
            }])
        );
    }

    #[tokio::test]
    async fn test_get_container() {
        let (status, body) = get_request(server(), "/containers/abc").await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["containername"], "trainer");

        let (status, _) = get_request(server(), "/containers/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_without_database() {
        let (status, _) = get_request(server(), "/export?from=0&to=10").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
