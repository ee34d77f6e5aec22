//! HTTP endpoints for watching a running pipeline.
//!
//! - `/metrics` serves the Prometheus text exposition.
//! - `/status` serves the latest [`MetricsSnapshot`] as JSON.
//! - `/health` answers 200 while heatmap frames keep arriving and 503
//!   before the first frame or once the frame counter stops moving.

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Errors that can occur while serving pipeline endpoints.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Server(String),
}

/// Where the exporter listens.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Socket address to bind.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Listens on all interfaces at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// Liveness of the heatmap stream as seen by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineHealth {
    /// No heatmap frame has been processed yet.
    Waiting,
    /// The heatmap counter advanced since the previous snapshot.
    Streaming,
    /// Two consecutive snapshots reported the same heatmap count.
    Stalled,
}

impl PipelineHealth {
    fn status_code(self) -> StatusCode {
        match self {
            PipelineHealth::Streaming => StatusCode::OK,
            PipelineHealth::Waiting | PipelineHealth::Stalled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Body of `/status`.
#[derive(Debug, Clone, Serialize)]
struct StatusReport {
    health: PipelineHealth,
    #[serde(flatten)]
    snapshot: MetricsSnapshot,
}

/// Registry and latest snapshot, shared between the pipeline and the
/// HTTP handlers.
pub struct MetricsState {
    registry: MetricsRegistry,
    snapshot: MetricsSnapshot,
    health: PipelineHealth,
}

impl MetricsState {
    fn new(registry: MetricsRegistry) -> Self {
        Self {
            registry,
            snapshot: MetricsSnapshot::default(),
            health: PipelineHealth::Waiting,
        }
    }

    /// Publishes a new snapshot.
    pub fn update(&mut self, snapshot: &MetricsSnapshot) {
        self.registry.update(snapshot);

        let health = if snapshot.heatmap_frames == 0 {
            PipelineHealth::Waiting
        } else if snapshot.heatmap_frames > self.snapshot.heatmap_frames {
            PipelineHealth::Streaming
        } else {
            PipelineHealth::Stalled
        };
        if health != self.health {
            tracing::info!(?health, frames = snapshot.heatmap_frames, "Pipeline health changed");
        }

        self.health = health;
        self.snapshot = snapshot.clone();
    }

    /// Health derived from the last two snapshots.
    pub fn health(&self) -> PipelineHealth {
        self.health
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> &MetricsSnapshot {
        &self.snapshot
    }
}

/// Serves `/metrics`, `/status` and `/health`.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: Arc<RwLock<MetricsState>>,
}

impl MetricsServer {
    /// Creates a server that exports `registry`.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState::new(registry))),
        }
    }

    /// Handle for publishing snapshots while the server runs.
    pub fn state(&self) -> Arc<RwLock<MetricsState>> {
        Arc::clone(&self.state)
    }

    /// Runs the server until it fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/metrics", get(prometheus_text))
            .route("/status", get(pipeline_status))
            .route("/health", get(pipeline_health))
            .layer(CorsLayer::permissive())
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(addr = %self.config.bind_addr, "Pipeline exporter listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

async fn prometheus_text(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    let state = state.read().await;

    match state.registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

async fn pipeline_status(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    let state = state.read().await;
    Json(StatusReport {
        health: state.health,
        snapshot: state.snapshot.clone(),
    })
}

async fn pipeline_health(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    let state = state.read().await;
    let body = match state.health {
        PipelineHealth::Waiting => "waiting for heatmap frames".to_string(),
        PipelineHealth::Streaming => format!(
            "streaming: {} frames, {} active cones",
            state.snapshot.heatmap_frames, state.snapshot.active_cones
        ),
        PipelineHealth::Stalled => format!(
            "stalled at {} frames",
            state.snapshot.heatmap_frames
        ),
    };
    (state.health.status_code(), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            heatmap_frames: n,
            active_cones: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        assert_eq!(MetricsServerConfig::default().bind_addr.port(), 9090);
    }

    #[test]
    fn test_health_follows_heatmap_counter() {
        let server = MetricsServer::new(
            MetricsServerConfig::with_port(0),
            MetricsRegistry::new().unwrap(),
        );
        let state = server.state();
        let mut guard = state.try_write().unwrap();
        assert_eq!(guard.health(), PipelineHealth::Waiting);

        guard.update(&frames(0));
        assert_eq!(guard.health(), PipelineHealth::Waiting);

        guard.update(&frames(4));
        assert_eq!(guard.health(), PipelineHealth::Streaming);
        assert_eq!(guard.snapshot().heatmap_frames, 4);
        assert_eq!(guard.health().status_code(), StatusCode::OK);

        guard.update(&frames(4));
        assert_eq!(guard.health(), PipelineHealth::Stalled);
        assert_eq!(guard.health().status_code(), StatusCode::SERVICE_UNAVAILABLE);

        guard.update(&frames(9));
        assert_eq!(guard.health(), PipelineHealth::Streaming);
    }

    #[test]
    fn test_snapshot_feeds_registry() {
        let mut state = MetricsState::new(MetricsRegistry::new().unwrap());
        state.update(&MetricsSnapshot {
            heatmap_frames: 3,
            rejected_contacts: 2,
            ..Default::default()
        });

        let text = state.registry.encode().unwrap();
        assert!(text.contains("digitizer_heatmap_frames_total 3"));
        assert!(text.contains("digitizer_contacts_rejected_total 2"));
    }
}
