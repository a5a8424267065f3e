//! Health probe for the external job executor.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HealthState {
    Healthy { latency_ms: u64 },
    /// The executor answered with a non-success status.
    Unhealthy { status: u16 },
    /// No answer within the timeout, or the connection failed.
    Unreachable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutorHealth {
    #[serde(flatten)]
    pub state: HealthState,
    pub checked_at: DateTime<Utc>,
}

impl ExecutorHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self.state, HealthState::Healthy { .. })
    }
}

/// Probes `GET {base_url}/health` with a bounded wait.
#[derive(Debug, Clone)]
pub struct ExecutorProbe {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ExecutorProbe {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Hit the health endpoint. Never fails: errors become `Unreachable`.
    pub async fn check(&self) -> ExecutorHealth {
        let url = format!("{}/health", self.base_url);
        let started = Instant::now();

        let state = match tokio::time::timeout(self.timeout, self.client.get(&url).send()).await {
            Err(_) => HealthState::Unreachable {
                reason: format!("no response within {}ms", self.timeout.as_millis()),
            },
            Ok(Err(e)) => HealthState::Unreachable {
                reason: e.to_string(),
            },
            Ok(Ok(resp)) if resp.status().is_success() => HealthState::Healthy {
                latency_ms: started.elapsed().as_millis() as u64,
            },
            Ok(Ok(resp)) => HealthState::Unhealthy {
                status: resp.status().as_u16(),
            },
        };

        if !matches!(state, HealthState::Healthy { .. }) {
            tracing::warn!(url = %url, state = ?state, "executor health probe failed");
        }

        ExecutorHealth {
            state,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn healthy_executor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = ExecutorProbe::new(format!("{}/", server.uri()), Duration::from_secs(2));
        let health = probe.check().await;
        assert!(health.is_healthy());
    }

    #[tokio::test]
    async fn error_status_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let health = ExecutorProbe::new(server.uri(), Duration::from_secs(2)).check().await;
        assert_eq!(health.state, HealthState::Unhealthy { status: 503 });
    }

    #[tokio::test]
    async fn slow_executor_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let health = ExecutorProbe::new(server.uri(), Duration::from_millis(100)).check().await;
        assert!(matches!(health.state, HealthState::Unreachable { .. }));
    }
}
