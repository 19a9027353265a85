//! Health probes for the managed services

use aiserver_core::{AiServerError, AiServerResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on a single probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceHealth {
    Running,
    NotResponding,
}

impl std::fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceHealth::Running => write!(f, "Running"),
            ServiceHealth::NotResponding => write!(f, "Not responding"),
        }
    }
}

/// HTTP health checker with a hard per-request timeout
pub struct HealthChecker {
    /// HTTP client for health checks
    client: reqwest::Client,
    /// Timeout duration
    timeout: Duration,
}

impl HealthChecker {
    /// Create a new health checker
    pub fn new(timeout: Duration) -> AiServerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AiServerError::Supervisor(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Probe `url`; any transport error, timeout or non-2xx status counts as
    /// not responding
    pub async fn check(&self, url: &str) -> ServiceHealth {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(endpoint = %url, "Health check passed");
                ServiceHealth::Running
            }
            Ok(response) => {
                warn!(
                    endpoint = %url,
                    status = %response.status(),
                    "Health check failed"
                );
                ServiceHealth::NotResponding
            }
            Err(e) => {
                warn!(
                    endpoint = %url,
                    error = %e,
                    "Health check error"
                );
                ServiceHealth::NotResponding
            }
        }
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_health_checker_creation() {
        let checker = HealthChecker::new(Duration::from_secs(10)).unwrap();
        assert_eq!(checker.timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_healthy_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/health").with_status(200).create();

        let checker = HealthChecker::new(PROBE_TIMEOUT).unwrap();
        let url = format!("{}/health", server.url());
        assert_eq!(checker.check(&url).await, ServiceHealth::Running);
    }

    #[tokio::test]
    async fn test_error_status_is_not_responding() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/api/ping").with_status(503).create();

        let checker = HealthChecker::new(PROBE_TIMEOUT).unwrap();
        let url = format!("{}/api/ping", server.url());
        assert_eq!(checker.check(&url).await, ServiceHealth::NotResponding);
    }

    #[tokio::test]
    async fn test_closed_port_is_not_responding() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let checker = HealthChecker::new(PROBE_TIMEOUT).unwrap();
        let url = format!("http://127.0.0.1:{}/health", port);
        assert_eq!(checker.check(&url).await, ServiceHealth::NotResponding);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let checker = HealthChecker::new(Duration::from_millis(300)).unwrap();
        let started = Instant::now();
        let url = format!("http://127.0.0.1:{}/health", port);
        assert_eq!(checker.check(&url).await, ServiceHealth::NotResponding);
        assert!(started.elapsed() < Duration::from_secs(3));
        hold.abort();
    }
}
