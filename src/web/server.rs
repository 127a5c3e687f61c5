//! Web server for SMD.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::auth::SessionRegistry;
use crate::config::ServerConfig;
use crate::{Result, SmdError};

use super::handlers::AppState;
use super::router::create_router;

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    sweep_interval: Duration,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, app_state: AppState, sweep_interval: Duration) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| SmdError::Config(format!("invalid server address: {e}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            sweep_interval,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the background task that evicts expired sessions.
    pub fn start_session_sweep_task(
        sessions: Arc<SessionRegistry>,
        every: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;
                let removed = sessions.remove_expired_sessions();
                if removed == 0 {
                    tracing::debug!("No expired sessions to sweep");
                }
            }
        })
    }

    async fn bind(self) -> std::io::Result<(TcpListener, axum::Router)> {
        let sessions = Arc::clone(&self.app_state.sessions);
        let router = create_router(self.app_state);

        let listener = TcpListener::bind(self.addr).await?;

        Self::start_session_sweep_task(sessions, self.sweep_interval);
        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Session sweep task started"
        );

        Ok((listener, router))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::catalog::MemoryCatalog;
    use crate::file::{FileStorage, Ingestor};
    use tempfile::TempDir;

    fn create_test_state(temp: &TempDir) -> AppState {
        let storage = FileStorage::new(temp.path().join("store")).unwrap();
        let ingestor = Ingestor::new(Arc::new(MemoryCatalog::new()), Arc::new(storage), 1024);
        AppState::new(
            ingestor,
            Arc::new(SessionRegistry::new()),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };

        let server = WebServer::new(&config, create_test_state(&temp), Duration::from_secs(1))
            .unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            host: "not an address".to_string(),
            port: 0,
        };
        let result = WebServer::new(&config, create_test_state(&temp), Duration::from_secs(1));
        assert!(matches!(result, Err(SmdError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_run_with_addr() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = WebServer::new(&config, create_test_state(&temp), Duration::from_secs(1))
            .unwrap();

        let addr = server.run_with_addr().await.unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_sweep_task_evicts_expired_sessions() {
        let sessions = Arc::new(SessionRegistry::new());
        sessions
            .add(Session::issue("u1", Duration::from_millis(100)))
            .unwrap();
        sessions
            .add(Session::issue("u2", Duration::from_secs(3600)))
            .unwrap();

        let handle =
            WebServer::start_session_sweep_task(Arc::clone(&sessions), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(sessions.count(), 1);
        assert!(sessions.get_by_user_id("u2").is_some());
        handle.abort();
    }
}
