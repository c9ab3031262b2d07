//! TCP accept loop

use super::connection::{handle_connection, HttpConnection};
use crate::command::Dispatcher;
use anyhow::Result;
use relay_shared::defaults;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// How long open connections get to finish after shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Pause after a failed accept; errors like EMFILE repeat until a socket frees up
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts clients and serves each connection on its own task
pub struct RelayServer {
    dispatcher: Arc<Dispatcher>,
    idle_timeout: Duration,
}

impl RelayServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            idle_timeout: Duration::from_millis(defaults::IDLE_TIMEOUT_MS),
        }
    }

    #[cfg(test)]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections still open at shutdown get a short grace period and are
    /// then aborted.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr()?;
        info!(
            "Relay listening on {} ({} vehicles)",
            local,
            self.dispatcher.vehicle_count()
        );

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let dispatcher = self.dispatcher.clone();
                        let idle_timeout = self.idle_timeout;
                        connections.spawn(async move {
                            let conn = HttpConnection::new(stream, addr);
                            if let Err(e) = handle_connection(conn, &dispatcher, idle_timeout).await {
                                warn!("Connection {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => accept_failed(e).await,
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!("Connection task failed: {}", e);
                    }
                }
            }
        }

        drop(listener);

        let open = connections.len();
        if open > 0 {
            info!("Waiting for {} open connections", open);
            let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
                while connections.join_next().await.is_some() {}
            })
            .await;

            if drained.is_err() {
                warn!("Aborting {} connections after grace period", connections.len());
                connections.abort_all();
            }
        }

        info!("Relay stopped");
        Ok(())
    }
}

async fn accept_failed(e: std::io::Error) {
    warn!("Accept failed: {} (retrying in {:?})", e, ACCEPT_BACKOFF);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LiveConfig, Settings};
    use crate::vehicle::mock::{MockCall, MockVehicle};
    use crate::vehicle::Vehicle;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    const BODY: &str = r#"{"AuthToken": "secret"}"#;

    struct Running {
        addr: SocketAddr,
        vehicle: Arc<MockVehicle>,
        stop: oneshot::Sender<()>,
        task: JoinHandle<Result<()>>,
    }

    async fn start(idle_timeout: Duration) -> Running {
        let vehicle = MockVehicle::new("car-0").shared();
        let config = LiveConfig::new(Settings {
            auth_tokens: vec!["secret".into()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(config, vec![vehicle.clone() as Arc<dyn Vehicle>]);
        let server = RelayServer::new(Arc::new(dispatcher)).with_idle_timeout(idle_timeout);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = stopped.await;
                })
                .await
        });

        Running {
            addr,
            vehicle,
            stop,
            task,
        }
    }

    fn post(path: &str, body: &str, connection: &str) -> String {
        format!(
            "POST {} HTTP/1.1\r\nHost: relay\r\nConnection: {}\r\nContent-Length: {}\r\n\r\n{}",
            path,
            connection,
            body.len(),
            body
        )
    }

    async fn exchange(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut out))
            .await
            .expect("server closed the connection")
            .unwrap();
        out
    }

    async fn stop(running: Running) {
        running.stop.send(()).unwrap();
        running.task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_error_backs_off() {
        let started = tokio::time::Instant::now();

        accept_failed(std::io::Error::from_raw_os_error(24)).await;

        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let running = start(Duration::from_secs(5)).await;

        let response = exchange(running.addr, &post("/lock/0", BODY, "close")).await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.ends_with("\r\n\r\nok\n"));
        assert_eq!(running.vehicle.calls(), vec![MockCall::LockDoors]);

        stop(running).await;
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let running = start(Duration::from_secs(5)).await;

        let cases = [
            (post("/lock/1", BODY, "close"), "404 Not Found", "vehicle not found\n"),
            (
                post("/lock/0", r#"{"AuthToken": "nope"}"#, "close"),
                "403 Forbidden",
                "unauthorized\n",
            ),
            (
                post("/set_charge_limit/0/150", BODY, "close"),
                "400 Bad Request",
                "invalid charge limit\n",
            ),
            (post("/warp/0", BODY, "close"), "404 Not Found", "not found\n"),
            (
                "GET /lock/0 HTTP/1.1\r\nConnection: close\r\n\r\n".to_string(),
                "405 Method Not Allowed",
                "method not allowed\n",
            ),
        ];

        for (raw, status, body) in &cases {
            let response = exchange(running.addr, raw).await;
            assert!(
                response.starts_with(&format!("HTTP/1.1 {}\r\n", status)),
                "{}",
                response
            );
            assert!(response.ends_with(body), "{}", response);
        }
        assert!(running.vehicle.calls().is_empty());

        stop(running).await;
    }

    #[tokio::test]
    async fn test_keep_alive_serves_pipelined_requests() {
        let running = start(Duration::from_secs(5)).await;

        let raw = format!(
            "{}{}",
            post("/honk/0", BODY, "keep-alive"),
            post("/flash/0", BODY, "close")
        );
        let response = exchange(running.addr, &raw).await;

        assert_eq!(response.matches("HTTP/1.1 200 OK\r\n").count(), 2);
        assert_eq!(
            running.vehicle.calls(),
            vec![MockCall::HonkHorn, MockCall::FlashLights]
        );

        stop(running).await;
    }

    #[tokio::test]
    async fn test_malformed_request_closes_connection() {
        let running = start(Duration::from_secs(5)).await;

        let response = exchange(running.addr, "NONSENSE\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{}", response);
        assert!(response.contains("Connection: close\r\n"));

        stop(running).await;
    }

    #[tokio::test]
    async fn test_idle_connection_is_closed() {
        let running = start(Duration::from_millis(50)).await;

        let mut stream = TcpStream::connect(running.addr).await.unwrap();
        let mut out = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
            .await
            .expect("idle connection should be closed");

        assert_eq!(read.unwrap(), 0);

        stop(running).await;
    }
}
