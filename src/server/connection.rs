//! Individual HTTP client connection handling

use crate::command::Dispatcher;
use anyhow::Result;
use relay_shared::{codec::CodecError, Request, RequestDecoder, Response};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// One accepted client socket plus its partial-request buffer
pub struct HttpConnection {
    stream: TcpStream,
    addr: SocketAddr,
    decoder: RequestDecoder,
    read_buf: Vec<u8>,
}

impl HttpConnection {
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            stream,
            addr,
            decoder: RequestDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Read the next request from this connection
    ///
    /// Returns `None` once the peer has closed the connection or the read
    /// failed. Pipelined requests already buffered are returned before
    /// reading again.
    pub async fn recv(&mut self) -> Option<Result<Request, CodecError>> {
        loop {
            match self.decoder.decode_next() {
                Ok(Some(request)) => return Some(Ok(request)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }

            match self.stream.read(&mut self.read_buf).await {
                Ok(0) => {
                    if self.decoder.buffer_len() > 0 {
                        debug!(
                            "{} closed with {} bytes of partial request",
                            self.addr,
                            self.decoder.buffer_len()
                        );
                    }
                    return None;
                }
                Ok(n) => self.decoder.extend(&self.read_buf[..n]),
                Err(e) => {
                    warn!("Read error from {}: {}", self.addr, e);
                    return None;
                }
            }
        }
    }

    /// Write a complete response
    pub async fn send(&mut self, response: &Response) -> Result<()> {
        self.stream.write_all(&response.encode()).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

/// Serve requests on one connection until it closes, idles out or errors
pub async fn handle_connection(
    mut conn: HttpConnection,
    dispatcher: &Dispatcher,
    idle_timeout: Duration,
) -> Result<()> {
    let addr = conn.addr();
    debug!("Connection from {}", addr);

    loop {
        let next = match tokio::time::timeout(idle_timeout, conn.recv()).await {
            Ok(next) => next,
            Err(_) => {
                debug!("{} idle for {:?}, closing", addr, idle_timeout);
                break;
            }
        };

        let request = match next {
            Some(Ok(request)) => request,
            Some(Err(e)) => {
                warn!("Rejecting request from {}: {}", addr, e);
                let status = e.status();
                let response = Response::text(status, status.reason_phrase().to_lowercase());
                conn.send(&response.closing()).await?;
                break;
            }
            None => break,
        };

        let started = Instant::now();
        let keep_alive = request.keep_alive();

        let mut response = dispatcher.handle(&request).await;
        if !keep_alive {
            response = response.closing();
        }

        info!(
            "{} \"{} {}\" {} {}ms",
            addr,
            request.method,
            request.path,
            response.status.code(),
            started.elapsed().as_millis()
        );

        conn.send(&response).await?;
        if !keep_alive {
            break;
        }
    }

    debug!("Connection from {} closed", addr);
    Ok(())
}
