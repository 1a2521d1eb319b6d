//! Generic line server: `Created` → `Running` → `Stopped`, a bounded
//! connection-admission semaphore, and a read-until-delimiter framing
//! primitive shared by the client-facing port (`\n`) and the replication
//! port (`\r`).

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

pub type HandlerFuture = Pin<Box<dyn Future<Output = String> + Send>>;
pub type Handler = Arc<dyn Fn(Uuid, String) -> HandlerFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Running,
    Stopped,
}

/// A single framed-line TCP server. One instance serves one address with
/// one delimiter; the client-facing and replication servers are two
/// separate instances of this same type.
pub struct TcpServer {
    address: String,
    terminator: u8,
    max_connections: usize,
    handler: Handler,
    state: Mutex<State>,
    shutdown: Notify,
}

impl TcpServer {
    pub fn new(address: impl Into<String>, max_connections: usize, terminator: u8, handler: Handler) -> Arc<Self> {
        Arc::new(TcpServer {
            address: address.into(),
            terminator,
            max_connections,
            handler,
            state: Mutex::new(State::Created),
            shutdown: Notify::new(),
        })
    }

    /// Binds the listener and spawns the accept loop. Returns once the
    /// listener is bound (not once the accept loop exits).
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state != State::Created {
                return Err(Error::Io(std::io::Error::other("server already started")));
            }
            *state = State::Running;
        }

        let listener = TcpListener::bind(&self.address).await?;
        tracing::info!("server listening on {}", self.address);

        let admission = Arc::new(Semaphore::new(self.max_connections));
        let server = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = server.shutdown.notified() => {
                        debug!("accept loop for {} observed shutdown", server.address);
                        break;
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                let server = server.clone();
                                let admission = admission.clone();
                                tokio::spawn(async move {
                                    server.handle_connection(stream, peer, admission).await;
                                });
                            }
                            Err(e) => warn!("accept error on {}: {e}", server.address),
                        }
                    }
                }
            }
            *server.state.lock().await = State::Stopped;
        });

        Ok(())
    }

    /// Idempotent: stopping a server that is `Created` or already
    /// `Stopped` is a no-op, matching the reference's "stop on nil
    /// listener" behavior.
    pub async fn stop(&self) {
        let state = *self.state.lock().await;
        if state == State::Running {
            self.shutdown.notify_one();
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, admission: Arc<Semaphore>) {
        let _permit = match admission.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        debug!("connection admitted: {peer}");

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        loop {
            let line = match read_framed(&mut reader, self.terminator).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("read error from {peer}: {e}");
                    break;
                }
            };

            let request_id = Uuid::new_v4();
            let response = (self.handler)(request_id, line).await;

            if let Err(e) = write_half.write_all(response.as_bytes()).await {
                warn!("write error to {peer}: {e}");
                break;
            }
        }

        debug!("connection closed: {peer}");
    }
}

async fn read_framed<R>(reader: &mut R, terminator: u8) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let bytes_read = reader.read_until(terminator, &mut buf).await?;
    if bytes_read == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&terminator) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
