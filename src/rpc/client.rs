//! TCP client for the manager's RPC endpoint.
//!
//! Calls from any thread share one connection. Only sending is serialized: a
//! reader thread owns the read half and hands every response to the caller
//! waiting on its id, so one slow call never holds up the others.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::Transport;
use super::codec::{Request, Response};
use crate::error::{PoolctlError, Result};

/// Default buffer size for the connection (64KB).
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

type Reply = Result<Response>;

/// Calls waiting for a response, keyed by request id.
#[derive(Default)]
struct Pending {
    waiting: HashMap<u64, Sender<Reply>>,
    /// Set once the connection stops taking calls.
    closed: Option<String>,
}

impl Pending {
    /// Refuse new calls and fail every waiting one with `reason`.
    fn shut(&mut self, reason: &str) {
        if self.closed.is_none() {
            self.closed = Some(reason.to_string());
        }
        for (_, waiter) in self.waiting.drain() {
            let _ = waiter.send(Err(PoolctlError::Protocol(reason.to_string())));
        }
    }
}

fn lock_pending(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    // The map stays consistent even if a holder panicked.
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn shutdown_stream(stream: &TcpStream) -> io::Result<()> {
    match stream.shutdown(Shutdown::Both) {
        Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
        _ => Ok(()),
    }
}

/// Reader thread body: route responses until the connection ends.
fn route_responses(stream: TcpStream, pending: Arc<Mutex<Pending>>) {
    let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream);
    let mut line = String::with_capacity(4096);

    let reason = loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break "connection closed by manager".to_string(),
            Ok(_) => {}
            Err(e) => break format!("connection lost: {e}"),
        }
        let response = match Response::from_line(&line) {
            Ok(response) => response,
            Err(e) => break e.to_string(),
        };

        let waiter = lock_pending(&pending).waiting.remove(&response.id);
        match waiter {
            Some(waiter) => {
                let _ = waiter.send(Ok(response));
            }
            // Late reply to a call that already timed out.
            None => debug!(id = response.id, "dropping response nobody waits for"),
        }
    };

    debug!(%reason, "RPC reader stopped");
    lock_pending(&pending).shut(&reason);
}

/// Line-delimited JSON-RPC client over one TCP connection.
///
/// Any number of threads may call concurrently; responses are matched to
/// callers by request id, in whatever order the manager sends them.
pub struct RpcClient {
    addr: String,
    stream: TcpStream,
    writer: Mutex<BufWriter<TcpStream>>,
    pending: Arc<Mutex<Pending>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    timeout: Option<Duration>,
}

/// Aborts the calls of an [`RpcClient`] from another thread, such as a signal handler.
pub struct Interrupter {
    stream: TcpStream,
}

impl Interrupter {
    /// Shut the connection down. Waiting calls fail at once, later calls too.
    pub fn interrupt(&self) {
        if let Err(e) = shutdown_stream(&self.stream) {
            debug!(error = %e, "failed to interrupt RPC connection");
        }
    }
}

impl RpcClient {
    /// Connect to `addr` (`host:port`).
    ///
    /// `timeout` bounds the connect, every write, and the wait for each
    /// response. `None` waits indefinitely.
    pub fn connect(addr: &str, timeout: Option<Duration>) -> Result<Self> {
        let connect_err = |source: io::Error| PoolctlError::Connect {
            addr: addr.to_string(),
            source,
        };

        let candidates: Vec<_> = addr.to_socket_addrs().map_err(connect_err)?.collect();
        let mut last_err =
            io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing");
        let mut stream = None;
        for candidate in candidates {
            let attempt = match timeout {
                Some(t) => TcpStream::connect_timeout(&candidate, t),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = e,
            }
        }
        let stream = stream.ok_or_else(|| connect_err(last_err))?;

        stream.set_nodelay(true)?;
        // Reads idle between calls, so only writes carry the socket timeout.
        stream.set_write_timeout(timeout)?;

        let pending = Arc::new(Mutex::new(Pending::default()));
        let read_half = stream.try_clone()?;
        let routes = Arc::clone(&pending);
        let reader = thread::Builder::new()
            .name("rpc-reader".to_string())
            .spawn(move || route_responses(read_half, routes))?;

        let writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, stream.try_clone()?);
        debug!(addr, "connected to RPC endpoint");

        Ok(Self {
            addr: addr.to_string(),
            stream,
            writer: Mutex::new(writer),
            pending,
            reader: Mutex::new(Some(reader)),
            next_id: AtomicU64::new(0),
            timeout,
        })
    }

    /// Address this client is connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Handle that can abort this client's calls from any thread.
    pub fn interrupter(&self) -> Result<Interrupter> {
        Ok(Interrupter {
            stream: self.stream.try_clone()?,
        })
    }

    fn send(&self, line: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| PoolctlError::Protocol("connection lock poisoned".to_string()))?;
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn closed_error(&self) -> PoolctlError {
        let reason = lock_pending(&self.pending)
            .closed
            .clone()
            .unwrap_or_else(|| "connection closed".to_string());
        PoolctlError::Protocol(reason)
    }

    fn wait(&self, request: &Request, replies: Receiver<Reply>) -> Result<Response> {
        let Some(timeout) = self.timeout else {
            return replies.recv().map_err(|_| self.closed_error())?;
        };
        match replies.recv_timeout(timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                lock_pending(&self.pending).waiting.remove(&request.id);
                Err(PoolctlError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!(
                        "{} got no response within {}s",
                        request.method,
                        timeout.as_secs_f32()
                    ),
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(self.closed_error()),
        }
    }
}

impl Transport for RpcClient {
    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = Request::new(self.next_id.fetch_add(1, Ordering::Relaxed), method, params);
        let line = request.to_line()?;

        let (waiter, replies) = mpsc::channel();
        {
            let mut pending = lock_pending(&self.pending);
            if let Some(reason) = &pending.closed {
                return Err(PoolctlError::Protocol(reason.clone()));
            }
            pending.waiting.insert(request.id, waiter);
        }

        trace!(id = request.id, method, "rpc call");
        if let Err(e) = self.send(&line) {
            lock_pending(&self.pending).waiting.remove(&request.id);
            return Err(e);
        }

        let response = self.wait(&request, replies)?;
        response.into_result(&request)
    }

    fn close(&self) -> Result<()> {
        lock_pending(&self.pending).shut("connection already closed");
        let reader = match self.reader.lock() {
            Ok(mut reader) => reader.take(),
            Err(_) => None,
        };
        let Some(reader) = reader else {
            return Ok(());
        };

        debug!(addr = %self.addr, "closing RPC connection");
        shutdown_stream(&self.stream)?;
        if reader.join().is_err() {
            warn!("RPC reader thread panicked");
        }
        Ok(())
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
