//! RPC plumbing shared by every command.
//!
//! [`Transport`] is the capability the rest of the crate consumes: one
//! synchronous call per request plus an explicit close. [`RpcClient`] is the
//! TCP implementation used by the binary; tests substitute their own.

pub mod client;
pub mod codec;

pub use client::RpcClient;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// A synchronous remote-call capability.
///
/// Implementations must tolerate concurrent callers. Calls may be serialized
/// internally.
pub trait Transport: Send + Sync {
    /// Invoke `method` with a single argument and return the raw result.
    fn call(&self, method: &str, params: Value) -> Result<Value>;

    /// Release the underlying connection. Calling it twice is not an error.
    fn close(&self) -> Result<()>;
}

/// Typed helpers on top of [`Transport`].
pub trait TransportExt: Transport {
    /// Serialize `request`, invoke `method`, and decode the result.
    fn call_typed<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let params = serde_json::to_value(request)?;
        let result = self.call(method, params)?;
        Ok(serde_json::from_value(result)?)
    }
}

impl<T: Transport + ?Sized> TransportExt for T {}

#[cfg(test)]
pub mod mock {
    //! In-process transport and a loopback manager for unit tests.

    use super::Transport;
    use super::codec::{Request, Response};
    use crate::error::{PoolctlError, Result};
    use serde_json::Value;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    type Handler = Box<dyn Fn(&str, &Value) -> Result<Value> + Send + Sync>;

    /// Answers calls from a closure and records every call it sees.
    pub struct MockTransport {
        handler: Handler,
        calls: Mutex<Vec<(String, Value)>>,
        closed: AtomicBool,
    }

    impl MockTransport {
        pub fn new(handler: impl Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static) -> Self {
            Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }
        }

        /// Every `(method, params)` pair received, in arrival order.
        pub fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls received for one method.
        pub fn calls_to(&self, method: &str) -> Vec<Value> {
            self.calls()
                .into_iter()
                .filter(|(m, _)| m == method)
                .map(|(_, p)| p)
                .collect()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    /// Loopback manager that answers every request on its own thread.
    ///
    /// `reply` may sleep to simulate a slow pool; returning `None` leaves the
    /// request unanswered. Returns the `host:port` to dial.
    pub fn serve_concurrently(
        reply: impl Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let reply = Arc::new(reply);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { return };
                let reply = Arc::clone(&reply);
                thread::spawn(move || {
                    let writer = Arc::new(Mutex::new(stream.try_clone().unwrap()));
                    let mut reader = BufReader::new(stream);
                    let mut line = String::new();
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).unwrap_or(0) == 0 {
                            return;
                        }
                        let request = Request::from_line(&line).unwrap();
                        let reply = Arc::clone(&reply);
                        let writer = Arc::clone(&writer);
                        thread::spawn(move || {
                            if let Some(response) = reply(&request) {
                                let line = response.to_line().unwrap();
                                let _ = writer.lock().unwrap().write_all(line.as_bytes());
                            }
                        });
                    }
                });
            }
        });
        addr
    }

    impl Transport for MockTransport {
        fn call(&self, method: &str, params: Value) -> Result<Value> {
            if self.is_closed() {
                return Err(PoolctlError::Protocol("connection closed".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params.clone()));
            (self.handler)(method, &params)
        }

        fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}
