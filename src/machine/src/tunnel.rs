//! Forwarded channel to the remote container-runtime control socket.
//!
//! The tunnel binds a loopback TCP listener and bridges each accepted
//! connection onto a direct-streamlocal channel over the machine's SSH
//! connection. [`RuntimeClient`] speaks the runtime's HTTP API against the
//! local end; it sends `Connection: close` so every request maps onto one
//! bridged connection.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Deserialize;
use ssh2::Session;

use crate::error::MachineError;

/// Default control socket of the remote container runtime.
pub const DEFAULT_RUNTIME_SOCKET: &str = "/var/run/docker.sock";

/// Local end of a forwarded channel to the remote runtime socket.
pub struct RuntimeTunnel {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RuntimeTunnel {
    /// Bind a loopback listener and start the bridge thread. The session is
    /// shared with the owning machine; channels are opened per connection.
    pub fn open(session: Session, remote_socket: String) -> Result<RuntimeTunnel, MachineError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .map_err(|e| MachineError::Tunnel(format!("failed to bind local listener: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| MachineError::Tunnel(format!("failed to read local address: {e}")))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| MachineError::Tunnel(format!("failed to configure listener: {e}")))?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("runtime-tunnel".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    match listener.accept() {
                        Ok((stream, _)) => {
                            if let Err(e) = bridge_connection(&session, &remote_socket, stream) {
                                tracing::debug!("[RuntimeTunnel] Bridged connection ended: {e}");
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                            thread::sleep(Duration::from_millis(50));
                        }
                        Err(e) => {
                            tracing::warn!("[RuntimeTunnel] Listener failed: {e}");
                            break;
                        }
                    }
                }
            })
            .map_err(|e| MachineError::Tunnel(format!("failed to spawn bridge thread: {e}")))?;

        Ok(RuntimeTunnel {
            local_addr,
            stop,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the bridge thread. Idempotent.
    pub fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RuntimeTunnel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Relay one HTTP exchange: read the request (headers plus any
/// Content-Length body) from the local socket, forward it over a
/// direct-streamlocal channel, then stream the response back until the
/// channel reaches EOF.
fn bridge_connection(
    session: &Session,
    remote_socket: &str,
    mut stream: TcpStream,
) -> Result<(), MachineError> {
    stream
        .set_read_timeout(Some(Duration::from_secs(30)))
        .map_err(|e| MachineError::Tunnel(format!("failed to configure bridge socket: {e}")))?;

    let mut channel = session
        .channel_direct_streamlocal(remote_socket, None)
        .map_err(|e| {
            MachineError::Tunnel(format!("failed to open channel to {remote_socket}: {e}"))
        })?;

    let request = read_http_request(&mut stream)
        .map_err(|e| MachineError::Tunnel(format!("failed to read request: {e}")))?;
    channel
        .write_all(&request)
        .and_then(|_| channel.flush())
        .map_err(|e| MachineError::Tunnel(format!("failed to forward request: {e}")))?;

    let mut buf = [0u8; 8192];
    loop {
        let n = channel
            .read(&mut buf)
            .map_err(|e| MachineError::Tunnel(format!("failed to read response: {e}")))?;
        if n == 0 {
            break;
        }
        stream
            .write_all(&buf[..n])
            .map_err(|e| MachineError::Tunnel(format!("failed to relay response: {e}")))?;
    }
    let _ = channel.close();
    Ok(())
}

/// Read one HTTP/1.1 request: everything through the header terminator and,
/// when a Content-Length header is present, that many body bytes.
fn read_http_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&request) {
            break pos;
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Ok(request);
        }
        request.extend_from_slice(&buf[..n]);
    };

    let body_len = content_length(&request[..header_end]).unwrap_or(0);
    while request.len() < header_end + body_len {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    Ok(request)
}

fn find_header_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn content_length(header: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(header);
    text.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Version information reported by the remote container runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeVersion {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "ApiVersion")]
    pub api_version: String,
}

/// Blocking HTTP client against the local end of a runtime tunnel.
pub struct RuntimeClient {
    http: reqwest::blocking::Client,
    base: String,
}

impl RuntimeClient {
    pub fn new(local_addr: SocketAddr) -> Result<RuntimeClient, MachineError> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| MachineError::Runtime(format!("failed to build client: {e}")))?;
        Ok(RuntimeClient {
            http,
            base: format!("http://{local_addr}"),
        })
    }

    /// Liveness probe against the runtime API.
    pub fn ping(&self) -> Result<(), MachineError> {
        let response = self
            .http
            .get(format!("{}/_ping", self.base))
            .header(reqwest::header::CONNECTION, "close")
            .send()
            .map_err(|e| MachineError::Runtime(format!("ping failed: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(MachineError::Runtime(format!(
                "ping returned status {}",
                response.status()
            )))
        }
    }

    /// Runtime and API version as reported by the runtime itself.
    pub fn version(&self) -> Result<RuntimeVersion, MachineError> {
        let response = self
            .http
            .get(format!("{}/version", self.base))
            .header(reqwest::header::CONNECTION, "close")
            .send()
            .map_err(|e| MachineError::Runtime(format!("version query failed: {e}")))?;
        if !response.status().is_success() {
            return Err(MachineError::Runtime(format!(
                "version query returned status {}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|e| MachineError::Runtime(format!("failed to decode version: {e}")))
    }
}
