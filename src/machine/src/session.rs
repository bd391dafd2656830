//! SSH session handling: connect, run commands, close.
//!
//! One [`Machine`] owns exactly one SSH connection. A new exec channel is
//! opened per command and both output streams are drained fully before the
//! exit status is read, so the captured streams are always complete.

use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use ssh2::{DisconnectCode, Session, Sftp};

use crate::error::MachineError;
use crate::node::{Node, NodeAuth};
use crate::tunnel::{RuntimeClient, RuntimeTunnel};
use crate::RemoteHost;

/// Connection establishment timeout. Command execution itself has no
/// deadline; callers needing bounded execution time close the machine,
/// which aborts in-flight sessions.
pub const CONNECT_TIMEOUT_SECONDS: u64 = 60;

/// Captured output of one executed command. Both streams are always
/// present, possibly empty, even when execution failed. The fields are
/// named so no call site can rely on positional convention.
#[derive(Debug, Default, Clone)]
pub struct CommandOutput {
    pub standard_output: Vec<u8>,
    pub error_output: Vec<u8>,
}

impl CommandOutput {
    pub fn standard_text(&self) -> String {
        String::from_utf8_lossy(&self.standard_output).to_string()
    }

    pub fn error_text(&self) -> String {
        String::from_utf8_lossy(&self.error_output).to_string()
    }
}

/// Host key verification policy applied at connect time.
///
/// `AcceptAny` matches environments where host keys rotate with
/// reprovisioned bare machines; `Fingerprint` fails closed before
/// authentication when the presented key does not match.
#[derive(Debug, Clone)]
pub enum HostKeyPolicy {
    AcceptAny,
    /// Expected `SHA256:<base64>` fingerprint.
    Fingerprint(String),
}

impl Default for HostKeyPolicy {
    fn default() -> Self {
        HostKeyPolicy::AcceptAny
    }
}

impl HostKeyPolicy {
    pub fn verify(&self, presented: &str) -> Result<(), MachineError> {
        match self {
            HostKeyPolicy::AcceptAny => Ok(()),
            HostKeyPolicy::Fingerprint(expected) => {
                if expected == presented {
                    Ok(())
                } else {
                    Err(MachineError::HostKey(format!(
                        "expected {expected}, host presented {presented}"
                    )))
                }
            }
        }
    }
}

/// Format a host key as an OpenSSH-style SHA256 fingerprint.
pub fn fingerprint_of(host_key: &[u8]) -> String {
    let digest = Sha256::digest(host_key);
    format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))
}

/// A live handle bound to one node: SSH session plus file-transfer channel,
/// and optionally a container-runtime tunnel.
pub struct Machine {
    node: Node,
    session: Session,
    pub(crate) sftp: Option<Sftp>,
    tunnel: Option<RuntimeTunnel>,
    runtime: Option<RuntimeClient>,
    fingerprint: String,
    closed: bool,
}

impl Machine {
    /// Open an SSH connection to `node` and the file-transfer channel over
    /// it. Connection attempts use a fixed timeout; the host key is checked
    /// against `policy` before authentication.
    pub fn connect(node: Node, policy: &HostKeyPolicy) -> Result<Machine, MachineError> {
        let address = node.address();
        let socket = address
            .to_socket_addrs()
            .map_err(|e| MachineError::Connect(format!("failed to resolve `{address}`: {e}")))?
            .next()
            .ok_or_else(|| {
                MachineError::Connect(format!("no resolved socket address for `{address}`"))
            })?;

        let stream =
            TcpStream::connect_timeout(&socket, Duration::from_secs(CONNECT_TIMEOUT_SECONDS))
                .map_err(|e| {
                    MachineError::Connect(format!("failed to reach `{address}`: {e}"))
                })?;

        let mut session = Session::new()
            .map_err(|e| MachineError::Connect(format!("failed to initialize session: {e}")))?;
        session.set_tcp_stream(stream);
        session
            .handshake()
            .map_err(|e| MachineError::Connect(format!("handshake with `{address}` failed: {e}")))?;

        let fingerprint = match session.host_key() {
            Some((key, _)) => fingerprint_of(key),
            None => {
                return Err(MachineError::Connect(
                    "server did not present a host key".to_string(),
                ))
            }
        };
        policy.verify(&fingerprint)?;

        match &node.auth {
            NodeAuth::Password { password } => session
                .userauth_password(&node.username, password)
                .map_err(|e| MachineError::Auth(format!("password authentication failed: {e}")))?,
            NodeAuth::PrivateKey { key, passphrase } => session
                .userauth_pubkey_memory(&node.username, None, key, passphrase.as_deref())
                .map_err(|e| {
                    MachineError::Auth(format!("private-key authentication failed: {e}"))
                })?,
        }
        if !session.authenticated() {
            return Err(MachineError::Auth(
                "authentication was rejected by the server".to_string(),
            ));
        }

        let sftp = session
            .sftp()
            .map_err(|e| MachineError::Connect(format!("failed to open transfer channel: {e}")))?;

        tracing::info!(
            "[Machine] Connected to {} ({}), host key {}",
            node.name,
            address,
            fingerprint
        );

        Ok(Machine {
            node,
            session,
            sftp: Some(sftp),
            tunnel: None,
            runtime: None,
            fingerprint,
            closed: false,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// SHA256 fingerprint of the host key presented at connect time.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Run one shell command on the remote host.
    ///
    /// Opens a new session channel, drains stdout and stderr fully, then
    /// waits for exit. The outcome is classified as success, command-exit
    /// failure (carries the exit detail), or transport failure (session or
    /// pipe setup failed); both captured streams are returned in every case.
    pub fn run_command(&self, command: &str) -> (CommandOutput, Option<MachineError>) {
        let mut output = CommandOutput::default();

        let mut channel = match self.session.channel_session() {
            Ok(channel) => channel,
            Err(e) => {
                return (
                    output,
                    Some(MachineError::Session(format!("failed to open channel: {e}"))),
                )
            }
        };
        if let Err(e) = channel.exec(command) {
            return (
                output,
                Some(MachineError::Session(format!(
                    "failed to start `{command}`: {e}"
                ))),
            );
        }

        if let Err(e) = channel.read_to_end(&mut output.standard_output) {
            return (
                output,
                Some(MachineError::Session(format!("failed to read stdout: {e}"))),
            );
        }
        if let Err(e) = channel
            .stderr()
            .read_to_end(&mut output.error_output)
        {
            return (
                output,
                Some(MachineError::Session(format!("failed to read stderr: {e}"))),
            );
        }

        if let Err(e) = channel.wait_close() {
            return (
                output,
                Some(MachineError::ExitStatusUnknown(e.to_string())),
            );
        }
        match channel.exit_status() {
            Ok(0) => (output, None),
            Ok(status) => {
                let detail = output
                    .error_text()
                    .lines()
                    .last()
                    .unwrap_or("no output available")
                    .to_string();
                (output, Some(MachineError::CommandFailed { status, detail }))
            }
            Err(e) => (output, Some(MachineError::ExitStatusUnknown(e.to_string()))),
        }
    }

    /// Establish (or return the existing) tunnel to the remote container
    /// runtime's control socket and build a runtime client against its
    /// local end.
    pub fn runtime_client(&mut self, remote_socket: &str) -> Result<&RuntimeClient, MachineError> {
        if self.closed {
            return Err(MachineError::Session(
                "machine is closed".to_string(),
            ));
        }
        if self.runtime.is_none() {
            let tunnel = RuntimeTunnel::open(self.session.clone(), remote_socket.to_string())?;
            let client = RuntimeClient::new(tunnel.local_addr())?;
            tracing::info!(
                "[Machine] Runtime tunnel to {}:{} open at {}",
                self.node.name,
                remote_socket,
                tunnel.local_addr()
            );
            self.tunnel = Some(tunnel);
            self.runtime = Some(client);
        }
        self.runtime
            .as_ref()
            .ok_or_else(|| MachineError::Runtime("runtime client unavailable".to_string()))
    }

    /// Close the runtime client and tunnel if present, then the SSH
    /// connection. Closing the connection invalidates the transfer channel.
    /// Idempotent.
    pub fn close(&mut self) {
        self.runtime = None;
        if let Some(mut tunnel) = self.tunnel.take() {
            tunnel.close();
        }
        self.sftp = None;
        if !self.closed {
            let _ = self
                .session
                .disconnect(Some(DisconnectCode::ByApplication), "closed by caller", None);
            self.closed = true;
            tracing::info!("[Machine] Closed connection to {}", self.node.name);
        }
    }
}

impl RemoteHost for Machine {
    fn run(&self, command: &str) -> (CommandOutput, Option<MachineError>) {
        self.run_command(command)
    }

    fn stage(&self, remote_path: &Path, content: &[u8]) -> Result<(), MachineError> {
        self.write_remote_file(remote_path, content)
    }
}
