//! Remote machine handle for cluster bootstrap.
//!
//! A [`Machine`] binds one target host: it owns a single SSH connection, a
//! file-transfer channel opened over that connection, and optionally a
//! forwarded tunnel to the host's container-runtime control socket. The
//! transfer channel and tunnel are only valid while the SSH connection is
//! open; [`Machine::close`] tears everything down and is idempotent.
//!
//! Callers wanting parallel provisioning across N nodes create N independent
//! machines — there is no pooling and no shared mutable state between
//! machines.

pub mod error;
pub mod node;
pub mod session;
pub mod transfer;
pub mod tunnel;

pub use error::MachineError;
pub use node::{Node, NodeAuth};
pub use session::{fingerprint_of, CommandOutput, HostKeyPolicy, Machine, CONNECT_TIMEOUT_SECONDS};
pub use transfer::{mirrored_root, walk_local_files};
pub use tunnel::{RuntimeClient, RuntimeTunnel, RuntimeVersion, DEFAULT_RUNTIME_SOCKET};

use std::path::Path;

/// Execution seam between the operation layer and a live machine.
///
/// [`Machine`] is the production implementation; tests substitute a stub so
/// command construction and judgement logic can run without a network.
pub trait RemoteHost: Send + Sync {
    /// Run one shell command. Both captured streams are always present,
    /// possibly empty, even when an error is returned.
    fn run(&self, command: &str) -> (CommandOutput, Option<MachineError>);

    /// Write `content` to `remote_path`, creating parent directories as
    /// needed.
    fn stage(&self, remote_path: &Path, content: &[u8]) -> Result<(), MachineError>;
}
