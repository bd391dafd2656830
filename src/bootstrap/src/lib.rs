//! Check, init, and deploy operation catalog for SSH-driven cluster
//! bootstrap.
//!
//! A caller builds a [`machine::Machine`] for a target node, asks the
//! catalog for an [`Operation`] — an ordered, fail-fast sequence of
//! commands, possibly preceded by uploading a script asset — executes it,
//! and interprets the captured output either through a pure judgement
//! function (checks) or through the no-error/empty-stderr rule (init).
//! Every failure is translated into the shared
//! [`StructuredError`] contract before being handed back.
//!
//! The catalogs are closed enums built at compile time; there is no
//! runtime registration and no shared mutable state, so operations against
//! independent machines may run on independent threads.

pub mod assets;
pub mod checks;
pub mod cluster;
pub mod command;
pub mod error;
pub mod init;
pub mod metadata;
pub mod operation;
pub mod progress;
pub mod render;

pub use assets::{DirScripts, EmbeddedScripts, ScriptSource, REMOTE_SCRIPT_DIR};
pub use checks::{CheckAction, CheckKind, CompareOp, Expectation, GIB};
pub use cluster::{ClusterConfig, ConnectivityMode, Endpoint, KUBE_API_PORT};
pub use command::{
    Command, CommandError, KubectlCommand, LocalCommand, RemoteCommand, StageCommand, KUBECTL_BIN,
};
pub use error::{StructuredError, DEFAULT_FIX_METHODS};
pub use init::{run_init_sequence, InitAction, InitKind};
pub use operation::{Operation, OperationError};
pub use progress::{NoopProgressReporter, ProgressReporter};
pub use render::ScriptRenderer;
