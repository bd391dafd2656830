//! Command abstraction — one contract for local processes, remote shell
//! strings, and kubectl-wrapped invocations.
//!
//! Every command produces named `standard_output` / `error_output` streams
//! plus an optional error; both streams are always present, possibly empty,
//! even when execution failed.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use machine::{CommandOutput, MachineError, RemoteHost};
use thiserror::Error;

/// Default path of the cluster-management CLI on provisioned nodes.
pub const KUBECTL_BIN: &str = "/usr/local/bin/kubectl";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error("Failed to launch local process `{program}`: {detail}")]
    Spawn { program: String, detail: String },

    #[error("Local process `{program}` exited with status {status}: {detail}")]
    LocalExit {
        program: String,
        status: i32,
        detail: String,
    },
}

/// An immutable description of one executable unit.
pub trait Command {
    /// Human-readable description used when wrapping failures.
    fn describe(&self) -> String;

    fn execute(&self) -> (CommandOutput, Option<CommandError>);
}

fn shell_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Interpret an existence probe's captured streams: non-empty stderr means
/// not found, non-empty stdout means found, otherwise not found.
fn interpret_exists_probe(output: &CommandOutput) -> bool {
    if !output.error_output.is_empty() {
        return false;
    }
    !output.standard_output.is_empty()
}

/// A shell command executed on a remote machine. The program and arguments
/// are joined into one shell line and run over a fresh session.
pub struct RemoteCommand {
    host: Arc<dyn RemoteHost>,
    program: String,
    args: Vec<String>,
}

impl RemoteCommand {
    pub fn new(host: Arc<dyn RemoteHost>, program: impl Into<String>) -> Self {
        RemoteCommand {
            host,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Probe whether the program is installed on the remote host.
    pub fn exists(&self) -> Result<bool, CommandError> {
        let probe = format!("which {}", self.program);
        let (output, _) = self.host.run(&probe);
        Ok(interpret_exists_probe(&output))
    }
}

impl Command for RemoteCommand {
    fn describe(&self) -> String {
        shell_line(&self.program, &self.args)
    }

    fn execute(&self) -> (CommandOutput, Option<CommandError>) {
        let line = self.describe();
        tracing::debug!("[Command] Running remote: {line}");
        let (output, error) = self.host.run(&line);
        (output, error.map(CommandError::from))
    }
}

/// A remote shell command that always prefixes the cluster-management CLI
/// binary, appending `--namespace` / `--kubeconfig` flags only when
/// non-empty, then the caller-supplied subcommand and arguments.
pub struct KubectlCommand {
    host: Arc<dyn RemoteHost>,
    namespace: String,
    kubeconfig: String,
    args: Vec<String>,
}

impl KubectlCommand {
    pub fn new(host: Arc<dyn RemoteHost>) -> Self {
        KubectlCommand {
            host,
            namespace: String::new(),
            kubeconfig: String::new(),
            args: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn kubeconfig(mut self, kubeconfig: impl Into<String>) -> Self {
        self.kubeconfig = kubeconfig.into();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn assemble(&self) -> Vec<String> {
        let mut all = self.args.clone();
        if !self.namespace.is_empty() {
            all.push(format!("--namespace={}", self.namespace));
        }
        if !self.kubeconfig.is_empty() {
            all.push(format!("--kubeconfig={}", self.kubeconfig));
        }
        all
    }
}

impl Command for KubectlCommand {
    fn describe(&self) -> String {
        shell_line(KUBECTL_BIN, &self.assemble())
    }

    fn execute(&self) -> (CommandOutput, Option<CommandError>) {
        let line = self.describe();
        tracing::debug!("[Command] Running kubectl: {line}");
        let (output, error) = self.host.run(&line);
        (output, error.map(CommandError::from))
    }
}

/// A process spawned on the machine running this framework, used for checks
/// against the controller's own environment.
pub struct LocalCommand {
    program: String,
    args: Vec<String>,
}

impl LocalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        LocalCommand {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Probe whether the program is installed locally, using the
    /// platform-appropriate lookup.
    pub fn exists(&self) -> Result<bool, CommandError> {
        let lookup = if cfg!(windows) { "where" } else { "which" };
        let probe = LocalCommand::new(lookup).args([self.program.clone()]);
        let (output, _) = probe.execute();
        Ok(interpret_exists_probe(&output))
    }
}

impl Command for LocalCommand {
    fn describe(&self) -> String {
        shell_line(&self.program, &self.args)
    }

    fn execute(&self) -> (CommandOutput, Option<CommandError>) {
        tracing::debug!("[Command] Running local: {}", self.describe());
        let result = std::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output();
        match result {
            Ok(raw) => {
                let output = CommandOutput {
                    standard_output: raw.stdout,
                    error_output: raw.stderr,
                };
                if raw.status.success() {
                    (output, None)
                } else {
                    let detail = output
                        .error_text()
                        .lines()
                        .last()
                        .unwrap_or("no output available")
                        .to_string();
                    let status = raw.status.code().unwrap_or(-1);
                    let error = CommandError::LocalExit {
                        program: self.program.clone(),
                        status,
                        detail,
                    };
                    (output, Some(error))
                }
            }
            Err(e) => (
                CommandOutput::default(),
                Some(CommandError::Spawn {
                    program: self.program.clone(),
                    detail: e.to_string(),
                }),
            ),
        }
    }
}

/// Uploads a script asset to its remote staging path. Staging is itself a
/// command so an operation can carry "upload then execute" as one ordered,
/// fail-fast sequence.
pub struct StageCommand {
    host: Arc<dyn RemoteHost>,
    name: String,
    remote_path: PathBuf,
    content: Vec<u8>,
}

impl StageCommand {
    pub fn new(
        host: Arc<dyn RemoteHost>,
        name: impl Into<String>,
        remote_path: impl Into<PathBuf>,
        content: Vec<u8>,
    ) -> Self {
        StageCommand {
            host,
            name: name.into(),
            remote_path: remote_path.into(),
            content,
        }
    }
}

impl Command for StageCommand {
    fn describe(&self) -> String {
        format!("stage {} -> {}", self.name, self.remote_path.display())
    }

    fn execute(&self) -> (CommandOutput, Option<CommandError>) {
        tracing::debug!("[Command] {}", self.describe());
        match self.host.stage(&self.remote_path, &self.content) {
            Ok(()) => (CommandOutput::default(), None),
            Err(e) => (CommandOutput::default(), Some(CommandError::from(e))),
        }
    }
}
