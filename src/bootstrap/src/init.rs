//! Init operation catalog — scripted provisioning steps that mutate
//! machine state. Unlike checks there is no judgement phase: success is
//! "no error and empty stderr".

use std::collections::HashMap;
use std::sync::Arc;

use machine::RemoteHost;

use crate::assets::staging_path;
use crate::cluster::ClusterConfig;
use crate::command::{RemoteCommand, StageCommand};
use crate::error::StructuredError;
use crate::operation::Operation;
use crate::progress::ProgressReporter;
use crate::render::ScriptRenderer;

/// Closed set of provisioning steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitKind {
    Firewall,
    Hostname,
    Swap,
    Network,
    Timezone,
    Keepalived,
    Toolchain,
}

impl InitKind {
    pub fn all() -> &'static [InitKind] {
        &[
            InitKind::Firewall,
            InitKind::Hostname,
            InitKind::Swap,
            InitKind::Network,
            InitKind::Timezone,
            InitKind::Keepalived,
            InitKind::Toolchain,
        ]
    }

    pub fn script(&self) -> &'static str {
        match self {
            InitKind::Firewall => "init_change_firewall.sh",
            InitKind::Hostname => "init_change_hostname.sh",
            InitKind::Swap => "init_close_swap.sh",
            InitKind::Network => "init_network.sh",
            InitKind::Timezone => "init_change_timezone.sh",
            InitKind::Keepalived => "init_keepalived.sh.j2",
            InitKind::Toolchain => "init_install_toolchain.sh.j2",
        }
    }

    /// Whether the backing script is rendered with variables before
    /// staging.
    pub fn templated(&self) -> bool {
        matches!(self, InitKind::Keepalived | InitKind::Toolchain)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            InitKind::Firewall => "change firewall",
            InitKind::Hostname => "change hostname",
            InitKind::Swap => "close swap",
            InitKind::Network => "configure network",
            InitKind::Timezone => "change timezone",
            InitKind::Keepalived => "install keepalived",
            InitKind::Toolchain => "install toolchain",
        }
    }

    fn reason(&self) -> String {
        match self {
            InitKind::Firewall => "Change firewall error".to_string(),
            InitKind::Hostname => "Change hostname error".to_string(),
            InitKind::Swap => "Close swap error".to_string(),
            InitKind::Network => "Configure network error".to_string(),
            InitKind::Timezone => "Change timezone error".to_string(),
            InitKind::Keepalived => "Install keepalived error".to_string(),
            InitKind::Toolchain => "Install toolchain error".to_string(),
        }
    }
}

/// A scripted provisioning unit: stage the script asset to the fixed
/// remote directory, then execute it with its arguments.
pub struct InitAction {
    kind: InitKind,
    host: Arc<dyn RemoteHost>,
    args: Vec<String>,
    vars: HashMap<String, String>,
}

impl std::fmt::Debug for InitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitAction")
            .field("kind", &self.kind)
            .field("host", &"<dyn RemoteHost>")
            .field("args", &self.args)
            .field("vars", &self.vars)
            .finish()
    }
}

impl InitAction {
    pub fn new(kind: InitKind, host: Arc<dyn RemoteHost>) -> Self {
        InitAction {
            kind,
            host,
            args: Vec::new(),
            vars: HashMap::new(),
        }
    }

    pub fn firewall(host: Arc<dyn RemoteHost>) -> Self {
        InitAction::new(InitKind::Firewall, host)
    }

    pub fn hostname(host: Arc<dyn RemoteHost>, name: impl Into<String>) -> Self {
        let mut action = InitAction::new(InitKind::Hostname, host);
        action.args.push(name.into());
        action
    }

    pub fn swap(host: Arc<dyn RemoteHost>) -> Self {
        InitAction::new(InitKind::Swap, host)
    }

    pub fn network(host: Arc<dyn RemoteHost>) -> Self {
        InitAction::new(InitKind::Network, host)
    }

    pub fn timezone(host: Arc<dyn RemoteHost>, zone: impl Into<String>) -> Self {
        let mut action = InitAction::new(InitKind::Timezone, host);
        action.args.push(zone.into());
        action
    }

    /// HA component deployment: keepalived bound to the cluster virtual IP.
    /// The first master becomes VRRP MASTER, the rest BACKUP.
    pub fn keepalived(
        host: Arc<dyn RemoteHost>,
        virtual_ip: impl Into<String>,
        interface: impl Into<String>,
        is_master: bool,
    ) -> Self {
        let mut action = InitAction::new(InitKind::Keepalived, host);
        action.vars.insert("virtual_ip".to_string(), virtual_ip.into());
        action.vars.insert("interface".to_string(), interface.into());
        action.vars.insert(
            "state".to_string(),
            if is_master { "MASTER" } else { "BACKUP" }.to_string(),
        );
        action.vars.insert(
            "priority".to_string(),
            if is_master { "100" } else { "90" }.to_string(),
        );
        action
    }

    /// Kubeadm toolchain install parameterized from the cluster config.
    /// Computing the cluster DNS address fails closed: an unparsable or
    /// too-small service subnet fails this init step up front.
    pub fn toolchain(
        host: Arc<dyn RemoteHost>,
        cluster: &ClusterConfig,
    ) -> Result<Self, StructuredError> {
        let cluster_dns = cluster.cluster_dns()?;
        let mut action = InitAction::new(InitKind::Toolchain, host);
        action.vars.insert("mirror".to_string(), cluster.mirror.clone());
        action.vars.insert(
            "kubernetes_version".to_string(),
            cluster.kubernetes_version.clone(),
        );
        action.vars.insert(
            "image_repository".to_string(),
            cluster.image_repository.clone(),
        );
        action.vars.insert("cluster_dns".to_string(), cluster_dns);
        Ok(action)
    }

    pub fn kind(&self) -> InitKind {
        self.kind
    }

    /// The staged-script commands making up this step.
    pub fn operation(&self, renderer: &ScriptRenderer) -> Result<Operation, StructuredError> {
        let script = self.kind.script();
        let content = if self.kind.templated() {
            renderer.render(script, &self.vars)
        } else {
            renderer.raw(script)
        }
        .map_err(|e| StructuredError::new(self.kind.reason(), e.to_string()))?;

        let staged_name = script.strip_suffix(".j2").unwrap_or(script);
        let remote_path = staging_path(staged_name);

        let mut operation = Operation::new();
        operation.push(Box::new(StageCommand::new(
            Arc::clone(&self.host),
            staged_name,
            remote_path.clone(),
            content,
        )));
        operation.push(Box::new(
            RemoteCommand::new(Arc::clone(&self.host), "sh")
                .arg(remote_path.display().to_string())
                .args(self.args.clone()),
        ));
        Ok(operation)
    }

    /// Stage and execute the script. Success requires both a clean exit and
    /// an empty error stream; the captured standard output is returned for
    /// the caller's logs.
    pub fn run(&self, renderer: &ScriptRenderer) -> Result<String, StructuredError> {
        let mut operation = self.operation(renderer)?;
        tracing::info!("[InitAction] Running {}", self.kind.display_name());
        operation
            .run()
            .map_err(|e| StructuredError::new(self.kind.reason(), e.to_string()))?;

        if !operation.error_output().is_empty() {
            let stderr = String::from_utf8_lossy(operation.error_output()).to_string();
            return Err(StructuredError::new(
                self.kind.reason(),
                format!("script reported: {}", stderr.trim()),
            ));
        }
        Ok(operation.captured_text())
    }
}

/// Execute a sequence of init actions with progress reporting. Fail-fast:
/// stops at the first failing action.
pub fn run_init_sequence(
    actions: &[InitAction],
    renderer: &ScriptRenderer,
    reporter: &dyn ProgressReporter,
) -> Result<(), StructuredError> {
    if actions.is_empty() {
        return Ok(());
    }

    let total = actions.len() as u32;
    for (index, action) in actions.iter().enumerate() {
        let progress = 100u32.saturating_mul(index as u32) / total;
        reporter.emit(
            progress,
            format!("Executing {}", action.kind().display_name()),
        );

        let start = std::time::Instant::now();
        action.run(renderer)?;
        tracing::info!(
            "[InitAction] {} completed in {}ms",
            action.kind().display_name(),
            start.elapsed().as_millis()
        );
    }
    reporter.emit(100, "Provisioning complete".to_string());
    Ok(())
}
