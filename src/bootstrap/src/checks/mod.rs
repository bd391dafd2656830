//! Check operation catalog.
//!
//! Each check is a two-phase contract: **measure** — run a raw shell probe
//! or a staged script remotely and capture one scalar value as text — and
//! **judge** — a pure comparison applied to the measured text and a desired
//! threshold. The phases are independently invokable: `operation()` exposes
//! the measurement commands (including script staging), and
//! [`CheckKind::judge`] is network-free.

pub mod judge;

use std::sync::Arc;

use machine::RemoteHost;

use crate::assets::staging_path;
use crate::command::{RemoteCommand, StageCommand};
use crate::error::StructuredError;
use crate::operation::Operation;
use crate::render::ScriptRenderer;

pub use judge::{CompareOp, GIB, SUPPORTED_DISTRIBUTIONS};

/// Closed set of prerequisite checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    CpuCore,
    MemorySize,
    DiskSpace,
    KernelVersion,
    RuntimeVersion,
    Distribution,
    PortOccupied,
    Preferences,
}

impl CheckKind {
    /// Read-only catalog of every check kind.
    pub fn all() -> &'static [CheckKind] {
        &[
            CheckKind::CpuCore,
            CheckKind::MemorySize,
            CheckKind::DiskSpace,
            CheckKind::KernelVersion,
            CheckKind::RuntimeVersion,
            CheckKind::Distribution,
            CheckKind::PortOccupied,
            CheckKind::Preferences,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CheckKind::CpuCore => "cpu cores",
            CheckKind::MemorySize => "memory size",
            CheckKind::DiskSpace => "disk space",
            CheckKind::KernelVersion => "kernel version",
            CheckKind::RuntimeVersion => "runtime version",
            CheckKind::Distribution => "distribution",
            CheckKind::PortOccupied => "port occupancy",
            CheckKind::Preferences => "system preferences",
        }
    }

    /// Script asset backing the measurement, if the check uses one.
    pub fn script(&self) -> Option<&'static str> {
        match self {
            CheckKind::CpuCore => Some("check_cpu_num.sh"),
            CheckKind::MemorySize => Some("check_memory_size.sh"),
            CheckKind::DiskSpace => Some("check_disk_size.sh"),
            CheckKind::KernelVersion => Some("check_kernel_version.sh"),
            CheckKind::Distribution => Some("check_distribution.sh"),
            CheckKind::PortOccupied => Some("check_port_occupied.sh"),
            CheckKind::RuntimeVersion | CheckKind::Preferences => None,
        }
    }

    /// Raw shell probe for checks that do not stage a script.
    pub fn probe(&self) -> Option<&'static str> {
        match self {
            CheckKind::RuntimeVersion => Some("docker version --format '{{.Server.Version}}'"),
            CheckKind::Preferences => Some("ps -p 1 -o comm="),
            _ => None,
        }
    }

    fn measure_reason(&self) -> String {
        format!("Check {} error", self.display_name())
    }

    /// Apply this kind's pure judgement rule to a measured value.
    pub fn judge(&self, measured: &str, want: &Expectation) -> Result<(), StructuredError> {
        match (self, want) {
            (CheckKind::CpuCore | CheckKind::MemorySize | CheckKind::DiskSpace, Expectation::Amount(desired)) => {
                judge::amount_check(self.display_name(), measured, *desired)
            }
            (CheckKind::KernelVersion | CheckKind::RuntimeVersion, Expectation::Version { desired, op }) => {
                judge::version_check(self.display_name(), measured, desired, *op)
            }
            (CheckKind::Distribution, Expectation::SupportedDistribution) => {
                judge::distribution_check(measured)
            }
            (CheckKind::PortOccupied, Expectation::PortsFree) => judge::port_check(measured),
            (CheckKind::Preferences, Expectation::ServiceManager(desired)) => {
                judge::service_manager_check(measured, desired)
            }
            _ => Err(StructuredError::invalid_parameter(format!(
                "expectation does not apply to {} check",
                self.display_name()
            ))),
        }
    }
}

/// Desired threshold for one check kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Minimum core count or byte count.
    Amount(u64),
    Version {
        desired: String,
        op: CompareOp,
    },
    SupportedDistribution,
    PortsFree,
    ServiceManager(String),
}

impl Expectation {
    /// Byte threshold expressed in binary gigabytes.
    pub fn gibibytes(count: u64) -> Expectation {
        Expectation::Amount(count * GIB)
    }
}

/// A typed operation generator bound to one check kind.
pub struct CheckAction {
    kind: CheckKind,
    host: Arc<dyn RemoteHost>,
    args: Vec<String>,
}

impl CheckAction {
    pub fn new(kind: CheckKind, host: Arc<dyn RemoteHost>) -> Self {
        CheckAction {
            kind,
            host,
            args: Vec::new(),
        }
    }

    /// Extra script arguments, e.g. the ports to probe for occupancy.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    /// The commands needed to obtain the measurement, including any script
    /// staging.
    pub fn operation(&self, renderer: &ScriptRenderer) -> Result<Operation, StructuredError> {
        let mut operation = Operation::new();
        if let Some(script) = self.kind.script() {
            let content = renderer.raw(script).map_err(|e| {
                StructuredError::new(self.kind.measure_reason(), e.to_string())
            })?;
            let remote_path = staging_path(script);
            operation.push(Box::new(StageCommand::new(
                Arc::clone(&self.host),
                script,
                remote_path.clone(),
                content,
            )));
            operation.push(Box::new(
                RemoteCommand::new(Arc::clone(&self.host), "sh")
                    .arg(remote_path.display().to_string())
                    .args(self.args.clone()),
            ));
        } else if let Some(probe) = self.kind.probe() {
            operation.push(Box::new(RemoteCommand::new(
                Arc::clone(&self.host),
                probe,
            )));
        }
        Ok(operation)
    }

    /// Run the measurement commands and return the captured scalar as
    /// trimmed text.
    pub fn measure(&self, renderer: &ScriptRenderer) -> Result<String, StructuredError> {
        let mut operation = self.operation(renderer)?;
        tracing::info!("[CheckAction] Measuring {}", self.kind.display_name());
        operation
            .run()
            .map_err(|e| StructuredError::new(self.kind.measure_reason(), e.to_string()))?;
        Ok(operation.captured_text().trim().to_string())
    }

    /// Measure then judge against the desired threshold.
    pub fn check(
        &self,
        renderer: &ScriptRenderer,
        want: &Expectation,
    ) -> Result<(), StructuredError> {
        let measured = self.measure(renderer)?;
        self.kind.judge(&measured, want)
    }
}
