//! Tests for the check catalog: measurement command construction through
//! the stub host, and judgement dispatch per kind.

mod common;

use std::sync::Arc;

use bootstrap::assets::EmbeddedScripts;
use bootstrap::checks::{CheckAction, CheckKind, CompareOp, Expectation};
use bootstrap::render::ScriptRenderer;
use common::StubHost;

fn renderer() -> ScriptRenderer {
    ScriptRenderer::new(Box::new(EmbeddedScripts)).unwrap()
}

#[test]
fn test_scripted_check_stages_then_executes() {
    let host = Arc::new(StubHost::new().reply("8", ""));
    let action = CheckAction::new(CheckKind::CpuCore, host.clone());

    let measured = action.measure(&renderer()).unwrap();
    assert_eq!(measured, "8");

    assert_eq!(
        host.staged(),
        vec![std::path::PathBuf::from("/tmp/scripts/check_cpu_num.sh")]
    );
    assert_eq!(
        host.commands(),
        vec!["sh /tmp/scripts/check_cpu_num.sh".to_string()]
    );
}

#[test]
fn test_port_check_passes_its_arguments_to_the_script() {
    let host = Arc::new(StubHost::new().reply("", ""));
    let action =
        CheckAction::new(CheckKind::PortOccupied, host.clone()).args(["6443", "10250"]);

    action.measure(&renderer()).unwrap();
    assert_eq!(
        host.commands(),
        vec!["sh /tmp/scripts/check_port_occupied.sh 6443 10250".to_string()]
    );
}

#[test]
fn test_probe_checks_run_without_staging() {
    let host = Arc::new(StubHost::new().reply("18.09.1\n", ""));
    let action = CheckAction::new(CheckKind::RuntimeVersion, host.clone());

    let measured = action.measure(&renderer()).unwrap();
    assert_eq!(measured, "18.09.1");
    assert!(host.staged().is_empty(), "probe checks stage nothing");
}

#[test]
fn test_measure_failure_maps_to_structured_error() {
    let host = Arc::new(StubHost::new().reply_failure("", "df: not found", 127));
    let action = CheckAction::new(CheckKind::DiskSpace, host);

    let err = action.measure(&renderer()).unwrap_err();
    assert_eq!(err.reason, "Check disk space error");
    assert!(err.detail.contains("df: not found"), "got: {}", err.detail);
}

#[test]
fn test_check_combines_measurement_and_judgement() {
    let host = Arc::new(StubHost::new().reply("2", ""));
    let action = CheckAction::new(CheckKind::CpuCore, host);

    let err = action
        .check(&renderer(), &Expectation::Amount(4))
        .unwrap_err();
    assert_eq!(err.reason, "amount not enough");
}

#[test]
fn test_judge_dispatches_per_kind() {
    assert!(CheckKind::MemorySize
        .judge("264116772442", &Expectation::gibibytes(8))
        .is_ok());
    assert!(CheckKind::KernelVersion
        .judge(
            "4.18.0-80.el8.x86_64",
            &Expectation::Version {
                desired: "3.10.0".to_string(),
                op: CompareOp::GreaterOrEqual,
            },
        )
        .is_ok());
    assert!(CheckKind::Distribution
        .judge("centos", &Expectation::SupportedDistribution)
        .is_ok());
    assert!(CheckKind::PortOccupied.judge("", &Expectation::PortsFree).is_ok());
    assert!(CheckKind::Preferences
        .judge("systemd", &Expectation::ServiceManager("systemd".to_string()))
        .is_ok());
}

#[test]
fn test_judge_rejects_mismatched_expectation() {
    let err = CheckKind::CpuCore
        .judge("8", &Expectation::PortsFree)
        .unwrap_err();
    assert_eq!(err.reason, "input parameter invalid");
}

#[test]
fn test_catalog_covers_every_kind() {
    for kind in CheckKind::all() {
        // Every kind measures either via a staged script or a raw probe.
        assert!(
            kind.script().is_some() || kind.probe().is_some(),
            "{} has no measurement",
            kind.display_name()
        );
    }
}
