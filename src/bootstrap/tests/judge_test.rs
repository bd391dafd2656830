//! Unit tests for the pure judgement functions.
//!
//! Measurement is not involved here; these rules must hold for any caller.

use bootstrap::checks::judge::{
    amount_check, distribution_check, port_check, service_manager_check, version_check, CompareOp,
    GIB,
};

#[test]
fn test_amount_check_passes_at_or_above_threshold() {
    assert!(amount_check("cpu cores", "8", 4).is_ok());
    assert!(amount_check("cpu cores", "4", 4).is_ok());
    assert!(amount_check("cpu cores", " 8 ", 4).is_ok());
}

#[test]
fn test_amount_check_fails_below_threshold() {
    let err = amount_check("cpu cores", "3", 4).unwrap_err();
    assert_eq!(err.reason, "amount not enough");
    assert!(err.detail.contains("4"), "detail names desired: {}", err.detail);
    assert!(err.detail.contains("3"), "detail names actual: {}", err.detail);
}

#[test]
fn test_amount_check_rejects_negative_and_non_numeric() {
    for bad in ["-100", "abc", "3.5", ""] {
        let err = amount_check("cpu cores", bad, 4).unwrap_err();
        assert_eq!(err.reason, "input parameter invalid", "input: {bad}");
    }
}

#[test]
fn test_amount_check_uses_binary_gigabytes() {
    // 8 GiB = 8 * 2^30 bytes.
    assert_eq!(8 * GIB, 8_589_934_592);
    assert!(amount_check("memory size", "264116772442", 8 * GIB).is_ok());
    let err = amount_check("memory size", "996123214", 8 * GIB).unwrap_err();
    assert_eq!(err.reason, "amount not enough");
}

#[test]
fn test_version_check_is_monotonic_in_numeric_prefix() {
    assert!(version_check("runtime version", "18.09.1", "18.09.0", CompareOp::Greater).is_ok());
    assert!(version_check("runtime version", "19.03.05", "18.09.0", CompareOp::Greater).is_ok());

    let err =
        version_check("runtime version", "18.07.1-ee-12", "18.09.0", CompareOp::Greater)
            .unwrap_err();
    assert_eq!(err.reason, "version too low");
    // The raw, untrimmed measured string is reported back.
    assert!(err.detail.contains("18.07.1-ee-12"));
}

#[test]
fn test_version_check_ignores_trailing_qualifiers() {
    assert!(version_check(
        "runtime version",
        "18.09.1-ee-12",
        "18.09.0",
        CompareOp::Greater
    )
    .is_ok());
    // Kernel-style release strings keep only the numeric prefix.
    assert!(version_check(
        "kernel version",
        "3.10.0-1127.el7.x86_64",
        "3.10.0",
        CompareOp::GreaterOrEqual
    )
    .is_ok());
}

#[test]
fn test_version_check_zero_pads_shorter_sequences() {
    assert!(version_check("kernel version", "1.18", "1.18.0", CompareOp::Equal).is_ok());
    assert!(version_check("kernel version", "1.18.0.0", "1.18", CompareOp::Equal).is_ok());
}

#[test]
fn test_version_check_rejects_non_numeric_input() {
    let err = version_check("runtime version", "ee-12", "18.09.0", CompareOp::Greater).unwrap_err();
    assert_eq!(err.reason, "input parameter invalid");
}

#[test]
fn test_distribution_check_is_closed_set_membership() {
    assert!(distribution_check("centos").is_ok());
    assert!(distribution_check("ubuntu").is_ok());
    assert!(distribution_check("rhel").is_ok());

    let err = distribution_check("macos").unwrap_err();
    assert_eq!(err.reason, "unsupported distribution");
    assert!(err.detail.contains("centos"), "detail lists the supported set");
}

#[test]
fn test_distribution_check_rejects_empty_input() {
    let err = distribution_check("").unwrap_err();
    assert!(err.detail.contains("cannot be empty"));
}

#[test]
fn test_port_check_fails_on_any_occupied_port() {
    assert!(port_check("").is_ok());
    assert!(port_check("  \n").is_ok());

    let err = port_check("6443\n10250").unwrap_err();
    assert_eq!(err.reason, "port occupied");
    assert!(err.detail.contains("6443"));
    assert!(err.detail.contains("10250"));
}

#[test]
fn test_service_manager_check_requires_exact_match() {
    assert!(service_manager_check("systemd\n", "systemd").is_ok());

    let err = service_manager_check("init", "systemd").unwrap_err();
    assert_eq!(err.reason, "system manager is not systemd");
}

#[test]
fn test_judgement_is_idempotent() {
    // Pure functions: identical inputs yield identical verdicts.
    let first = amount_check("cpu cores", "3", 4).unwrap_err();
    let second = amount_check("cpu cores", "3", 4).unwrap_err();
    assert_eq!(first, second);

    let first = version_check("runtime version", "18.07.1", "18.09.0", CompareOp::Greater);
    let second = version_check("runtime version", "18.07.1", "18.09.0", CompareOp::Greater);
    assert_eq!(first.unwrap_err(), second.unwrap_err());
}
