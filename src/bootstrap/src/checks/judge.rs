//! Pure judgement functions applied to measured values.
//!
//! Every function here is network-free and stateless: the same inputs
//! always produce the same verdict. Measurement (remote probes) and
//! judgement are deliberately separate so these rules are directly
//! testable.

use std::cmp::Ordering;

use crate::error::StructuredError;

/// One binary gigabyte. Memory and disk thresholds are expressed in
/// binary-gigabyte units.
pub const GIB: u64 = 1 << 30;

/// Supported OS distribution identifiers.
pub const SUPPORTED_DISTRIBUTIONS: &[&str] = &["centos", "rhel", "ubuntu"];

/// Relational operator applied by version checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

impl CompareOp {
    fn matches(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Less => ordering == Ordering::Less,
            CompareOp::LessOrEqual => ordering != Ordering::Greater,
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::GreaterOrEqual => ordering != Ordering::Less,
            CompareOp::Greater => ordering == Ordering::Greater,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Equal => "==",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::Greater => ">",
        }
    }
}

/// Amount rule for CPU cores, memory bytes, and disk bytes: the measured
/// text must parse as a non-negative number and reach the desired
/// threshold.
pub fn amount_check(subject: &str, actual: &str, desired: u64) -> Result<(), StructuredError> {
    let value: u64 = actual.trim().parse().map_err(|_| {
        StructuredError::invalid_parameter(format!(
            "measured {subject} value `{actual}` is not a non-negative number"
        ))
    })?;
    if value >= desired {
        Ok(())
    } else {
        Err(StructuredError::new(
            "amount not enough",
            format!("{subject}: desired at least {desired}, actual {value}"),
        ))
    }
}

/// Leading run of digits and separator characters; everything from the
/// first other character on (build qualifiers such as `-ee-12`) is
/// discarded.
fn numeric_prefix(version: &str) -> &str {
    let end = version
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(version.len());
    &version[..end]
}

fn components(prefix: &str) -> Result<Vec<u64>, ()> {
    if prefix.is_empty() {
        return Err(());
    }
    prefix
        .split('.')
        .map(|part| part.parse::<u64>().map_err(|_| ()))
        .collect()
}

fn compare_components(actual: &[u64], desired: &[u64]) -> Ordering {
    let len = actual.len().max(desired.len());
    for i in 0..len {
        let a = actual.get(i).copied().unwrap_or(0);
        let d = desired.get(i).copied().unwrap_or(0);
        match a.cmp(&d) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Version rule for kernel and container-runtime versions: compare the
/// numeric prefixes component by component (the shorter sequence is
/// zero-padded) under the caller-specified relational operator. Failure
/// messages name the desired version and the raw, untrimmed measured
/// string.
pub fn version_check(
    subject: &str,
    actual: &str,
    desired: &str,
    op: CompareOp,
) -> Result<(), StructuredError> {
    let actual_components = components(numeric_prefix(actual.trim())).map_err(|_| {
        StructuredError::invalid_parameter(format!(
            "measured {subject} version `{actual}` has no numeric prefix"
        ))
    })?;
    let desired_components = components(numeric_prefix(desired.trim())).map_err(|_| {
        StructuredError::invalid_parameter(format!(
            "desired {subject} version `{desired}` has no numeric prefix"
        ))
    })?;

    if op.matches(compare_components(&actual_components, &desired_components)) {
        Ok(())
    } else {
        Err(StructuredError::new(
            "version too low",
            format!(
                "{subject}: desired version {} {desired}, actual {actual}",
                op.symbol()
            ),
        ))
    }
}

/// Distribution rule: the measured id must be one of the supported set.
pub fn distribution_check(actual: &str) -> Result<(), StructuredError> {
    let id = actual.trim();
    if id.is_empty() {
        return Err(StructuredError::invalid_parameter(
            "distribution id cannot be empty",
        ));
    }
    if SUPPORTED_DISTRIBUTIONS.contains(&id) {
        Ok(())
    } else {
        Err(StructuredError::new(
            "unsupported distribution",
            format!(
                "distribution `{id}` is not supported; supported: {}",
                SUPPORTED_DISTRIBUTIONS.join(", ")
            ),
        ))
    }
}

/// Port rule: any measured port means the requested ports are not free.
pub fn port_check(actual: &str) -> Result<(), StructuredError> {
    let occupied: Vec<&str> = actual
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .collect();
    if occupied.is_empty() {
        Ok(())
    } else {
        Err(StructuredError::new(
            "port occupied",
            format!("port(s) occupied: {}", occupied.join(", ")),
        ))
    }
}

/// System preference rule: the measured init system must match the desired
/// one.
pub fn service_manager_check(actual: &str, desired: &str) -> Result<(), StructuredError> {
    let measured = actual.trim();
    if measured == desired {
        Ok(())
    } else {
        Err(StructuredError::new(
            format!("system manager is not {desired}"),
            format!("desired system manager {desired}, actual {measured}"),
        ))
    }
}
