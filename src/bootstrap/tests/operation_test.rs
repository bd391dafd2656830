//! Tests for ordered, fail-fast operation execution.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bootstrap::command::{Command, CommandError, RemoteCommand};
use bootstrap::operation::Operation;
use common::StubHost;
use machine::CommandOutput;

/// Command double that counts executions and returns a fixed outcome.
struct CountingCommand {
    name: &'static str,
    calls: Arc<AtomicUsize>,
    fails: bool,
}

impl Command for CountingCommand {
    fn describe(&self) -> String {
        self.name.to_string()
    }

    fn execute(&self) -> (CommandOutput, Option<CommandError>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = CommandOutput {
            standard_output: format!("{} ran\n", self.name).into_bytes(),
            error_output: Vec::new(),
        };
        if self.fails {
            let error = CommandError::Spawn {
                program: self.name.to_string(),
                detail: "boom".to_string(),
            };
            (output, Some(error))
        } else {
            (output, None)
        }
    }
}

#[test]
fn test_operation_short_circuits_after_first_failure() {
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));

    let mut operation = Operation::new();
    operation.push(Box::new(CountingCommand {
        name: "c1",
        calls: Arc::clone(&first_calls),
        fails: true,
    }));
    operation.push(Box::new(CountingCommand {
        name: "c2",
        calls: Arc::clone(&second_calls),
        fails: false,
    }));

    let err = operation.run().unwrap_err();
    assert_eq!(err.command, "c1");
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0, "c2 must never run");
}

#[test]
fn test_operation_wraps_error_with_command_description() {
    let mut operation = Operation::new();
    operation.push(Box::new(CountingCommand {
        name: "probe disk",
        calls: Arc::new(AtomicUsize::new(0)),
        fails: true,
    }));

    let err = operation.run().unwrap_err();
    assert!(err.to_string().contains("probe disk"), "got: {err}");
    assert!(err.to_string().contains("boom"), "got: {err}");
}

#[test]
fn test_operation_accumulates_output_across_commands() {
    let mut operation = Operation::new();
    for name in ["a", "b"] {
        operation.push(Box::new(CountingCommand {
            name,
            calls: Arc::new(AtomicUsize::new(0)),
            fails: false,
        }));
    }
    operation.run().unwrap();
    assert_eq!(operation.captured_text(), "a ran\nb ran\n");
}

#[test]
fn test_streams_keep_their_names_through_execution() {
    // A marker written to stderr must surface in error_output only; a
    // marker written to stdout must surface in standard_output only.
    let host = Arc::new(StubHost::new().reply("stdout-marker", "stderr-marker"));
    let command = RemoteCommand::new(host, "echo").arg("hi");

    let (output, error) = command.execute();
    assert!(error.is_none());
    assert_eq!(output.standard_text(), "stdout-marker");
    assert_eq!(output.error_text(), "stderr-marker");
}

#[test]
fn test_empty_operation_runs_clean() {
    let mut operation = Operation::new();
    assert!(operation.is_empty());
    operation.run().unwrap();
    assert_eq!(operation.captured_text(), "");
}
