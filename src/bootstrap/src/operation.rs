//! Ordered, fail-fast execution of commands with accumulated output.

use thiserror::Error;

use crate::command::{Command, CommandError};

/// Error returned when an operation stops at a failing command. The
/// underlying error is wrapped with the failing command's description.
#[derive(Debug, Error)]
#[error("Command `{command}` failed: {source}")]
pub struct OperationError {
    pub command: String,
    #[source]
    pub source: CommandError,
}

/// An ordered list of commands plus the output captured while running them.
///
/// Commands run in order and execution stops at the first failure — the
/// (n+1)-th command never runs if the n-th failed. Both captured streams
/// accumulate across the commands that did run.
#[derive(Default)]
pub struct Operation {
    commands: Vec<Box<dyn Command>>,
    standard_output: Vec<u8>,
    error_output: Vec<u8>,
}

impl Operation {
    pub fn new() -> Self {
        Operation::default()
    }

    pub fn push(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Descriptions of the commands, in execution order.
    pub fn describe(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.describe()).collect()
    }

    pub fn run(&mut self) -> Result<(), OperationError> {
        for command in &self.commands {
            let (output, error) = command.execute();
            self.standard_output.extend_from_slice(&output.standard_output);
            self.error_output.extend_from_slice(&output.error_output);
            if let Some(source) = error {
                tracing::warn!(
                    "[Operation] Command `{}` failed: {source}",
                    command.describe()
                );
                return Err(OperationError {
                    command: command.describe(),
                    source,
                });
            }
        }
        Ok(())
    }

    pub fn standard_output(&self) -> &[u8] {
        &self.standard_output
    }

    pub fn error_output(&self) -> &[u8] {
        &self.error_output
    }

    /// Accumulated standard output as text.
    pub fn captured_text(&self) -> String {
        String::from_utf8_lossy(&self.standard_output).to_string()
    }
}
