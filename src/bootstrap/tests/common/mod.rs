//! Shared test double for the remote-host seam.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use machine::{CommandOutput, MachineError, RemoteHost};

/// Stub machine: records every command and staged file, and returns canned
/// replies in order. Once the queue is empty it replies with empty success.
#[derive(Default)]
pub struct StubHost {
    replies: Mutex<VecDeque<(CommandOutput, Option<MachineError>)>>,
    commands: Mutex<Vec<String>>,
    staged: Mutex<Vec<PathBuf>>,
}

impl StubHost {
    pub fn new() -> Self {
        StubHost::default()
    }

    pub fn reply(self, stdout: &str, stderr: &str) -> Self {
        self.replies.lock().unwrap().push_back((
            CommandOutput {
                standard_output: stdout.as_bytes().to_vec(),
                error_output: stderr.as_bytes().to_vec(),
            },
            None,
        ));
        self
    }

    pub fn reply_failure(self, stdout: &str, stderr: &str, status: i32) -> Self {
        self.replies.lock().unwrap().push_back((
            CommandOutput {
                standard_output: stdout.as_bytes().to_vec(),
                error_output: stderr.as_bytes().to_vec(),
            },
            Some(MachineError::CommandFailed {
                status,
                detail: stderr.trim().to_string(),
            }),
        ));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }
}

impl RemoteHost for StubHost {
    fn run(&self, command: &str) -> (CommandOutput, Option<MachineError>) {
        self.commands.lock().unwrap().push(command.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((CommandOutput::default(), None))
    }

    fn stage(&self, remote_path: &Path, _content: &[u8]) -> Result<(), MachineError> {
        self.staged.lock().unwrap().push(remote_path.to_path_buf());
        Ok(())
    }
}
