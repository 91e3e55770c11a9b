use std::collections::HashMap;

use super::Debugger;
use crate::error::{Error, Result};

/// In-memory debugger backend.
///
/// Replies are looked up by exact command text. Commands without a canned
/// reply succeed with empty output. Every command is recorded, including the
/// ones that fail.
#[derive(Debug, Default)]
pub struct FakeDebugger {
    replies: HashMap<String, std::result::Result<String, String>>,
    commands: Vec<String>,
}

impl FakeDebugger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.replies
            .insert(command.to_string(), Ok(output.to_string()));
        self
    }

    /// Makes `command` fail with gdb-style `message`.
    pub fn fail(mut self, command: &str, message: &str) -> Self {
        self.replies
            .insert(command.to_string(), Err(message.to_string()));
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl Debugger for FakeDebugger {
    fn execute(&mut self, command: &str) -> Result<String> {
        self.commands.push(command.to_string());
        match self.replies.get(command) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(message)) => Err(Error::Command {
                command: command.to_string(),
                message: message.clone(),
            }),
            None => Ok(String::new()),
        }
    }
}
