//! Shell command assembly and sequential execution.
//!
//! A [`Command`] is a command line plus environment overrides. A
//! [`CommandSet`] is an ordered group of commands joined with `&&`, so each
//! step only runs when the previous one succeeded.

use serde::Serialize;
use std::process::{Command as ProcessCommand, Stdio};

use crate::error::{Error, ExternalCommandDetails, Result};

/// Insertion-ordered environment mapping.
///
/// Setting a key that already exists replaces the value in place, so the
/// rendered order stays the order in which keys were first populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvironmentVariables(Vec<(String, String)>);

impl EnvironmentVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Merge `other` on top of `self`; later values win.
    pub fn extend(&mut self, other: EnvironmentVariables) {
        for (key, value) in other.0 {
            self.set(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// `KEY="VALUE"` pairs joined by spaces.
    pub fn render(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One `export KEY="VALUE"` line per key.
    pub fn render_exports(&self) -> Vec<String> {
        self.iter()
            .map(|(key, value)| format!("export {}=\"{}\"", key, value))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Self::new();
        for (key, value) in iter {
            env.set(key, value);
        }
        env
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub command_line: String,
    #[serde(skip_serializing_if = "EnvironmentVariables::is_empty")]
    pub env: EnvironmentVariables,
}

impl Command {
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            env: EnvironmentVariables::new(),
        }
    }

    pub fn with_env(command_line: impl Into<String>, env: EnvironmentVariables) -> Self {
        Self {
            command_line: command_line.into(),
            env,
        }
    }

    pub fn render(&self) -> String {
        if self.env.is_empty() {
            self.command_line.clone()
        } else {
            format!("{} {}", self.env.render(), self.command_line)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandSet(Vec<Command>);

impl CommandSet {
    pub fn new(commands: Vec<Command>) -> Self {
        Self(commands)
    }

    pub fn single(command: Command) -> Self {
        Self(vec![command])
    }

    pub fn commands(&self) -> &[Command] {
        &self.0
    }

    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(Command::render)
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

/// Run a command set as a single shell invocation with inherited stdio.
pub fn execute(command_set: &CommandSet) -> Result<()> {
    let rendered = command_set.render();
    eprintln!("Running: {}", rendered);

    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = ProcessCommand::new("cmd");
        cmd.args(["/C", &rendered]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = ProcessCommand::new("sh");
        cmd.args(["-c", &rendered]);
        cmd
    };

    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| {
            Error::external_command(ExternalCommandDetails {
                command: rendered.clone(),
                exit_code: None,
                stderr: e.to_string(),
            })
        })?;

    if !status.success() {
        return Err(Error::external_command(ExternalCommandDetails {
            command: rendered,
            exit_code: status.code(),
            stderr: String::new(),
        }));
    }

    eprintln!("Done");
    Ok(())
}

/// Execute every set in order, stopping at the first failure.
pub fn execute_all(command_sets: &[CommandSet]) -> Result<()> {
    for command_set in command_sets {
        execute(command_set)?;
    }
    Ok(())
}
