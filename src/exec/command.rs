//! Command templates and invocations.
//!
//! A [`CommandTemplate`] is an immutable program + base argument list. Each
//! call to [`CommandTemplate::invocation`] yields an independent
//! [`Invocation`] that can be extended with per-run arguments, so sequential
//! runs never share mutable state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Reusable, immutable command definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Program to execute (looked up on `PATH`).
    program: String,
    /// Arguments always passed to the program.
    #[serde(default)]
    args: Vec<String>,
}

/// A single, fully-specified command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandTemplate {
    /// Creates a template from a program and its base arguments.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the base arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Starts a fresh invocation from this template.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: self.args.clone(),
            current_dir: None,
        }
    }
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory; defaults to the caller's.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Returns the program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the full argument list.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Builds the process command. Arguments are passed as discrete tokens.
    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
