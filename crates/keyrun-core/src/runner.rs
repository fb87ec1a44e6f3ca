//! External command execution abstraction.
//!
//! The workflow only needs "run this and wait"; keeping it behind a trait lets
//! the unlock/reseal sequence be tested without spawning real processes.

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;

/// A command to run against the unlocked working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child.
    pub cwd: PathBuf,
    /// Extra variables exported to the child only.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Build a spec from an argv-style list (`["terraform", "plan"]`).
    /// Returns `None` when the list is empty.
    pub fn from_argv(argv: &[String], cwd: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        })
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Human-readable form for logs; never includes env values.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How the child finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, or `None` if the child was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a command to completion with the caller's standard streams.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome>;
}
