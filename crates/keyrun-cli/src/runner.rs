use std::process::Stdio;

use anyhow::Result;
use async_trait::async_trait;
use keyrun_core::runner::{CommandOutcome, CommandRunner, CommandSpec};
use tokio::process::Command;
use tracing::debug;

/// Spawns the command as a real child process with the terminal passed straight through.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome> {
        debug!(command = %spec.display(), env = spec.env.len(), "spawning");
        let status = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;
        Ok(CommandOutcome {
            code: status.code(),
        })
    }
}
