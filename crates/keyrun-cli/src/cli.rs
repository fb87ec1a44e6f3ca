use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "keyrun",
    about = "Run commands against state files that stay encrypted at rest",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Config file to use instead of `.keyrun.yml` in the current directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Decrypt protected files, run a command, re-encrypt whatever changed.
    ///
    /// Once every file is re-encrypted and the plaintext removed, keyrun exits
    /// with the command's own exit code (1 if it was killed by a signal).
    Exec {
        /// Command and arguments, after `--`.
        #[arg(last = true, required = true, value_name = "COMMAND")]
        command: Vec<String>,
    },
    /// Encrypt a file (default destination: `<src>.enc`) and remove the original.
    Encrypt { src: PathBuf, dst: Option<PathBuf> },
    /// Decrypt a file (default destination: `<src>` without `.enc`) and remove the original.
    Decrypt { src: PathBuf, dst: Option<PathBuf> },
    /// Print the decrypted contents of a file.
    Show { src: PathBuf },
    /// Manage secrets in the OS keyring.
    #[command(subcommand)]
    Key(KeyCommand),
    /// Print version and exit.
    Version,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Store a new key.
    Create,
    /// Print a stored key.
    Show,
    /// Delete a key. Files encrypted with it can no longer be decrypted.
    Delete,
}
