use std::{io, path::PathBuf};

use keyrun_core::keystore::KeyStoreError;
use keyrun_storage::file_codec::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("cannot resolve key `{name}`: {source}")]
    Secret {
        name: String,
        #[source]
        source: KeyStoreError,
    },
    #[error("cannot resolve key `{name}` for ${var}: {source}")]
    EnvSecret {
        var: String,
        name: String,
        #[source]
        source: KeyStoreError,
    },
    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("declared file `{name}` must be a relative path inside the working directory")]
    OutsideRoot { name: String },
    #[error("declared file has no encrypted copy: {}", path.display())]
    NotProtected { path: PathBuf },
    #[error(
        "plaintext {} already exists next to its encrypted copy; remove or re-encrypt it first",
        path.display()
    )]
    StalePlaintext { path: PathBuf },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Unlocking failed and some plaintexts created so far could not be removed.
    #[error("{source}; {}", join_failures(.leftovers))]
    UnlockAborted {
        #[source]
        source: Box<WorkflowError>,
        leftovers: Vec<ResealFailure>,
    },
    /// Raised after the command ran; everything else was sealed and cleaned as far as possible.
    #[error("{}", join_failures(.failures))]
    Reseal { failures: Vec<ResealFailure> },
}

impl WorkflowError {
    /// True for failures that happened before the command was started.
    pub fn before_run(&self) -> bool {
        !matches!(self, WorkflowError::Reseal { .. })
    }
}

/// One problem found while finishing an `exec` invocation.
#[derive(Debug, Error)]
pub enum ResealFailure {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{name} was not re-encrypted: {source}{}", kept_note(.kept))]
    Seal {
        name: String,
        /// Plaintext left on disk so modified data is not lost.
        kept: Option<PathBuf>,
        #[source]
        source: CodecError,
    },
    #[error("plaintext {} could not be removed: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn join_failures(failures: &[ResealFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn kept_note(kept: &Option<PathBuf>) -> String {
    kept.as_ref()
        .map(|path| format!(" (plaintext left at {})", path.display()))
        .unwrap_or_default()
}
