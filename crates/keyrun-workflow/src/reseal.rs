//! Unlock, run, reseal, clean up.
//!
//! One `exec` invocation walks Discovering -> Unlocking -> Running -> Sealing ->
//! CleaningUp. Anything that goes wrong before Running aborts with no plaintext
//! left behind and the command never started. Once the command has run, sealing
//! and cleanup always happen, whatever the command's exit status was.

use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use keyrun_core::runner::{CommandOutcome, CommandRunner, CommandSpec};
use keyrun_storage::{
    file_codec::{CodecError, FileCodec},
    fingerprint::fingerprint,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    discovery::{Discovery, FileRecord},
    error::{ResealFailure, WorkflowError},
};

/// Result of a completed `exec` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecReport {
    pub outcome: CommandOutcome,
    /// Files whose content changed and were re-encrypted.
    pub resealed: Vec<String>,
    /// Files left byte-identical; their `.enc` was not rewritten.
    pub unchanged: Vec<String>,
}

struct Protection {
    codec: FileCodec,
    discovery: Discovery,
}

/// Reseal orchestrator bound to one working directory.
pub struct Workflow<R: CommandRunner> {
    root: PathBuf,
    runner: R,
    protection: Option<Protection>,
}

impl<R: CommandRunner> Workflow<R> {
    /// A workflow that only runs the command; no files are unlocked.
    pub fn new(root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            root: root.into(),
            runner,
            protection: None,
        }
    }

    /// Unlock the files selected by `discovery` with `codec` around each run.
    pub fn protect(mut self, codec: FileCodec, discovery: Discovery) -> Self {
        self.protection = Some(Protection { codec, discovery });
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[instrument(skip_all, fields(command = %spec.display()))]
    pub async fn exec(&self, spec: &CommandSpec) -> Result<ExecReport, WorkflowError> {
        let records = match &self.protection {
            Some(protection) => {
                let mut records = protection.discovery.discover(&self.root)?;
                unlock(&protection.codec, &mut records)?;
                records
            }
            None => Vec::new(),
        };
        info!(files = records.len(), "unlocked protected files");

        let mut failures = Vec::new();
        let outcome = match self.runner.run(spec).await {
            Ok(outcome) => {
                debug!(code = ?outcome.code, "command finished");
                Some(outcome)
            }
            Err(source) => {
                failures.push(ResealFailure::Launch {
                    command: spec.display(),
                    source,
                });
                None
            }
        };

        let mut resealed = Vec::new();
        let mut unchanged = Vec::new();
        let mut kept = HashSet::new();
        if let Some(protection) = &self.protection {
            for record in &records {
                match seal_one(&protection.codec, record) {
                    Ok(true) => resealed.push(record.name.clone()),
                    Ok(false) => unchanged.push(record.name.clone()),
                    Err(source) => {
                        let present = record.plaintext.is_file();
                        if present {
                            kept.insert(record.name.clone());
                        }
                        error!(file = %record.name, "re-encryption failed: {source}");
                        failures.push(ResealFailure::Seal {
                            name: record.name.clone(),
                            kept: present.then(|| record.plaintext.clone()),
                            source,
                        });
                    }
                }
            }
        }
        info!(
            resealed = resealed.len(),
            unchanged = unchanged.len(),
            "sealed protected files"
        );

        for record in records.iter().filter(|r| !kept.contains(&r.name)) {
            if let Err(source) = remove_plaintext(&record.plaintext) {
                error!(path = %record.plaintext.display(), "plaintext left on disk: {source}");
                failures.push(ResealFailure::Cleanup {
                    path: record.plaintext.clone(),
                    source,
                });
            }
        }

        match outcome {
            Some(outcome) if failures.is_empty() => Ok(ExecReport {
                outcome,
                resealed,
                unchanged,
            }),
            _ => Err(WorkflowError::Reseal { failures }),
        }
    }
}

/// Decrypt every record and store its baseline fingerprint. On the first
/// failure, plaintexts created so far are removed again.
fn unlock(codec: &FileCodec, records: &mut [FileRecord]) -> Result<(), WorkflowError> {
    for index in 0..records.len() {
        if let Err(err) = unlock_one(codec, &mut records[index]) {
            let leftovers = roll_back(&records[..=index]);
            if leftovers.is_empty() {
                return Err(err);
            }
            return Err(WorkflowError::UnlockAborted {
                source: Box::new(err),
                leftovers,
            });
        }
    }
    Ok(())
}

fn unlock_one(codec: &FileCodec, record: &mut FileRecord) -> Result<(), WorkflowError> {
    codec.decrypt_file(&record.ciphertext, &record.plaintext)?;
    record.baseline = fingerprint(&record.plaintext)?;
    debug!(file = %record.name, "unlocked");
    Ok(())
}

/// Returns the plaintexts that are still on disk.
fn roll_back(records: &[FileRecord]) -> Vec<ResealFailure> {
    let mut leftovers = Vec::new();
    for record in records {
        if let Err(source) = remove_plaintext(&record.plaintext) {
            error!(path = %record.plaintext.display(), "failed to remove plaintext: {source}");
            leftovers.push(ResealFailure::Cleanup {
                path: record.plaintext.clone(),
                source,
            });
        }
    }
    warn!(
        files = records.len(),
        left = leftovers.len(),
        "unlock aborted, plaintexts removed"
    );
    leftovers
}

/// Returns `true` when the file changed and was re-encrypted.
fn seal_one(codec: &FileCodec, record: &FileRecord) -> Result<bool, CodecError> {
    let current = fingerprint(&record.plaintext)?;
    if current == record.baseline {
        return Ok(false);
    }
    codec.encrypt_file(&record.plaintext, &record.ciphertext)?;
    debug!(file = %record.name, "resealed");
    Ok(true)
}

fn remove_plaintext(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
