use std::{
    ffi::OsString,
    fs, io,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    cipher,
    key::{self, DerivedKey},
};

/// Suffix carried by every encrypted file.
pub const ENC_SUFFIX: &str = ".enc";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decrypt {}: wrong key or corrupted ciphertext", path.display())]
    Authentication { path: PathBuf },
    #[error("cannot encrypt {}: {reason}", path.display())]
    Environment { path: PathBuf, reason: String },
    #[error("no destination for {}: expected a `.enc` suffix", path.display())]
    MissingSuffix { path: PathBuf },
    #[error("source and destination are the same file: {}", path.display())]
    SamePath { path: PathBuf },
}

impl CodecError {
    /// True when the failure came from ciphertext authentication, not from I/O.
    pub fn is_authentication(&self) -> bool {
        matches!(self, CodecError::Authentication { .. })
    }
}

/// `state.tfstate` -> `state.tfstate.enc`
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(ENC_SUFFIX);
    PathBuf::from(raw)
}

/// `state.tfstate.enc` -> `state.tfstate`; `None` without the suffix or for a bare `.enc`.
pub fn plaintext_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let base = name.strip_suffix(ENC_SUFFIX)?;
    if base.is_empty() {
        return None;
    }
    Some(path.with_file_name(base))
}

/// Whole-file encryption under a key derived once from the secret.
#[derive(Debug, Clone)]
pub struct FileCodec {
    key: DerivedKey,
}

impl FileCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            key: key::derive(secret),
        }
    }

    pub fn from_key(key: DerivedKey) -> Self {
        Self { key }
    }

    /// Encrypt `src` into `dst`, replacing `dst` if it exists.
    #[instrument(skip_all, fields(src = %src.display(), dst = %dst.display()))]
    pub fn encrypt_file(&self, src: &Path, dst: &Path) -> Result<(), CodecError> {
        ensure_distinct(src, dst)?;
        let plaintext = read(src)?;
        let blob = cipher::seal(&plaintext, &self.key).map_err(|e| CodecError::Environment {
            path: src.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(dst, &blob)?;
        debug!(bytes = plaintext.len(), "encrypted file");
        Ok(())
    }

    /// Decrypt `src` into `dst`. Nothing is written unless authentication succeeds.
    #[instrument(skip_all, fields(src = %src.display(), dst = %dst.display()))]
    pub fn decrypt_file(&self, src: &Path, dst: &Path) -> Result<(), CodecError> {
        ensure_distinct(src, dst)?;
        let plaintext = self.decrypt_to_bytes(src)?;
        write_atomic(dst, &plaintext)?;
        debug!(bytes = plaintext.len(), "decrypted file");
        Ok(())
    }

    /// Decrypt `src` and hand the plaintext back instead of writing it.
    pub fn decrypt_to_bytes(&self, src: &Path) -> Result<Vec<u8>, CodecError> {
        let blob = read(src)?;
        cipher::open(&blob, &self.key).map_err(|_| CodecError::Authentication {
            path: src.to_path_buf(),
        })
    }

    /// Encrypt `src` into `src.enc`; returns the destination.
    pub fn encrypt_with_suffix(&self, src: &Path) -> Result<PathBuf, CodecError> {
        let dst = encrypted_path(src);
        self.encrypt_file(src, &dst)?;
        Ok(dst)
    }

    /// Decrypt `name.enc` into `name`; returns the destination.
    pub fn decrypt_with_suffix(&self, src: &Path) -> Result<PathBuf, CodecError> {
        let dst = plaintext_path(src).ok_or_else(|| CodecError::MissingSuffix {
            path: src.to_path_buf(),
        })?;
        self.decrypt_file(src, &dst)?;
        Ok(dst)
    }
}

/// Refuse to write over the source, however `dst` spells it: `a/../src`, a
/// symlink or a hard link all name the same file.
fn ensure_distinct(src: &Path, dst: &Path) -> Result<(), CodecError> {
    if src == dst || same_file(src, dst) {
        return Err(CodecError::SamePath {
            path: src.to_path_buf(),
        });
    }
    Ok(())
}

/// Both paths exist and resolve to one file. A missing `dst` cannot alias `src`.
#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn read(path: &Path) -> Result<Vec<u8>, CodecError> {
    fs::read(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a temp file in the destination directory, then rename over `path`.
/// The temp file is created owner-only, so plaintext never appears world-readable.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CodecError> {
    let write_err = |source: io::Error| CodecError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(data).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
