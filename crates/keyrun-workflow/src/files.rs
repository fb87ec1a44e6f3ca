//! One-shot operations on a single file: the degenerate, one-file case of the
//! reseal workflow without a command in between.

use std::{
    fs,
    path::{Path, PathBuf},
};

use keyrun_storage::file_codec::{encrypted_path, plaintext_path, CodecError, FileCodec};
use tracing::info;

use crate::error::WorkflowError;

/// Encrypt `src` (to `dst`, default `src.enc`) and remove the plaintext source.
pub fn encrypt(codec: &FileCodec, src: &Path, dst: Option<&Path>) -> Result<PathBuf, WorkflowError> {
    let dst = dst.map_or_else(|| encrypted_path(src), Path::to_path_buf);
    codec.encrypt_file(src, &dst)?;
    remove_source(src)?;
    info!(src = %src.display(), dst = %dst.display(), "encrypted");
    Ok(dst)
}

/// Decrypt `src` (to `dst`, default `src` without `.enc`) and remove the ciphertext source.
pub fn decrypt(codec: &FileCodec, src: &Path, dst: Option<&Path>) -> Result<PathBuf, WorkflowError> {
    let dst = match dst {
        Some(dst) => dst.to_path_buf(),
        None => plaintext_path(src).ok_or_else(|| CodecError::MissingSuffix {
            path: src.to_path_buf(),
        })?,
    };
    codec.decrypt_file(src, &dst)?;
    remove_source(src)?;
    info!(src = %src.display(), dst = %dst.display(), "decrypted");
    Ok(dst)
}

/// Decrypted contents of `src`, for printing. Nothing is written to disk.
pub fn show(codec: &FileCodec, src: &Path) -> Result<Vec<u8>, WorkflowError> {
    Ok(codec.decrypt_to_bytes(src)?)
}

fn remove_source(path: &Path) -> Result<(), WorkflowError> {
    fs::remove_file(path).map_err(|source| WorkflowError::Remove {
        path: path.to_path_buf(),
        source,
    })
}
