//! Content fingerprints for change detection. Not an integrity check; the
//! ciphertext tag covers that.

use std::{fs::File, io, path::Path};

use sha2::{Digest, Sha256};

use crate::file_codec::CodecError;

/// Hex-encoded SHA-256 of the file at `path`, streamed from disk.
pub fn fingerprint(path: &Path) -> Result<String, CodecError> {
    let read_err = |source: io::Error| CodecError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_err)?;
    Ok(hex::encode(hasher.finalize()))
}
