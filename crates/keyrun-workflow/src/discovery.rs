use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use keyrun_storage::file_codec::{encrypted_path, ENC_SUFFIX};
use tracing::{debug, warn};

use crate::error::WorkflowError;

/// Which files an `exec` invocation unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Discovery {
    /// Every `*.enc` regular file directly inside the working directory.
    #[default]
    Scan,
    /// Exactly these base names (relative to the working directory).
    Declared(Vec<String>),
}

/// A protected file for the duration of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub plaintext: PathBuf,
    pub ciphertext: PathBuf,
    /// Fingerprint of the freshly decrypted plaintext; empty until unlocked.
    pub baseline: String,
}

impl FileRecord {
    pub fn new(root: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        let plaintext = root.join(&name);
        let ciphertext = encrypted_path(&plaintext);
        Self {
            name,
            plaintext,
            ciphertext,
            baseline: String::new(),
        }
    }
}

impl Discovery {
    /// Resolve the protected set under `root`, sorted by name.
    ///
    /// Fails without touching anything if a declared file has no `.enc` copy or
    /// if a plaintext already sits next to its ciphertext.
    pub fn discover(&self, root: &Path) -> Result<Vec<FileRecord>, WorkflowError> {
        let mut names = match self {
            Discovery::Scan => scan(root)?,
            Discovery::Declared(names) => names
                .iter()
                .map(|n| declared_name(n.trim()))
                .collect::<Result<_, _>>()?,
        };
        names.sort();
        names.dedup();

        let records: Vec<FileRecord> = names
            .into_iter()
            .map(|name| FileRecord::new(root, name))
            .collect();

        for record in &records {
            if !record.ciphertext.is_file() {
                return Err(WorkflowError::NotProtected {
                    path: record.ciphertext.clone(),
                });
            }
            if record.plaintext.exists() {
                return Err(WorkflowError::StalePlaintext {
                    path: record.plaintext.clone(),
                });
            }
        }

        debug!(count = records.len(), "discovered protected files");
        Ok(records)
    }
}

/// Declared names stay under the working directory: relative, no `..`.
fn declared_name(name: &str) -> Result<String, WorkflowError> {
    let path = Path::new(name);
    let inside = path.file_name().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside {
        return Err(WorkflowError::OutsideRoot {
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

fn scan(root: &Path) -> Result<Vec<String>, WorkflowError> {
    let scan_err = |source: io::Error| WorkflowError::Scan {
        path: root.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if !entry.path().is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            warn!(name = ?entry.file_name(), "skipping non-UTF-8 file name");
            continue;
        };
        if let Some(base) = file_name.strip_suffix(ENC_SUFFIX) {
            if !base.is_empty() {
                names.push(base.to_string());
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, name: &str) {
        fs::write(root.join(name), b"x").expect("write fixture");
    }

    #[test]
    fn scan_finds_enc_files_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "b.tfstate.enc");
        touch(dir.path(), "a.enc");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".enc");
        fs::create_dir(dir.path().join("dir.enc")).expect("mkdir");

        let records = Discovery::Scan.discover(dir.path()).expect("discover");
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b.tfstate"]);
        assert_eq!(records[0].plaintext, dir.path().join("a"));
        assert_eq!(records[0].ciphertext, dir.path().join("a.enc"));
        assert!(records.iter().all(|r| r.baseline.is_empty()));
    }

    #[test]
    fn scan_of_empty_directory_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let records = Discovery::Scan.discover(dir.path()).expect("discover");
        assert!(records.is_empty());
    }

    #[test]
    fn declared_list_ignores_other_enc_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "terraform.tfstate.enc");
        touch(dir.path(), "unrelated.enc");

        let policy = Discovery::Declared(vec!["terraform.tfstate".into()]);
        let records = policy.discover(dir.path()).expect("discover");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "terraform.tfstate");
    }

    #[test]
    fn declared_file_without_ciphertext_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let policy = Discovery::Declared(vec!["terraform.tfstate".into()]);
        let err = policy.discover(dir.path()).expect_err("missing .enc");
        assert!(matches!(err, WorkflowError::NotProtected { .. }));
    }

    #[test]
    fn declared_files_must_stay_inside_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = dir.path().join("outside");
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("env")).expect("mkdir");
        fs::create_dir(&outside).expect("mkdir");
        touch(&outside, "state.enc");
        touch(&root.join("env"), "prod.tfvars.enc");

        let absolute = outside.join("state").to_string_lossy().into_owned();
        for name in ["../outside/state", "env/../../outside/state", absolute.as_str(), "."] {
            let err = Discovery::Declared(vec![name.into()])
                .discover(&root)
                .expect_err("outside the root");
            assert!(
                matches!(&err, WorkflowError::OutsideRoot { name: n } if n == name),
                "{name}: {err}"
            );
        }

        let records = Discovery::Declared(vec!["env/prod.tfvars".into()])
            .discover(&root)
            .expect("nested file is fine");
        assert_eq!(records[0].plaintext, root.join("env/prod.tfvars"));
    }

    #[test]
    fn leftover_plaintext_aborts_discovery() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "data.enc");
        touch(dir.path(), "data");

        let err = Discovery::Scan.discover(dir.path()).expect_err("stale");
        match err {
            WorkflowError::StalePlaintext { path } => assert_eq!(path, dir.path().join("data")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
