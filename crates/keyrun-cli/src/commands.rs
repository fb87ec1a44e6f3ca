use std::{
    io::{self, Write},
    path::Path,
};

use color_eyre::{eyre::eyre, Result};
use keyrun_core::{
    keystore::KeyStore,
    runner::{CommandOutcome, CommandRunner, CommandSpec},
};
use keyrun_storage::file_codec::FileCodec;
use keyrun_workflow::{files, secrets, Workflow};
use tracing::info;

use crate::config::Config;

/// `keyrun exec -- <argv>`: resolve secrets, then unlock, run, reseal.
/// Returns the exit code to leave the process with.
pub async fn exec<S, R>(
    dir: &Path,
    config: &Config,
    store: &S,
    identity: &str,
    runner: R,
    argv: &[String],
) -> Result<i32>
where
    S: KeyStore + ?Sized,
    R: CommandRunner,
{
    let spec = CommandSpec::from_argv(argv, dir).ok_or_else(|| eyre!("no command given"))?;

    // Every secret is resolved before any file is touched.
    let env = secrets::resolve_env(store, identity, &config.env).await?;
    let mut workflow = Workflow::new(dir, runner);
    if let Some(name) = config.key.as_deref().filter(|k| !k.trim().is_empty()) {
        let secret = secrets::resolve_secret(store, identity, name).await?;
        workflow = workflow.protect(FileCodec::new(&secret), config.discovery());
    }

    let report = workflow.exec(&spec.with_env(env)).await?;
    info!(
        code = ?report.outcome.code,
        resealed = ?report.resealed,
        unchanged = report.unchanged.len(),
        "exec finished"
    );
    Ok(exit_code(report.outcome))
}

/// `keyrun encrypt <src> [dst]`
pub async fn encrypt<S>(
    config: &Config,
    store: &S,
    identity: &str,
    src: &Path,
    dst: Option<&Path>,
) -> Result<()>
where
    S: KeyStore + ?Sized,
{
    let codec = codec_for(config, store, identity).await?;
    let dst = files::encrypt(&codec, src, dst)?;
    println!("Encrypted {} -> {}", src.display(), dst.display());
    Ok(())
}

/// `keyrun decrypt <src> [dst]`
pub async fn decrypt<S>(
    config: &Config,
    store: &S,
    identity: &str,
    src: &Path,
    dst: Option<&Path>,
) -> Result<()>
where
    S: KeyStore + ?Sized,
{
    let codec = codec_for(config, store, identity).await?;
    let dst = files::decrypt(&codec, src, dst)?;
    println!("Decrypted {} -> {}", src.display(), dst.display());
    Ok(())
}

/// `keyrun show <src>`: plaintext goes to `out`, never to disk.
pub async fn show<S, W>(
    config: &Config,
    store: &S,
    identity: &str,
    src: &Path,
    out: &mut W,
) -> Result<()>
where
    S: KeyStore + ?Sized,
    W: Write,
{
    let codec = codec_for(config, store, identity).await?;
    let plaintext = files::show(&codec, src)?;
    out.write_all(&plaintext)?;
    out.flush()?;
    Ok(())
}

/// Convenience for `show` on stdout.
pub async fn show_stdout<S>(config: &Config, store: &S, identity: &str, src: &Path) -> Result<()>
where
    S: KeyStore + ?Sized,
{
    show(config, store, identity, src, &mut io::stdout().lock()).await
}

async fn codec_for<S>(config: &Config, store: &S, identity: &str) -> Result<FileCodec>
where
    S: KeyStore + ?Sized,
{
    let name = config.require_key()?;
    let secret = secrets::resolve_secret(store, identity, name).await?;
    Ok(FileCodec::new(&secret))
}

/// Child's exit code; a child killed by a signal counts as a plain failure.
fn exit_code(outcome: CommandOutcome) -> i32 {
    outcome.code.unwrap_or(1)
}
