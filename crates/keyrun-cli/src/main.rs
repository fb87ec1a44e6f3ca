mod cli;
mod commands;
mod config;
mod keys;
mod runner;

use std::env;

use clap::Parser;
use color_eyre::Result;
use keyrun_core::keystore::current_identity;
use keyrun_storage::keyring_store::KeyringStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{cli::Command, keys::TerminalPrompter, runner::ProcessRunner};

/// Entry point: the only place that turns failures into a process exit.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let code = run(cli).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing() {
    // Logs go to stderr so the child's output and `show` stay clean on stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn run(cli: cli::Cli) -> Result<i32> {
    let dir = env::current_dir()?;
    let store = KeyringStore::new();
    let load_config = || config::load(&dir, cli.config.as_deref());

    match cli.command {
        Command::Version => print_version(),
        Command::Exec { command } => {
            let config = load_config()?;
            let identity = current_identity()?;
            return commands::exec(&dir, &config, &store, &identity, ProcessRunner, &command)
                .await;
        }
        Command::Encrypt { src, dst } => {
            let config = load_config()?;
            let identity = current_identity()?;
            commands::encrypt(&config, &store, &identity, &src, dst.as_deref()).await?;
        }
        Command::Decrypt { src, dst } => {
            let config = load_config()?;
            let identity = current_identity()?;
            commands::decrypt(&config, &store, &identity, &src, dst.as_deref()).await?;
        }
        Command::Show { src } => {
            let config = load_config()?;
            let identity = current_identity()?;
            commands::show_stdout(&config, &store, &identity, &src).await?;
        }
        Command::Key(cmd) => {
            let identity = current_identity()?;
            keys::handle(cmd, &store, &identity, &mut TerminalPrompter).await?;
        }
    }
    Ok(0)
}

fn print_version() {
    println!("keyrun {}", env!("CARGO_PKG_VERSION"));
}
