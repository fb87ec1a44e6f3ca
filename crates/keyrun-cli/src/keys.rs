//! Interactive key management against the key store.

use std::io::{self, BufRead, Write};

use color_eyre::{eyre::bail, Result};
use keyrun_core::keystore::{service_name, KeyStore};
use tracing::info;

use crate::cli::KeyCommand;

/// Source of interactive answers.
pub trait Prompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
    /// Like `ask`, without echoing the input.
    fn ask_secret(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads answers from the terminal; prompts go to stderr.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{prompt}")?;
        stderr.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }

    fn ask_secret(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

/// Dispatch a `key` subcommand.
pub async fn handle<S, P>(cmd: KeyCommand, store: &S, identity: &str, prompter: &mut P) -> Result<()>
where
    S: KeyStore + ?Sized,
    P: Prompter,
{
    match cmd {
        KeyCommand::Create => {
            let name = create(store, identity, prompter).await?;
            println!("Created key {}", service_name(&name));
        }
        KeyCommand::Show => println!("{}", show(store, identity, prompter).await?),
        KeyCommand::Delete => {
            let name = delete(store, identity, prompter).await?;
            println!("Deleted key {}", service_name(&name));
        }
    }
    Ok(())
}

/// Ask for a name and a secret entered twice; store it when both entries match.
pub async fn create<S, P>(store: &S, identity: &str, prompter: &mut P) -> Result<String>
where
    S: KeyStore + ?Sized,
    P: Prompter,
{
    let name = ask_name(prompter)?;
    let first = prompter.ask_secret("Enter a key: ")?.trim().to_string();
    let second = prompter.ask_secret("One more time please: ")?.trim().to_string();

    if first != second {
        bail!("entered keys do not match");
    }
    if first.is_empty() {
        bail!("key must not be empty");
    }

    store.set(&name, identity, &first).await?;
    info!(service = %service_name(&name), "created key");
    Ok(name)
}

pub async fn show<S, P>(store: &S, identity: &str, prompter: &mut P) -> Result<String>
where
    S: KeyStore + ?Sized,
    P: Prompter,
{
    let name = ask_name(prompter)?;
    Ok(store.get(&name, identity).await?)
}

/// Delete a key after the user answers exactly `yes`.
pub async fn delete<S, P>(store: &S, identity: &str, prompter: &mut P) -> Result<String>
where
    S: KeyStore + ?Sized,
    P: Prompter,
{
    let name = ask_name(prompter)?;
    let answer = prompter.ask(
        "Are you sure? Any encrypted files cannot be decrypted if key is deleted! (yes/No): ",
    )?;
    if answer.trim_end_matches(['\r', '\n']) != "yes" {
        bail!("skipping, only 'yes' is accepted as a confirmation");
    }

    store.delete(&name, identity).await?;
    info!(service = %service_name(&name), "deleted key");
    Ok(name)
}

fn ask_name<P: Prompter>(prompter: &mut P) -> Result<String> {
    let name = prompter.ask("Enter a key name: ")?.trim().to_string();
    if name.is_empty() {
        bail!("key name must not be empty");
    }
    Ok(name)
}
