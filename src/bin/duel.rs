use std::{
    io::{BufRead, BufReader, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use clap::Parser;
use duel_client::{logger::init_logger, prelude::*};
use tracing::error;

/// Join the duel queue, read the task, and submit solutions.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Base URL of the duel API (overrides DUEL_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Write logs to a file (overrides DUEL_LOG)
    #[arg(long)]
    log: bool,

    /// Directory of the log file (overrides DUEL_LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Configuration::from_env();
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url);
    }
    if args.log {
        config = config.with_log(true);
    }
    if let Some(dir) = args.log_dir {
        config = config.with_log_dir(dir);
    }
    if config.log() {
        init_logger(config.log_dir())?;
    }

    let console: Arc<dyn Console> = Arc::new(StdoutConsole);
    let transport = Arc::new(HttpTransport::new(config.request_timeout())?);
    let gateway = Arc::new(Gateway::new(
        transport,
        CredentialStore::new(),
        config.base_url(),
    ));

    let mut stdin = BufReader::new(std::io::stdin());
    let nickname = ask(&mut stdin, "Login: ")?;
    let password = ask(&mut stdin, "Password: ")?;
    if let Err(e) = gateway.login(&nickname, &password) {
        error!("login failed: {e}");
        console.say(&format!("Authentication error: {e}"));
        return Ok(());
    }
    console.say("\nWelcome!");

    let controller = DuelController::new(DuelApi::new(gateway), console.clone(), config);
    if let Err(e) = controller.connect() {
        console.say(&format!("Could not join the duel queue: {e}"));
        return Ok(());
    }

    match repl::run(&controller, console, stdin)? {
        Exit::DuelOver(_) | Exit::InputClosed => Ok(()),
    }
}

fn ask(input: &mut impl BufRead, prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    std::io::stdout().flush().context("could not write to stdout")?;
    let mut line = String::new();
    input.read_line(&mut line).context("could not read stdin")?;
    Ok(line.trim().to_owned())
}
