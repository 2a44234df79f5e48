// Entrypoint for the CLI application.
// Keeps `main` small: load config, open a session, hand off to `commands`.

use std::time::Duration;

use anyhow::Context;
use casjobs_cli::{
    api::{CasJobsClient, JobId, JobStatus},
    args::{Cli, Command},
    commands::{self, PollPolicy, Waiter},
    config::{config_path, AppConfig},
    keystone::KeystoneClient,
    session::Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let path = config_path(args.config.as_deref());
    let config = AppConfig::load(&path).context("Failed to load config")?;

    let keystone = KeystoneClient::new(&config.keystone.host, config.credentials())?;
    let api = CasJobsClient::new(&config.casjobs.url)?;
    let mut session =
        Session::open(keystone, config.token_store()).context("Failed to obtain a token")?;

    let spinner = match args.command {
        Command::SubmitWait(_) => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
        _ => ProgressBar::hidden(),
    };
    let mut waiter = Waiter {
        progress: Box::new(|id: &JobId, status: &JobStatus| {
            spinner.set_message(format!("Job {id}: status {}", status.status));
        }),
        ..Waiter::blocking(PollPolicy::default())
    };

    let mut out = std::io::stdout().lock();
    let result = commands::run(&args.command, &mut session, &api, &mut out, &mut waiter);
    spinner.finish_and_clear();
    result
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
