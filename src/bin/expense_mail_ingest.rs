use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use expense_mail_ingest::auth::credentials::{self, Credentials};
use expense_mail_ingest::config::{Config, load_config, resolve_db_path};
use expense_mail_ingest::domain::date_range::DateRange;
use expense_mail_ingest::extract::FieldExtractor;
use expense_mail_ingest::ingest::Ingestor;
use expense_mail_ingest::ingest::cancel::CancelToken;
use expense_mail_ingest::ingest::report::Response;
use expense_mail_ingest::mail::imap_client::ImapSource;
use expense_mail_ingest::store::repo::TransactionStore;
use expense_mail_ingest::store::sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "expense_mail_ingest")]
#[command(about = "Import bank transfer notifications from a mailbox", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the mailbox once and store new transactions
    Ingest {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Also print one JSON line per message on stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print stored transactions for the configured mailbox
    List {
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },

    /// Store the mailbox app password in the OS keyring
    SetAppPassword,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;

    match cli.cmd {
        Command::SetAppPassword => {
            let address = mailbox_address(&cfg)?;
            eprintln!("Paste app password for {address} (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            let secret = secret.trim();
            if secret.is_empty() {
                return Err(anyhow!("empty password, nothing stored"));
            }
            credentials::save_app_password(&address, secret)?;
            println!("Saved app password for {address}");
            Ok(())
        }

        Command::Ingest { from, to, verbose } => {
            let response = ingest(&cfg, from.as_deref(), to.as_deref(), verbose)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.is_error() {
                std::process::exit(1);
            }
            Ok(())
        }

        Command::List { from, to } => {
            let range = DateRange::parse(from.as_deref(), to.as_deref())?;
            let store = SqliteStore::open(&resolve_db_path(&cfg)?)?;
            let records = store.list(&mailbox_address(&cfg)?, &range)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
    }
}

/// Runs one ingestion. Pipeline errors are folded into the response; only
/// local problems (store, config values) come back as `Err`.
fn ingest(cfg: &Config, from: Option<&str>, to: Option<&str>, verbose: bool) -> Result<Response> {
    let range = match DateRange::parse(from, to) {
        Ok(r) => r,
        Err(e) => return Ok(Response::from(Err(e))),
    };

    let creds = Credentials::load(cfg.user_email.clone());
    let store = SqliteStore::open(&resolve_db_path(cfg)?)?;
    let source = ImapSource::new(cfg.imap_server.clone(), cfg.imap_port, cfg.mailbox.clone())
        .with_timeouts(cfg.connect_timeout(), cfg.io_timeout());

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("Interrupt received; stopping after the current message");
        handler_token.cancel();
    })?;

    let ingestor = Ingestor::new(
        &source,
        &store,
        FieldExtractor::new(cfg.provider_utc_offset),
        cfg.sender_address.clone(),
    )
    .with_fallback(cfg.fallback_id.strategy())
    .with_cancel(cancel)
    .with_run_timeout(cfg.run_timeout());

    let res = ingestor.run(&creds, &range);
    if verbose && let Ok(report) = &res {
        for outcome in &report.outcomes {
            eprintln!("{}", serde_json::to_string(outcome)?);
        }
    }
    Ok(Response::from(res))
}

fn mailbox_address(cfg: &Config) -> Result<String> {
    cfg.user_email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("user_email not set in config"))
}
