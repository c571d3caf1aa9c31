use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rs_digest_cast::config::load_config;
use rs_digest_cast::mail::imap_client::{Credentials, ImapConnector, ImapStore};
use rs_digest_cast::mail::session::MailStore;
use rs_digest_cast::narration::Narrator;
use rs_digest_cast::narration::google_tts::GoogleTts;
use rs_digest_cast::pipeline::{PipelineDriver, RunOutcome};

#[derive(Parser)]
#[command(name = "rs_digest_cast")]
#[command(about = "Turn today's newsletters into one narrated digest", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/rs_digest_cast/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest today's newsletters, write the digest and narrate it
    Run {
        /// Where the .txt and .mp3 land (overrides output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Log in and list the account's mailboxes
    Mailboxes,

    /// Print the configured sources in harvest order
    Sources,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg =
        load_config(cli.config.as_deref()).map_err(|e| anyhow!("Configuration error: {e:#}"))?;

    match cli.cmd.unwrap_or(Command::Run { output_dir: None }) {
        Command::Run { output_dir } => {
            if let Some(dir) = output_dir {
                cfg.output_dir = dir;
            }
            let connector =
                ImapConnector::new(cfg.imap_server.clone(), cfg.imap_port, Credentials::from_env());
            let tts = GoogleTts::new(&cfg.narration.language, &cfg.narration.tld)?;
            let narrator = Narrator::new(tts, cfg.narration.retry.clone());

            let report = PipelineDriver::new(cfg, connector, narrator).run();
            match &report.outcome {
                RunOutcome::Narrated { entries, .. } => {
                    log::info!("Narrated {entries} newsletter(s) for {}", report.run_date)
                }
                RunOutcome::EmptyDigest => {
                    log::info!("No newsletters for {}; nothing written", report.run_date)
                }
                RunOutcome::Failed { error, text_path } => {
                    log::error!("An error occurred: {error}");
                    if let Some(p) = text_path {
                        log::info!("Digest text kept at {}", p.display());
                    }
                }
            }
            Ok(())
        }

        Command::Mailboxes => {
            let mut store =
                ImapStore::connect(&cfg.imap_server, cfg.imap_port, &Credentials::from_env())?;
            let listed = store.list_mailboxes();
            store.logout()?;
            println!("Available mailboxes:");
            for name in listed? {
                println!("{name}");
            }
            Ok(())
        }

        Command::Sources => {
            for (i, s) in cfg.sources.iter().enumerate() {
                println!("{:>2}. {} <{}>", i + 1, s.label, s.address);
            }
            Ok(())
        }
    }
}
