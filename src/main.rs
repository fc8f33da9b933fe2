//! LJPics - cached LiveJournal userpics
//!
//! CLI entry point: loads configuration, opens the profile store and
//! dispatches to the requested view.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ljpics::cache::ProfileStore;
use ljpics::cli::{Cli, Command};
use ljpics::config::Config;
use ljpics::data::FoafClient;
use ljpics::present;
use ljpics::refresh::Resolver;

/// Logs go to stderr: 0 = warn, 1 = info, 2+ = debug. `RUST_LOG` wins if set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "ljpics=warn",
        1 => "ljpics=info",
        _ => "ljpics=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(database) = cli.database {
        config.database = Some(database);
    }

    let store = match &config.database {
        Some(path) => ProfileStore::open(path)?,
        None => ProfileStore::open_default()?,
    };
    debug!(path = ?store.path(), "opened profile store");

    let client = FoafClient::with_settings(config.request_timeout(), &config.user_agent)?;
    let resolver = Resolver::from_config(Arc::new(store), client, &config);

    match cli.command {
        Command::Image(arg) => {
            let resolution = resolver.resolve_or_stale(&arg.user).await?;
            println!(
                "{}",
                present::image_target(resolution.profile(), &config.default_userpic)
            );
        }
        Command::Json { target, callback } => {
            let resolution = resolver.resolve_or_stale(&target.user).await?;
            println!(
                "{}",
                present::json_payload(resolution.profile(), callback.as_deref())
            );
        }
        Command::Info(arg) => {
            let resolution = resolver.resolve_or_stale(&arg.user).await?;
            match present::user_info(resolution.profile(), resolver.service()) {
                Some(info) => print!("{}", present::render_info_html(&info)),
                None => println!("{}", present::UNAVAILABLE),
            }
        }
        Command::Refresh(arg) => {
            println!("{}", resolver.refresh_command(&arg.user).await?);
        }
        Command::Count => {
            println!("{}", present::index_summary(resolver.store().count_all()?));
        }
        Command::Block(arg) => {
            let identity = resolver.block(&arg.user)?;
            println!("Blocked {identity}.");
        }
        Command::Unblock(arg) => {
            let (identity, changed) = resolver.unblock(&arg.user)?;
            if changed {
                println!("Unblocked {identity}.");
            } else {
                println!("No cached row for {identity}.");
            }
        }
    }

    Ok(())
}
