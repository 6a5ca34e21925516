//! cardscroll CLI: browse a paginated card search from the terminal.
//!
//! Three modes:
//! - **Shell mode**: `cardscroll [flags] COMMAND`, single command, exit
//! - **REPL mode**: `cardscroll [flags]`, interactive prompt (if stdin is TTY)
//! - **Pipe mode**: `printf 'search elf\nmore\n' | cardscroll`, line-by-line from stdin
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `warn`).

mod commands;
mod format;
mod parse;
mod repl;
mod state;

use std::io::IsTerminal;
use std::path::Path;
use std::process;
use std::sync::Arc;

use cardscroll_core::Error;
use cardscroll_engine::{CacheConfig, SearchCache, CONFIG_FILE_NAME};
use cardscroll_remote::{HttpSearchClient, InMemorySearchClient};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, OutputMode};
use state::{DynClient, SessionState};

fn main() {
    let cli = build_cli();
    let matches = cli.get_matches();

    init_tracing();

    // Determine output mode
    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else if matches.get_flag("raw") {
        OutputMode::Raw
    } else {
        OutputMode::Human
    };

    let state = match open_session(&matches) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };

    // Dispatch mode
    let exit_code = if matches.subcommand().is_some() {
        if repl::execute_action(&matches, &state, output_mode) {
            0
        } else {
            1
        }
    } else if std::io::stdin().is_terminal() {
        repl::run_repl(&state, output_mode)
    } else {
        repl::run_pipe(&state, output_mode)
    };
    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &clap::ArgMatches) -> Result<CacheConfig, Error> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => CacheConfig::from_file(Path::new(path))?,
        None => {
            let local = Path::new(CONFIG_FILE_NAME);
            if local.exists() {
                CacheConfig::from_file(local)?
            } else {
                CacheConfig::default()
            }
        }
    };

    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        config.remote.endpoint = endpoint.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_session(matches: &clap::ArgMatches) -> Result<SessionState, Error> {
    let config = load_config(matches)?;

    let client: DynClient = match matches.get_one::<usize>("offline") {
        Some(&count) => {
            tracing::info!(target: "cardscroll::remote", count, "serving offline corpus");
            Arc::new(InMemorySearchClient::numbered(count, config.remote_page_size))
        }
        None => Arc::new(HttpSearchClient::new(&config.remote)?),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::invalid_config(format!("cannot start runtime: {}", e)))?;

    let cache = SearchCache::new(client, &config)?;
    Ok(SessionState::new(runtime, cache))
}
