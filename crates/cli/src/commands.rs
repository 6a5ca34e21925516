//! Clap command tree definition.
//!
//! Builds the full `clap::Command` tree used by both shell mode (directly)
//! and REPL mode (via `try_get_matches_from`).

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
///
/// This is shared between shell mode and REPL mode.
pub fn build_cli() -> Command {
    Command::new("cardscroll")
        .about("Browse a paginated card search from the terminal")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Config file (default: ./cardscroll.toml if present)")
                .global(true),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .help("Search API endpoint, overrides the config file")
                .global(true),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .help("Serve a generated corpus of N cards instead of the remote API")
                .value_parser(clap::value_parser!(usize))
                .conflicts_with("endpoint")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .conflicts_with("raw")
                .global(true),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Raw output mode (card names only)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(build_search())
        .subcommand(build_sort())
        .subcommand(build_more())
        .subcommand(build_status())
        .subcommand(build_cards())
}

/// Build a command tree for REPL mode (no global flags).
pub fn build_repl_cmd() -> Command {
    Command::new("repl")
        .multicall(true)
        .subcommand_required(true)
        .subcommand(build_search())
        .subcommand(build_sort())
        .subcommand(build_more())
        .subcommand(build_status())
        .subcommand(build_cards())
}

fn build_search() -> Command {
    Command::new("search")
        .about("Run a search and show the first batch")
        .arg(
            Arg::new("text")
                .help("Free text; may be empty when filters are given")
                .num_args(0..),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .short('f')
                .help("Filter as key=value, key=a,b (any of) or key=min..max")
                .action(ArgAction::Append),
        )
}

fn build_sort() -> Command {
    Command::new("sort")
        .about("Change the sort order (name, released, set, rarity, cmc, usd, color)")
        .arg(Arg::new("criteria").required(true))
        .arg(
            Arg::new("direction")
                .help("asc or desc")
                .default_value("asc"),
        )
        .arg(
            Arg::new("area")
                .long("area")
                .help("Sort area (default: the cache's own area)"),
        )
}

fn build_more() -> Command {
    Command::new("more")
        .about("Load the next display batch")
        .arg(
            Arg::new("times")
                .long("times")
                .short('n')
                .help("Number of batches to load")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
}

fn build_status() -> Command {
    Command::new("status").about("Show pagination state")
}

fn build_cards() -> Command {
    Command::new("cards")
        .about("List loaded cards")
        .arg(
            Arg::new("offset")
                .long("offset")
                .value_parser(clap::value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(clap::value_parser!(usize))
                .default_value("20"),
        )
}
