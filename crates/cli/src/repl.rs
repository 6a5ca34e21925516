//! REPL loop with rustyline.
//!
//! Interactive mode: prompt, meta-commands, history, TAB completion.
//! Pipe mode: read lines from stdin, execute each.

use std::io::{self, BufRead};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use crate::commands::build_repl_cmd;
use crate::format::{
    format_cards, format_error, format_more, format_search, format_sort, format_status,
    OutputMode,
};
use crate::parse::{check_meta_command, matches_to_action, CliAction, MetaCommand};
use crate::state::SessionState;
use cardscroll_engine::LoadMore;

/// Run the interactive REPL.
pub fn run_repl(state: &SessionState, mode: OutputMode) -> i32 {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<CardscrollHelper, _> = match Editor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("(error) cannot start line editor: {}", e);
            return 1;
        }
    };
    rl.set_helper(Some(CardscrollHelper::new()));

    // Load history
    let history_path = history_file();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = state.prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(trimmed);

                if let Some(meta) = check_meta_command(trimmed) {
                    match meta {
                        MetaCommand::Quit => break,
                        MetaCommand::Clear => {
                            // ANSI clear screen
                            print!("\x1B[2J\x1B[1;1H");
                        }
                        MetaCommand::Help { command } => {
                            print_help(command.as_deref());
                        }
                    }
                    continue;
                }

                // Tokenize with shlex (respects quotes)
                let tokens = match shlex::split(trimmed) {
                    Some(t) => t,
                    None => {
                        eprintln!("(error) Invalid quoting");
                        continue;
                    }
                };

                if tokens.is_empty() {
                    continue;
                }

                let matches = match build_repl_cmd().try_get_matches_from(tokens) {
                    Ok(m) => m,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };

                execute_action(&matches, state, mode);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                break;
            }
            Err(err) => {
                eprintln!("(error) {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }
    0
}

/// Run in pipe mode: read lines from stdin, execute each.
pub fn run_pipe(state: &SessionState, mode: OutputMode) -> i32 {
    let stdin = io::stdin();
    let mut exit_code = 0;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match check_meta_command(trimmed) {
            Some(MetaCommand::Quit) => break,
            Some(MetaCommand::Help { command }) => {
                print_help(command.as_deref());
                continue;
            }
            Some(MetaCommand::Clear) => continue,
            None => {}
        }

        let tokens = match shlex::split(trimmed) {
            Some(t) => t,
            None => {
                eprintln!("(error) Invalid quoting: {}", trimmed);
                exit_code = 1;
                continue;
            }
        };

        if tokens.is_empty() {
            continue;
        }

        let matches = match build_repl_cmd().try_get_matches_from(tokens) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("{}", e);
                exit_code = 1;
                continue;
            }
        };

        if !execute_action(&matches, state, mode) {
            exit_code = 1;
        }
    }

    exit_code
}

/// Execute a parsed action. Returns true on success, false on error.
pub fn execute_action(matches: &clap::ArgMatches, state: &SessionState, mode: OutputMode) -> bool {
    let action = match matches_to_action(matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("(error) {}", e);
            return false;
        }
    };

    match action {
        CliAction::Search { text, filters } => match state.search(&text, filters) {
            Ok(outcome) => {
                println!("{}", format_search(&outcome, &state.snapshot(), mode));
                true
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                false
            }
        },
        CliAction::Sort {
            area,
            criteria,
            direction,
        } => match state.sort(area.as_deref(), criteria, direction) {
            Ok(outcome) => {
                println!("{}", format_sort(&outcome, &state.snapshot(), mode));
                true
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                false
            }
        },
        CliAction::More { times } => run_more(state, times, mode),
        CliAction::Status => {
            println!("{}", format_status(&state.snapshot(), mode));
            true
        }
        CliAction::Cards { offset, limit } => {
            println!("{}", format_cards(&state.cards(offset, limit), offset, mode));
            true
        }
    }
}

/// Load up to `times` batches, stopping early at the end of the results.
fn run_more(state: &SessionState, times: usize, mode: OutputMode) -> bool {
    let offset = state.snapshot().pagination.loaded_cards;
    let mut last = None;
    for _ in 0..times.max(1) {
        match state.load_more() {
            Ok(outcome) => {
                last = Some(outcome);
                match outcome {
                    LoadMore::Loaded { has_more: true, .. } => {}
                    _ => break,
                }
            }
            Err(e) => {
                // Batches already loaded in this call are still shown.
                if let Some(outcome) = last {
                    let new_cards = state.cards(offset, usize::MAX);
                    println!("{}", format_more(&outcome, &new_cards, offset, mode));
                }
                eprintln!("{}", format_error(&e, mode));
                return false;
            }
        }
    }

    if let Some(outcome) = last {
        let new_cards = match outcome {
            LoadMore::Loaded { .. } => state.cards(offset, usize::MAX),
            _ => Vec::new(),
        };
        println!("{}", format_more(&outcome, &new_cards, offset, mode));
    }
    true
}

fn history_file() -> Option<String> {
    std::env::var("HOME")
        .ok()
        .map(|h| format!("{}/.cardscroll_history", h))
}

fn print_help(command: Option<&str>) {
    if let Some(cmd) = command {
        let cli = build_repl_cmd();
        match cli.try_get_matches_from(vec![cmd, "--help"]) {
            Ok(_) => {}
            Err(e) => println!("{}", e),
        }
    } else {
        println!("Available commands:");
        println!("  search      Run a search (text and -f key=value filters)");
        println!("  sort        Change the sort order (name, released, set, rarity, cmc, usd, color)");
        println!("  more        Load the next display batch (-n for several)");
        println!("  status      Show pagination state");
        println!("  cards       List loaded cards (--offset, --limit)");
        println!();
        println!("Meta-commands:");
        println!("  help [command]         Show help");
        println!("  quit / exit            Exit REPL");
        println!("  clear                  Clear screen");
    }
}

// =========================================================================
// TAB Completion
// =========================================================================

/// Known top-level commands for TAB completion.
const TOP_LEVEL_COMMANDS: &[&str] = &[
    "search", "sort", "more", "status", "cards", "help", "quit", "exit", "clear",
];

const SORT_CRITERIA: &[&str] = &["name", "released", "set", "rarity", "cmc", "usd", "color"];

const SORT_DIRECTIONS: &[&str] = &["asc", "desc"];

/// Candidates for the word at `index` (0 is the command itself).
fn candidates_for(parts: &[&str], index: usize) -> &'static [&'static str] {
    match (parts.first().copied(), index) {
        (_, 0) => TOP_LEVEL_COMMANDS,
        (Some("sort"), 1) => SORT_CRITERIA,
        (Some("sort"), 2) => SORT_DIRECTIONS,
        (Some("help"), 1) => &TOP_LEVEL_COMMANDS[..5],
        _ => &[],
    }
}

struct CardscrollHelper;

impl CardscrollHelper {
    fn new() -> Self {
        Self
    }

    fn candidates(&self, line_to_pos: &str, pos: usize) -> (usize, Vec<Pair>) {
        let parts: Vec<&str> = line_to_pos.split_whitespace().collect();
        let trailing_space = line_to_pos.is_empty() || line_to_pos.ends_with(char::is_whitespace);

        let (index, prefix) = if trailing_space {
            (parts.len(), "")
        } else {
            (parts.len() - 1, parts[parts.len() - 1])
        };

        let candidates = candidates_for(&parts, index)
            .iter()
            .filter(|c| c.starts_with(prefix))
            .map(|c| Pair {
                display: c.to_string(),
                replacement: c.to_string(),
            })
            .collect();
        (pos - prefix.len(), candidates)
    }
}

impl Helper for CardscrollHelper {}
impl Validator for CardscrollHelper {}
impl Highlighter for CardscrollHelper {}
impl Hinter for CardscrollHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for CardscrollHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(&line[..pos], pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacements(line: &str) -> (usize, Vec<String>) {
        let (start, pairs) = CardscrollHelper::new().candidates(line, line.len());
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    #[test]
    fn completes_top_level_prefix() {
        assert_eq!(replacements("so"), (0, vec!["sort".to_string()]));
        let (_, all) = replacements("");
        assert_eq!(all.len(), TOP_LEVEL_COMMANDS.len());
    }

    #[test]
    fn completes_sort_criteria_and_direction() {
        assert_eq!(replacements("sort r"), (5, vec!["released".to_string(), "rarity".to_string()]));
        assert_eq!(
            replacements("sort usd "),
            (9, vec!["asc".to_string(), "desc".to_string()])
        );
    }

    #[test]
    fn no_completion_for_free_text() {
        assert!(replacements("search serra ").1.is_empty());
    }
}
