//! ArgMatches → CliAction conversion.
//!
//! Translates clap's parsed arguments into the appropriate action:
//! - Cache operations → `CliAction::Search/Sort/More/Status/Cards`
//! - REPL meta-commands (`help`, `quit`, `clear`) → `MetaCommand`, checked first

use clap::ArgMatches;
use cardscroll_core::{FilterValue, Filters, SortCriteria, SortDirection};

/// The result of parsing user input.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Run a search.
    Search { text: String, filters: Filters },
    /// Change the sort order.
    Sort {
        area: Option<String>,
        criteria: SortCriteria,
        direction: SortDirection,
    },
    /// Load `times` more batches.
    More { times: usize },
    /// Show pagination state.
    Status,
    /// List loaded cards.
    Cards { offset: usize, limit: usize },
}

/// REPL meta-commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help { command: Option<String> },
    Quit,
    Clear,
}

/// Check for REPL meta-commands before delegating to clap.
///
/// Returns `Some(MetaCommand)` if the line is a meta-command, `None` otherwise.
pub fn check_meta_command(line: &str) -> Option<MetaCommand> {
    let trimmed = line.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next()?;

    match cmd {
        "quit" | "exit" => Some(MetaCommand::Quit),
        "clear" => Some(MetaCommand::Clear),
        "help" => {
            let command = parts
                .next()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Some(MetaCommand::Help { command })
        }
        _ => None,
    }
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "search" => parse_search(sub_matches),
        "sort" => parse_sort(sub_matches),
        "more" => Ok(CliAction::More {
            times: sub_matches.get_one::<usize>("times").copied().unwrap_or(1),
        }),
        "status" => Ok(CliAction::Status),
        "cards" => Ok(CliAction::Cards {
            offset: sub_matches.get_one::<usize>("offset").copied().unwrap_or(0),
            limit: sub_matches.get_one::<usize>("limit").copied().unwrap_or(20),
        }),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_search(matches: &ArgMatches) -> Result<CliAction, String> {
    let text = matches
        .get_many::<String>("text")
        .map(|words| words.map(String::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let mut filters = Filters::new();
    if let Some(specs) = matches.get_many::<String>("filter") {
        for spec in specs {
            let (key, value) = parse_filter(spec)?;
            filters.insert(key, value);
        }
    }

    Ok(CliAction::Search { text, filters })
}

fn parse_sort(matches: &ArgMatches) -> Result<CliAction, String> {
    let criteria = matches
        .get_one::<String>("criteria")
        .ok_or_else(|| "Missing sort criteria".to_string())?
        .parse::<SortCriteria>()
        .map_err(|e| e.to_string())?;
    let direction = matches
        .get_one::<String>("direction")
        .map(|s| s.parse::<SortDirection>())
        .transpose()
        .map_err(|e| e.to_string())?
        .unwrap_or_default();
    let area = matches.get_one::<String>("area").cloned();

    Ok(CliAction::Sort {
        area,
        criteria,
        direction,
    })
}

/// Parse one `--filter` spec.
///
/// - `key=min..max` (either bound optional) → range
/// - `key=a,b` → any of
/// - `key=value` → text
pub fn parse_filter(spec: &str) -> Result<(String, FilterValue), String> {
    let (key, value) = spec
        .split_once('=')
        .ok_or_else(|| format!("Invalid filter '{}': expected key=value", spec))?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return Err(format!("Invalid filter '{}': expected key=value", spec));
    }

    if let Some((min, max)) = value.split_once("..") {
        let bound = |s: &str| -> Result<Option<f64>, String> {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| format!("Invalid range bound '{}' in filter '{}'", s, spec))
        };
        return Ok((
            key.to_string(),
            FilterValue::Range {
                min: bound(min)?,
                max: bound(max)?,
            },
        ));
    }

    if value.contains(',') {
        let members = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        return Ok((key.to_string(), FilterValue::AnyOf(members)));
    }

    Ok((key.to_string(), FilterValue::Text(value.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_repl_cmd;

    fn action(line: &str) -> Result<CliAction, String> {
        let tokens = shlex::split(line).unwrap();
        let matches = build_repl_cmd()
            .try_get_matches_from(tokens)
            .map_err(|e| e.to_string())?;
        matches_to_action(&matches)
    }

    #[test]
    fn parse_search_with_quoted_text() {
        let parsed = action("search \"serra angel\" -f t=creature").unwrap();
        assert_eq!(
            parsed,
            CliAction::Search {
                text: "serra angel".to_string(),
                filters: Filters::new().with_text("t", "creature"),
            }
        );
    }

    #[test]
    fn parse_search_filters_only() {
        match action("search -f c=G,U -f cmc=2..").unwrap() {
            CliAction::Search { text, filters } => {
                assert!(text.is_empty());
                assert_eq!(filters, Filters::new().with_any_of("c", ["G", "U"]).with_range("cmc", Some(2.0), None));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn parse_sort_with_direction() {
        assert_eq!(
            action("sort usd desc").unwrap(),
            CliAction::Sort {
                area: None,
                criteria: SortCriteria::Price,
                direction: SortDirection::Desc,
            }
        );
    }

    #[test]
    fn parse_sort_rejects_unknown_criteria() {
        assert!(action("sort flavor").is_err());
        assert!(action("sort name sideways").is_err());
    }

    #[test]
    fn parse_more_and_cards() {
        assert_eq!(action("more -n 3").unwrap(), CliAction::More { times: 3 });
        assert_eq!(
            action("cards --offset 75 --limit 5").unwrap(),
            CliAction::Cards { offset: 75, limit: 5 }
        );
    }

    #[test]
    fn parse_filter_errors() {
        assert!(parse_filter("novalue").is_err());
        assert!(parse_filter("=x").is_err());
        assert!(parse_filter("cmc=a..b").is_err());
    }

    #[test]
    fn meta_commands() {
        assert_eq!(check_meta_command("quit"), Some(MetaCommand::Quit));
        assert_eq!(check_meta_command("  exit "), Some(MetaCommand::Quit));
        assert_eq!(
            check_meta_command("help sort"),
            Some(MetaCommand::Help {
                command: Some("sort".to_string())
            })
        );
        assert_eq!(check_meta_command("search elf"), None);
    }
}
