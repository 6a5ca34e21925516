//! Cache outcomes → human/json/raw string formatting.
//!
//! Three modes:
//! - **Human** (default): one line per outcome, e.g. `(search) 75 of 400 loaded`
//! - **JSON** (`--json`): `serde_json::to_string_pretty`
//! - **Raw** (`--raw`): card names only, one per line

use cardscroll_core::{Card, Error};
use cardscroll_engine::{CacheSnapshot, LoadMore, SearchOutcome, SortOutcome};
use serde_json::json;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Raw,
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&json!({
            "error": format!("{}", err)
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Raw => format!("{}", err),
        OutputMode::Human => format!("(error) {}", err),
    }
}

/// Format the outcome of a search, followed by the first batch.
pub fn format_search(outcome: &SearchOutcome, snapshot: &CacheSnapshot, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "result": outcome,
            "cards": snapshot.cards.as_slice(),
        })),
        OutputMode::Raw => names(&snapshot.cards),
        OutputMode::Human => {
            let header = match outcome {
                SearchOutcome::Committed { loaded, total } => {
                    format!("(search) {} of {} loaded", loaded, total)
                }
                SearchOutcome::Cached { loaded, total } => {
                    format!("(cached) {} of {} loaded", loaded, total)
                }
                SearchOutcome::Discarded { token } => {
                    return format!("(discarded) request {} was superseded", token);
                }
            };
            with_cards(header, &snapshot.cards, 0)
        }
    }
}

/// Format the outcome of one or more "load more" calls.
///
/// `new_cards` are the cards appended by these calls, starting at `offset`.
pub fn format_more(outcome: &LoadMore, new_cards: &[Card], offset: usize, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "result": outcome,
            "cards": new_cards,
        })),
        OutputMode::Raw => names(new_cards),
        OutputMode::Human => match outcome {
            LoadMore::Loaded {
                loaded, has_more, ..
            } => {
                let more = if *has_more { "more available" } else { "end of results" };
                with_cards(
                    format!("(more) +{} -> {} loaded, {}", new_cards.len(), loaded, more),
                    new_cards,
                    offset,
                )
            }
            LoadMore::Busy => "(busy) a page fetch is already in flight".to_string(),
            LoadMore::Discarded => "(discarded) a newer search replaced the results".to_string(),
        },
    }
}

/// Format the outcome of a sort change.
pub fn format_sort(outcome: &SortOutcome, snapshot: &CacheSnapshot, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "result": outcome,
            "sort": snapshot.pagination.last_query.sort,
            "cards": snapshot.cards.as_slice(),
        })),
        OutputMode::Raw => names(&snapshot.cards),
        OutputMode::Human => match outcome {
            SortOutcome::NoChange => "(sort) unchanged or stored for the next search".to_string(),
            SortOutcome::Reordered { loaded } => with_cards(
                format!(
                    "(sort) {} reordered locally by {}",
                    loaded, snapshot.pagination.last_query.sort
                ),
                &snapshot.cards,
                0,
            ),
            SortOutcome::Requeried { search } => format!(
                "(sort) re-queried by {}: {}",
                snapshot.pagination.last_query.sort,
                format_search(search, snapshot, mode)
            ),
        },
    }
}

/// Format pagination state.
pub fn format_status(snapshot: &CacheSnapshot, mode: OutputMode) -> String {
    let state = &snapshot.pagination;
    match mode {
        OutputMode::Json => pretty(&json!({
            "pagination": state,
            "error": snapshot.error.as_ref().map(|e| e.to_string()),
        })),
        OutputMode::Raw => format!("{}\t{}\t{}", state.loaded_cards, state.total_cards, state.has_more),
        OutputMode::Human => {
            let mut lines = vec![
                format!("query:       {}", display_query(snapshot)),
                format!("sort:        {}", state.last_query.sort),
                format!("loaded:      {} of {}", state.loaded_cards, state.total_cards),
                format!("has more:    {}", state.has_more),
                format!(
                    "remote page: {} ({} of {} consumed)",
                    state.current_remote_page,
                    state.consumed_from_current_page,
                    state.remote_page_size
                ),
                format!("batch size:  {}", state.display_batch_size),
            ];
            if let Some(err) = &snapshot.error {
                lines.push(format!("error:       {}", err));
            }
            lines.join("\n")
        }
    }
}

/// Format a slice of loaded cards.
pub fn format_cards(cards: &[Card], offset: usize, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!(cards)),
        OutputMode::Raw => names(cards),
        OutputMode::Human => {
            if cards.is_empty() {
                "(empty list)".to_string()
            } else {
                card_lines(cards, offset)
            }
        }
    }
}

fn display_query(snapshot: &CacheSnapshot) -> String {
    let query = &snapshot.pagination.last_query;
    if snapshot.pagination.generation == 0 {
        return "(none)".to_string();
    }
    query
        .remote_query_text()
        .unwrap_or_else(|_| query.text.clone())
}

fn with_cards(header: String, cards: &[Card], offset: usize) -> String {
    if cards.is_empty() {
        header
    } else {
        format!("{}\n{}", header, card_lines(cards, offset))
    }
}

fn card_lines(cards: &[Card], offset: usize) -> String {
    cards
        .iter()
        .enumerate()
        .map(|(i, card)| format!("{}) {}", offset + i + 1, format_card(card)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_card(card: &Card) -> String {
    let mut line = card.name.clone();
    if !card.set_code.is_empty() {
        line.push_str(&format!(" [{} #{}]", card.set_code.to_uppercase(), card.collector_number));
    }
    if let Some(rarity) = &card.rarity {
        line.push_str(&format!(" {}", rarity));
    }
    if let Some(usd) = card.price_usd {
        line.push_str(&format!(" ${:.2}", usd));
    }
    line
}

fn names(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}
