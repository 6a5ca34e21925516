//! Sort specification shared by server-side and client-side ordering
//!
//! A [`SortSpec`] travels to the remote API as an `order`/`direction` pair and
//! is also used to reorder already-loaded cards in memory. Both paths must agree
//! on the ordering, so the comparator lives next to the wire names.

use crate::types::Card;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field a result list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriteria {
    /// Card name (default)
    #[default]
    Name,
    /// Release date
    Released,
    /// Set code, then collector number
    Set,
    /// Rarity rank
    Rarity,
    /// Converted mana value
    ManaValue,
    /// USD price
    Price,
    /// Color identity
    Color,
}

impl SortCriteria {
    /// All criteria, in menu order
    pub const ALL: [SortCriteria; 7] = [
        SortCriteria::Name,
        SortCriteria::Released,
        SortCriteria::Set,
        SortCriteria::Rarity,
        SortCriteria::ManaValue,
        SortCriteria::Price,
        SortCriteria::Color,
    ];

    /// Value of the remote API's `order` parameter
    pub fn as_order(&self) -> &'static str {
        match self {
            SortCriteria::Name => "name",
            SortCriteria::Released => "released",
            SortCriteria::Set => "set",
            SortCriteria::Rarity => "rarity",
            SortCriteria::ManaValue => "cmc",
            SortCriteria::Price => "usd",
            SortCriteria::Color => "color",
        }
    }
}

impl fmt::Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_order())
    }
}

impl FromStr for SortCriteria {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortCriteria::Name),
            "released" | "date" => Ok(SortCriteria::Released),
            "set" => Ok(SortCriteria::Set),
            "rarity" => Ok(SortCriteria::Rarity),
            "cmc" | "mana_value" | "mv" => Ok(SortCriteria::ManaValue),
            "usd" | "price" => Ok(SortCriteria::Price),
            "color" | "colour" => Ok(SortCriteria::Color),
            other => Err(format!("unknown sort criteria '{}'", other)),
        }
    }
}

/// Ordering direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first (default)
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    /// Value of the remote API's `direction` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

/// Sort criteria plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to order by
    pub criteria: SortCriteria,
    /// Ordering direction
    pub direction: SortDirection,
}

impl SortSpec {
    /// Create a sort spec
    pub fn new(criteria: SortCriteria, direction: SortDirection) -> Self {
        SortSpec {
            criteria,
            direction,
        }
    }

    /// Total order over cards for this spec
    ///
    /// The primary key follows `direction`; cards missing the primary key sort
    /// last in either direction. Ties break on name, then id, always ascending,
    /// so the order is deterministic.
    pub fn compare(&self, a: &Card, b: &Card) -> Ordering {
        let primary = match self.criteria {
            SortCriteria::Name => Some(compare_names(a, b)),
            SortCriteria::Released => {
                compare_present(a.released_at.as_deref(), b.released_at.as_deref(), |x, y| {
                    x.cmp(y)
                })
            }
            SortCriteria::Set => Some(
                a.set_code
                    .cmp(&b.set_code)
                    .then_with(|| compare_collector_numbers(&a.collector_number, &b.collector_number)),
            ),
            SortCriteria::Rarity => {
                compare_present(rarity_rank(a), rarity_rank(b), |x, y| x.cmp(&y))
            }
            SortCriteria::ManaValue => {
                compare_present(a.mana_value, b.mana_value, |x, y| x.total_cmp(&y))
            }
            SortCriteria::Price => compare_present(a.price_usd, b.price_usd, |x, y| x.total_cmp(&y)),
            SortCriteria::Color => Some(color_key(a).cmp(&color_key(b))),
        };

        // None means exactly one side is missing the key: already final.
        let primary = match primary {
            Some(ord) => match self.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            },
            None => missing_last(self.criteria, a, b),
        };

        primary
            .then_with(|| compare_names(a, b))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Sort a slice of cards in place
    pub fn sort_cards(&self, cards: &mut [Card]) {
        cards.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.criteria, self.direction)
    }
}

fn compare_names(a: &Card, b: &Card) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// Compare two optional keys; `None` when exactly one is missing
fn compare_present<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(T, T) -> Ordering) -> Option<Ordering> {
    match (a, b) {
        (Some(x), Some(y)) => Some(cmp(x, y)),
        (None, None) => Some(Ordering::Equal),
        _ => None,
    }
}

fn missing_last(criteria: SortCriteria, a: &Card, b: &Card) -> Ordering {
    let a_missing = match criteria {
        SortCriteria::Released => a.released_at.is_none(),
        SortCriteria::Rarity => rarity_rank(a).is_none(),
        SortCriteria::ManaValue => a.mana_value.is_none(),
        SortCriteria::Price => a.price_usd.is_none(),
        _ => false,
    };
    let b_missing = match criteria {
        SortCriteria::Released => b.released_at.is_none(),
        SortCriteria::Rarity => rarity_rank(b).is_none(),
        SortCriteria::ManaValue => b.mana_value.is_none(),
        SortCriteria::Price => b.price_usd.is_none(),
        _ => false,
    };
    a_missing.cmp(&b_missing)
}

fn rarity_rank(card: &Card) -> Option<u8> {
    match card.rarity.as_deref()?.to_ascii_lowercase().as_str() {
        "common" => Some(0),
        "uncommon" => Some(1),
        "rare" => Some(2),
        "mythic" => Some(3),
        "special" => Some(4),
        "bonus" => Some(5),
        _ => None,
    }
}

/// Collector numbers compare by leading digits, then by the remaining suffix
fn compare_collector_numbers(a: &str, b: &str) -> Ordering {
    let split = |s: &str| {
        let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
        let rest = s[digits.len()..].to_string();
        (digits.parse::<u64>().ok(), rest)
    };
    let (an, ar) = split(a);
    let (bn, br) = split(b);
    match (an, bn) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| ar.cmp(&br)),
        _ => a.cmp(b),
    }
}

/// Colorless first, then by number of colors, then in WUBRG order
fn color_key(card: &Card) -> (usize, Vec<u8>) {
    let mut ranks: Vec<u8> = card
        .colors
        .iter()
        .map(|c| match c.to_ascii_uppercase().as_str() {
            "W" => 0,
            "U" => 1,
            "B" => 2,
            "R" => 3,
            "G" => 4,
            _ => 5,
        })
        .collect();
    ranks.sort_unstable();
    (ranks.len(), ranks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cards: &[Card]) -> Vec<&str> {
        cards.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_criteria_round_trips_through_order_string() {
        for criteria in SortCriteria::ALL {
            assert_eq!(criteria.as_order().parse::<SortCriteria>().unwrap(), criteria);
        }
        assert!("bogus".parse::<SortCriteria>().is_err());
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn test_name_sort_is_case_insensitive() {
        let mut cards = vec![Card::new("1", "bolt"), Card::new("2", "Abrade"), Card::new("3", "Counterspell")];
        SortSpec::default().sort_cards(&mut cards);
        assert_eq!(names(&cards), vec!["Abrade", "bolt", "Counterspell"]);
    }

    #[test]
    fn test_missing_price_sorts_last_in_both_directions() {
        let mut cards = vec![
            Card::new("1", "Free"),
            Card::new("2", "Cheap").with_price(0.1),
            Card::new("3", "Pricey").with_price(40.0),
        ];
        SortSpec::new(SortCriteria::Price, SortDirection::Asc).sort_cards(&mut cards);
        assert_eq!(names(&cards), vec!["Cheap", "Pricey", "Free"]);

        SortSpec::new(SortCriteria::Price, SortDirection::Desc).sort_cards(&mut cards);
        assert_eq!(names(&cards), vec!["Pricey", "Cheap", "Free"]);
    }

    #[test]
    fn test_rarity_uses_rank_not_alphabet() {
        let mut cards = vec![
            Card::new("1", "A").with_rarity("mythic"),
            Card::new("2", "B").with_rarity("common"),
            Card::new("3", "C").with_rarity("rare"),
            Card::new("4", "D").with_rarity("uncommon"),
        ];
        SortSpec::new(SortCriteria::Rarity, SortDirection::Asc).sort_cards(&mut cards);
        assert_eq!(names(&cards), vec!["B", "D", "C", "A"]);
    }

    #[test]
    fn test_set_sort_orders_collector_numbers_numerically() {
        let mut cards = vec![
            Card::new("1", "Ten").with_set("abc", "10"),
            Card::new("2", "Two").with_set("abc", "2"),
            Card::new("3", "TwoA").with_set("abc", "2a"),
        ];
        SortSpec::new(SortCriteria::Set, SortDirection::Asc).sort_cards(&mut cards);
        assert_eq!(names(&cards), vec!["Two", "TwoA", "Ten"]);
    }

    #[test]
    fn test_ties_break_on_name_then_id() {
        let a = Card::new("b", "Same").with_mana_value(2.0);
        let b = Card::new("a", "Same").with_mana_value(2.0);
        let spec = SortSpec::new(SortCriteria::ManaValue, SortDirection::Desc);
        assert_eq!(spec.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_color_sort_puts_colorless_first() {
        let mut cards = vec![
            Card::new("1", "Gold").with_colors(["W", "U"]),
            Card::new("2", "Artifact"),
            Card::new("3", "Green").with_colors(["G"]),
            Card::new("4", "White").with_colors(["W"]),
        ];
        SortSpec::new(SortCriteria::Color, SortDirection::Asc).sort_cards(&mut cards);
        assert_eq!(names(&cards), vec!["Artifact", "White", "Green", "Gold"]);
    }
}
