//! Card records returned by the remote search API

use serde::{Deserialize, Serialize};

/// One card as the search API describes it
///
/// Only `id` and `name` are guaranteed by the API. Every other field is
/// optional on the wire and defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Stable identifier assigned by the API
    pub id: String,

    /// Display name
    pub name: String,

    /// Set code (e.g. "dmu")
    #[serde(default, rename = "set")]
    pub set_code: String,

    /// Collector number inside the set; may carry letter suffixes ("12a")
    #[serde(default)]
    pub collector_number: String,

    /// Rarity name ("common", "uncommon", "rare", "mythic", ...)
    #[serde(default)]
    pub rarity: Option<String>,

    /// Converted mana value
    #[serde(default, rename = "cmc")]
    pub mana_value: Option<f64>,

    /// USD price
    #[serde(default, rename = "usd")]
    pub price_usd: Option<f64>,

    /// Release date as ISO-8601 (`YYYY-MM-DD`)
    #[serde(default)]
    pub released_at: Option<String>,

    /// Color letters (W, U, B, R, G)
    #[serde(default)]
    pub colors: Vec<String>,

    /// Full type line
    #[serde(default)]
    pub type_line: String,
}

impl Card {
    /// Minimal card with only id and name set
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Card {
            id: id.into(),
            name: name.into(),
            set_code: String::new(),
            collector_number: String::new(),
            rarity: None,
            mana_value: None,
            price_usd: None,
            released_at: None,
            colors: Vec::new(),
            type_line: String::new(),
        }
    }

    /// Builder: set code and collector number
    pub fn with_set(mut self, set_code: impl Into<String>, number: impl Into<String>) -> Self {
        self.set_code = set_code.into();
        self.collector_number = number.into();
        self
    }

    /// Builder: rarity
    pub fn with_rarity(mut self, rarity: impl Into<String>) -> Self {
        self.rarity = Some(rarity.into());
        self
    }

    /// Builder: mana value
    pub fn with_mana_value(mut self, mana_value: f64) -> Self {
        self.mana_value = Some(mana_value);
        self
    }

    /// Builder: USD price
    pub fn with_price(mut self, usd: f64) -> Self {
        self.price_usd = Some(usd);
        self
    }

    /// Builder: release date
    pub fn with_released(mut self, date: impl Into<String>) -> Self {
        self.released_at = Some(date.into());
        self
    }

    /// Builder: colors
    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: type line
    pub fn with_type_line(mut self, type_line: impl Into<String>) -> Self {
        self.type_line = type_line.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_decodes_with_only_required_fields() {
        let card: Card = serde_json::from_str(r#"{"id":"a1","name":"Opt"}"#).unwrap();
        assert_eq!(card.id, "a1");
        assert_eq!(card.name, "Opt");
        assert!(card.rarity.is_none());
        assert!(card.colors.is_empty());
    }

    #[test]
    fn test_card_uses_api_field_names() {
        let json = r#"{"id":"b2","name":"Shock","set":"m19","collector_number":"156",
            "rarity":"common","cmc":1.0,"usd":0.25,"colors":["R"]}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.set_code, "m19");
        assert_eq!(card.mana_value, Some(1.0));
        assert_eq!(card.price_usd, Some(0.25));
        assert_eq!(card.colors, vec!["R".to_string()]);
    }
}
