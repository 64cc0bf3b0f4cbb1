//! Control values: the live value for each input key at resolution time.
//!
//! Keys are plain field ids (`inputB1`) or card-scoped (`card2.inputB1`).
//! The resolver only ever sees a flat map of plain keys; [`ControlValues::layered`]
//! builds that map for one card from admin-input defaults and operator
//! overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cardflow_types::agent::Card;

use super::defaults::card_defaults;

/// `key -> value`. A `Null` value counts as undefined and is never substituted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlValues(BTreeMap<String, Value>);

impl ControlValues {
    /// An empty set of controls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value for `key`, including `Null`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String form of a defined value; `None` when missing or `Null`.
    pub fn rendered(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(render_value)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys, defined or not.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no key is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse an operator assignment of the form `key=value`.
    ///
    /// The value is taken verbatim as a string; an empty value is valid.
    pub fn parse_assignment(assignment: &str) -> Option<(String, String)> {
        let (key, value) = assignment.split_once('=')?;
        let key = key.trim();
        (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
    }

    /// Every admin-input default, keyed both plainly and card-scoped.
    ///
    /// When several cards declare the same field id, the plain key holds the
    /// first card's default.
    pub fn from_cards(cards: &[Card]) -> Self {
        let mut values = Self::new();
        for card in cards {
            for (field_id, default) in card_defaults(card) {
                values.set(
                    format!("{}.{}", card.id, field_id),
                    default.default_value.clone(),
                );
                values
                    .0
                    .entry(field_id.to_string())
                    .or_insert(Value::String(default.default_value));
            }
        }
        values
    }

    /// The flat map the resolver sees for `card_id` (or for global blocks
    /// when `None`).
    ///
    /// Layers, lowest precedence first:
    /// 1. plain defaults of all cards (first declaration wins)
    /// 2. the card's own defaults
    /// 3. plain keys from `overrides`
    /// 4. `overrides` keys scoped to this card, prefix removed
    pub fn layered(cards: &[Card], card_id: Option<&str>, overrides: &ControlValues) -> Self {
        let defaults = Self::from_cards(cards);
        let mut flat: BTreeMap<String, Value> = defaults
            .0
            .iter()
            .filter(|(k, _)| !k.contains('.'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(card_id) = card_id {
            flat.extend(scoped_entries(&defaults, card_id));
        }

        flat.extend(
            overrides
                .0
                .iter()
                .filter(|(k, _)| !k.contains('.'))
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        if let Some(card_id) = card_id {
            flat.extend(scoped_entries(overrides, card_id));
        }

        Self(flat)
    }
}

fn scoped_entries<'a>(
    values: &'a ControlValues,
    card_id: &'a str,
) -> impl Iterator<Item = (String, Value)> + 'a {
    values.0.iter().filter_map(move |(k, v)| {
        k.strip_prefix(card_id)
            .and_then(|rest| rest.strip_prefix('.'))
            .map(|field| (field.to_string(), v.clone()))
    })
}

/// String form of a control value: strings raw, other scalars as JSON text.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ControlValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (k, v) in iter {
            values.set(k, v);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardflow_types::agent::FieldMap;
    use serde_json::json;

    fn card(id: &str, inputs: &[(&str, &str)]) -> Card {
        Card {
            id: id.to_string(),
            title: String::new(),
            admin_inputs: inputs.iter().copied().collect(),
            prompt_blocks: FieldMap::new(),
        }
    }

    #[test]
    fn test_rendered_skips_null_and_keeps_empty() {
        let values: ControlValues = [
            ("a", json!("")),
            ("b", json!(null)),
            ("c", json!(3)),
            ("d", json!(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(values.rendered("a"), Some(String::new()));
        assert_eq!(values.rendered("b"), None);
        assert_eq!(values.rendered("c"), Some("3".to_string()));
        assert_eq!(values.rendered("d"), Some("true".to_string()));
        assert_eq!(values.rendered("missing"), None);
    }

    #[test]
    fn test_parse_assignment_splits_on_first_equals() {
        assert_eq!(
            ControlValues::parse_assignment("inputB1=a=b"),
            Some(("inputB1".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            ControlValues::parse_assignment("inputB1="),
            Some(("inputB1".to_string(), String::new()))
        );
        assert_eq!(ControlValues::parse_assignment("novalue"), None);
        assert_eq!(ControlValues::parse_assignment("=x"), None);
    }

    #[test]
    fn test_from_cards_first_declaration_wins_plain_key() {
        let cards = vec![
            card("card1", &[("inputB1", "Name <def>Alice</def>")]),
            card("card2", &[("inputB1", "Name <def>Bob</def>")]),
        ];
        let values = ControlValues::from_cards(&cards);
        assert_eq!(values.rendered("inputB1"), Some("Alice".to_string()));
        assert_eq!(values.rendered("card1.inputB1"), Some("Alice".to_string()));
        assert_eq!(values.rendered("card2.inputB1"), Some("Bob".to_string()));
    }

    #[test]
    fn test_layered_prefers_own_card_defaults() {
        let cards = vec![
            card("card1", &[("inputB1", "Name <def>Alice</def>")]),
            card("card2", &[("inputB1", "Name <def>Bob</def>")]),
        ];
        let none = ControlValues::new();
        let card2 = ControlValues::layered(&cards, Some("card2"), &none);
        assert_eq!(card2.rendered("inputB1"), Some("Bob".to_string()));
        assert!(card2.get("card2.inputB1").is_none());

        let global = ControlValues::layered(&cards, None, &none);
        assert_eq!(global.rendered("inputB1"), Some("Alice".to_string()));
    }

    #[test]
    fn test_layered_applies_overrides_plain_then_scoped() {
        let cards = vec![
            card("card1", &[("inputB1", "Name <def>Alice</def>")]),
            card("card2", &[("inputB1", "Name <def>Bob</def>")]),
        ];
        let overrides: ControlValues = [("inputB1", "Carol"), ("card2.inputB1", "Dave")]
            .into_iter()
            .collect();

        let card1 = ControlValues::layered(&cards, Some("card1"), &overrides);
        assert_eq!(card1.rendered("inputB1"), Some("Carol".to_string()));

        let card2 = ControlValues::layered(&cards, Some("card2"), &overrides);
        assert_eq!(card2.rendered("inputB1"), Some("Dave".to_string()));
    }

    #[test]
    fn test_layered_does_not_match_card_id_prefixes() {
        let cards = vec![card("card1", &[]), card("card10", &[("x", "<def>ten</def>")])];
        let flat = ControlValues::layered(&cards, Some("card1"), &ControlValues::new());
        assert_eq!(flat.rendered("x"), Some("ten".to_string()));
        let overrides: ControlValues = [("card10.x", "override")].into_iter().collect();
        let flat = ControlValues::layered(&cards, Some("card1"), &overrides);
        assert_eq!(flat.rendered("x"), Some("ten".to_string()));
        assert!(flat.get("0.x").is_none());
    }
}
