//! Agent configuration: cards, admin inputs, and prompt blocks.
//!
//! An agent is described by a JSON document of the shape
//! `{ "cards": [...], "globalPromptBlocks": {...} }`. The document is
//! validated here, at the parse boundary; the resolution engine assumes a
//! well-formed [`AgentConfig`].

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// FieldMap
// ---------------------------------------------------------------------------

/// Insertion-ordered `identifier -> text` map.
///
/// Deserializes from a JSON object keeping document key order, so that
/// anything iterating a card's fields sees them in authoring order.
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldMap, A::Error> {
                let mut map = FieldMap::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    // Generated configs occasionally emit numbers or booleans.
                    let text = match value {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    map.insert(key, text);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

// ---------------------------------------------------------------------------
// Card / AgentConfig
// ---------------------------------------------------------------------------

/// A named unit bundling admin input fields and prompt-block templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// `fieldId -> "<description><def>default</def>"`.
    pub admin_inputs: FieldMap,
    /// `blockId -> template text`.
    pub prompt_blocks: FieldMap,
}

impl Card {
    /// Template text of one of this card's prompt blocks.
    pub fn prompt_block(&self, block_id: &str) -> Option<&str> {
        self.prompt_blocks.get(block_id)
    }
}

/// A full agent definition: ordered cards plus run-scoped global blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub cards: Vec<Card>,
    #[serde(default)]
    pub global_prompt_blocks: FieldMap,
}

impl AgentConfig {
    /// Parse and validate an agent configuration document.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        validate_shape(&value)?;

        // Deserialize from the text rather than the `Value` so FieldMap keeps
        // document order.
        let config: AgentConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;

        let mut seen = HashSet::new();
        for card in &config.cards {
            if !seen.insert(card.id.as_str()) {
                return Err(ConfigError::DuplicateCardId(card.id.clone()));
            }
        }

        Ok(config)
    }

    /// Parse a configuration out of free-form model output.
    ///
    /// Accepts a fenced JSON code block or, failing that, the outermost
    /// `{ ... }` span of the text.
    pub fn from_model_output(text: &str) -> Result<Self, ConfigError> {
        let payload = extract_json_payload(text).ok_or(ConfigError::NoJsonPayload)?;
        Self::parse(payload)
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    /// Number of prompt blocks a run over this config would execute.
    pub fn block_count(&self) -> usize {
        self.cards.iter().map(|c| c.prompt_blocks.len()).sum::<usize>()
            + self.global_prompt_blocks.len()
    }
}

fn validate_shape(value: &Value) -> Result<(), ConfigError> {
    let root = value.as_object().ok_or(ConfigError::NotAnObject)?;
    let cards = root
        .get("cards")
        .and_then(Value::as_array)
        .ok_or(ConfigError::MissingCards)?;

    for (index, card) in cards.iter().enumerate() {
        let card = card
            .as_object()
            .ok_or(ConfigError::CardNotAnObject { index })?;
        for field in ["adminInputs", "promptBlocks"] {
            if !card.get(field).is_some_and(Value::is_object) {
                return Err(ConfigError::MissingCardField { index, field });
            }
        }
    }
    Ok(())
}

/// Locate the JSON document inside model output.
fn extract_json_payload(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        // Skip the info string ("json", "JSON", ...) up to the end of line.
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let candidate = body[..end].trim();
            if candidate.starts_with('{') {
                return Some(candidate);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
