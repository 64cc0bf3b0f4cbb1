//! Default-value extraction for admin inputs.
//!
//! Admin input values follow a lexical convention:
//! `"<description> <def>default</def>"`. Anything is accepted; a value
//! without a `<def>...</def>` pair simply has an empty default.

use std::sync::LazyLock;

use regex::Regex;

use cardflow_types::agent::Card;

const DEF_OPEN: &str = "<def>";

static DEF_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<def>(.*?)</def>").expect("invalid <def> regex"));

/// An admin input split into its label and default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultValue {
    pub label: String,
    pub default_value: String,
}

/// Split a raw admin-input value into label and default.
///
/// The label is the text before the first `<def>`, trimmed. The default is
/// the inner text of the first `<def>...</def>` pair, or `""`.
pub fn extract_default(raw: &str) -> DefaultValue {
    let label = raw.split(DEF_OPEN).next().unwrap_or_default().trim();
    let default_value = DEF_TAG
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();

    DefaultValue {
        label: label.to_string(),
        default_value: default_value.to_string(),
    }
}

/// Defaults for every admin input of a card, in declaration order.
pub fn card_defaults(card: &Card) -> impl Iterator<Item = (&str, DefaultValue)> {
    card.admin_inputs
        .iter()
        .map(|(field_id, raw)| (field_id, extract_default(raw)))
}
