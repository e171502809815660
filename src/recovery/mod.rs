//! Response recovery: turn whatever the generative model returned into an
//! ordered question → answer mapping.
//!
//! Models are asked for a JSON dictionary but do not always produce one. The
//! recovery parser treats strict JSON as the happy path and degrades through
//! progressively looser grammars:
//!
//! 1. a structured response is taken as-is (empty keys dropped);
//! 2. Markdown fence markers are stripped from a text response;
//! 3. [`Strategy::StrictJson`]: the cleaned text as a JSON object;
//! 4. [`Strategy::PermissiveLiteral`]: the cleaned text as a Python-style
//!    literal dict (single quotes, trailing commas);
//! 5. [`Strategy::LineHeuristic`]: `key: value` lines split on the first colon;
//! 6. otherwise an empty mapping.
//!
//! Recovery never fails. An unusable response yields an empty mapping, which
//! the caller reports as zero flashcards rather than as an error.

pub mod literal;

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::config::RecoveryConfig;

/// What the generative model handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelResponse {
    /// The collaborator already produced a native mapping.
    Structured(Map<String, Value>),
    /// Free-form text, possibly JSON, possibly fenced, possibly neither.
    Text(String),
}

impl From<String> for RawModelResponse {
    fn from(text: String) -> Self {
        RawModelResponse::Text(text)
    }
}

impl From<&str> for RawModelResponse {
    fn from(text: &str) -> Self {
        RawModelResponse::Text(text.to_string())
    }
}

impl From<Map<String, Value>> for RawModelResponse {
    fn from(map: Map<String, Value>) -> Self {
        RawModelResponse::Structured(map)
    }
}

/// Ordered question → answer mapping with unique keys.
///
/// Insertion order is first-seen order. Re-inserting an existing key replaces
/// its answer in place (last write wins). Keys or values that are empty or
/// whitespace-only are never stored.
#[derive(Debug, Clone, Default)]
pub struct RecoveredMapping {
    entries: Vec<(String, String)>,
    /// Question → position in `entries`.
    positions: HashMap<String, usize>,
}

impl PartialEq for RecoveredMapping {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for RecoveredMapping {}

impl RecoveredMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair. Returns `false` if the pair was discarded as blank.
    pub fn insert(&mut self, question: impl Into<String>, answer: impl Into<String>) -> bool {
        let question = question.into();
        let answer = answer.into();
        if question.trim().is_empty() || answer.trim().is_empty() {
            return false;
        }
        match self.positions.get(&question) {
            Some(&pos) => self.entries[pos].1 = answer,
            None => {
                self.positions.insert(question.clone(), self.entries.len());
                self.entries.push((question, answer));
            }
        }
        true
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.positions
            .get(question)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(q, _)| q.as_str())
    }

    pub fn into_entries(self) -> Vec<(String, String)> {
        self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RecoveredMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = RecoveredMapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl IntoIterator for RecoveredMapping {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for RecoveredMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (q, a) in &self.entries {
            map.serialize_entry(q, a)?;
        }
        map.end()
    }
}

/// One way of reading cleaned model text as a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Standard JSON; must be an object.
    StrictJson,
    /// Python-style literal; must be a dict.
    PermissiveLiteral,
    /// `key: value` per line (or per comma when there is a single line).
    LineHeuristic,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::StrictJson => "strict-json",
            Strategy::PermissiveLiteral => "permissive-literal",
            Strategy::LineHeuristic => "line-heuristic",
        }
    }

    /// Try this strategy. `None` means it did not yield a mapping and the
    /// next strategy should run.
    pub fn attempt(&self, text: &str) -> Option<RecoveredMapping> {
        match self {
            Strategy::StrictJson => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Some(mapping_from_object(&map)),
                _ => None,
            },
            Strategy::PermissiveLiteral => match literal::parse_literal(text) {
                Ok(Value::Object(map)) => Some(mapping_from_object(&map)),
                _ => None,
            },
            Strategy::LineHeuristic => Some(recover_lines(text)),
        }
    }
}

/// The ordered fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecovery {
    strategies: Vec<Strategy>,
}

impl Default for ResponseRecovery {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ResponseRecovery {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Strict JSON, then permissive literal.
    pub fn standard() -> Self {
        Self::new(vec![Strategy::StrictJson, Strategy::PermissiveLiteral])
    }

    /// The full chain, ending with the line heuristic.
    pub fn lenient() -> Self {
        Self::new(vec![
            Strategy::StrictJson,
            Strategy::PermissiveLiteral,
            Strategy::LineHeuristic,
        ])
    }

    pub fn from_config(config: &RecoveryConfig) -> Self {
        if config.line_heuristic {
            Self::lenient()
        } else {
            Self::standard()
        }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Recover a mapping from a raw response. Never fails.
    pub fn recover(&self, raw: &RawModelResponse) -> RecoveredMapping {
        match raw {
            RawModelResponse::Structured(map) => {
                tracing::debug!(keys = map.len(), "structured response passed through");
                mapping_from_object(map)
            }
            RawModelResponse::Text(text) => {
                let cleaned = strip_fences(text);
                for strategy in &self.strategies {
                    if let Some(mapping) = strategy.attempt(&cleaned) {
                        if mapping.is_empty() {
                            tracing::warn!(
                                strategy = strategy.name(),
                                "model response yielded no question/answer pairs"
                            );
                        }
                        tracing::debug!(
                            strategy = strategy.name(),
                            pairs = mapping.len(),
                            "model response recovered"
                        );
                        return mapping;
                    }
                    tracing::debug!(strategy = strategy.name(), "strategy did not apply");
                }
                tracing::warn!(
                    chars = text.chars().count(),
                    "model response unrecoverable, returning empty mapping"
                );
                RecoveredMapping::new()
            }
        }
    }
}

/// Recover with the full fallback chain.
pub fn recover(raw: &RawModelResponse) -> RecoveredMapping {
    ResponseRecovery::lenient().recover(raw)
}

/// Remove Markdown fence markers anywhere in the text, then trim.
///
/// Only the literal ` ```json ` and ` ``` ` delimiters are removed; prose
/// around a fenced block is left in place.
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn mapping_from_object(map: &Map<String, Value>) -> RecoveredMapping {
    let mut mapping = RecoveredMapping::new();
    for (question, value) in map {
        if let Some(answer) = flatten_value(value) {
            mapping.insert(question.clone(), answer);
        }
    }
    mapping
}

/// Collapse a JSON value into an answer string.
///
/// Scalars print as text, `null` is dropped, sequences join their items with
/// `"; "` and nested objects render as `key: value` pairs.
fn flatten_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => return None,
        Value::Array(items) => items
            .iter()
            .filter_map(flatten_value)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| flatten_value(v).map(|v| format!("{k}: {v}")))
            .collect::<Vec<_>>()
            .join("; "),
    };
    if text.trim().is_empty() { None } else { Some(text) }
}

fn recover_lines(text: &str) -> RecoveredMapping {
    let mut body = text.trim();
    if body.len() >= 2 && body.starts_with('{') && body.ends_with('}') {
        body = &body[1..body.len() - 1];
    }

    let candidates: Vec<&str> = if body.contains('\n') {
        body.split('\n').collect()
    } else {
        body.split(',').collect()
    };

    let mut mapping = RecoveredMapping::new();
    for line in candidates {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = trim_quotes(key.trim());
        let value = trim_quotes(value.trim());
        mapping.insert(key, value);
    }
    mapping
}

/// Drop one leading and one trailing quote character, if present.
///
/// The two sides are independent: `'Q"` becomes `Q`, and a value that ends
/// in a comma keeps it, so `"A",` becomes `A",`.
fn trim_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    s.strip_suffix(['"', '\'']).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> RawModelResponse {
        RawModelResponse::Text(s.to_string())
    }

    fn pairs(mapping: &RecoveredMapping) -> Vec<(&str, &str)> {
        mapping.iter().collect()
    }

    #[test]
    fn structured_passthrough_drops_empty_keys() {
        let map = json!({"Q1": "A1", "": "orphan", "Q2": "A2"});
        let raw = RawModelResponse::Structured(map.as_object().unwrap().clone());
        let mapping = recover(&raw);
        assert_eq!(pairs(&mapping), [("Q1", "A1"), ("Q2", "A2")]);
    }

    #[test]
    fn strict_json_preserves_order() {
        let mapping = recover(&text(r#"{"Zeta?": "last letter", "Alpha?": "first letter"}"#));
        assert_eq!(
            pairs(&mapping),
            [("Zeta?", "last letter"), ("Alpha?", "first letter")]
        );
    }

    #[test]
    fn fenced_json_matches_unfenced() {
        let plain = r#"{"What is RAG?": "Retrieval-augmented generation"}"#;
        let fenced_json = format!("```json\n{plain}\n```");
        let fenced_bare = format!("```\n{plain}\n```");
        let expected = recover(&text(plain));
        assert_eq!(recover(&text(&fenced_json)), expected);
        assert_eq!(recover(&text(&fenced_bare)), expected);
        assert_eq!(expected.len(), 1);
    }

    #[test]
    fn permissive_literal_single_quotes_trailing_comma() {
        let mapping = recover(&text("{'Q1': 'A1',}"));
        assert_eq!(pairs(&mapping), [("Q1", "A1")]);
    }

    #[test]
    fn line_heuristic_splits_on_first_colon_only() {
        let mapping = recover(&text("Q: What is X?: It is Y"));
        assert_eq!(pairs(&mapping), [("Q", "What is X?: It is Y")]);
    }

    #[test]
    fn line_heuristic_value_keeps_ratio() {
        let mapping = recover(&text("Mix ratio: Ratio: 3:1\nSecond: two"));
        assert_eq!(mapping.get("Mix ratio"), Some("Ratio: 3:1"));
        assert_eq!(mapping.get("Second"), Some("two"));
    }

    #[test]
    fn line_heuristic_handles_broken_json_lines() {
        // Unescaped inner quotes defeat both structured parsers.
        let raw = "{\n\"What is \"RAG\"?\": \"A technique\",\n\"Why?\": \"Grounding\"\n}";
        let mapping = recover(&text(raw));
        assert_eq!(mapping.get("What is \"RAG\"?"), Some("A technique\","));
        assert_eq!(mapping.get("Why?"), Some("Grounding"));
    }

    #[test]
    fn line_heuristic_keeps_trailing_commas() {
        let mapping = recover(&text("Q one: apples, pears,\nQ two: a, b,"));
        assert_eq!(
            pairs(&mapping),
            [("Q one", "apples, pears,"), ("Q two", "a, b,")]
        );
    }

    #[test]
    fn large_mappings_keep_first_position_last_answer() {
        let mut mapping = RecoveredMapping::new();
        for i in 0..5_000 {
            mapping.insert(format!("Q{i}"), format!("first {i}"));
        }
        for i in (0..5_000).step_by(2) {
            mapping.insert(format!("Q{i}"), format!("second {i}"));
        }
        assert_eq!(mapping.len(), 5_000);
        assert_eq!(mapping.questions().next(), Some("Q0"));
        assert_eq!(mapping.get("Q0"), Some("second 0"));
        assert_eq!(mapping.get("Q1"), Some("first 1"));
        assert_eq!(mapping.get("Q4998"), Some("second 4998"));
        assert_eq!(mapping.iter().nth(4999), Some(("Q4999", "first 4999")));
        assert_eq!(mapping.get("Q5000"), None);
    }

    #[test]
    fn mismatched_quotes_are_trimmed_per_side() {
        let mapping = recover(&text("'Q\": \"A'\nR: 'B"));
        assert_eq!(pairs(&mapping), [("Q", "A"), ("R", "B")]);
    }

    #[test]
    fn line_heuristic_uses_commas_without_newlines() {
        let mapping = recover(&text("{a: 1, 'b': \"2\"}"));
        assert_eq!(pairs(&mapping), [("a", "1"), ("b", "2")]);
    }

    #[test]
    fn quote_collisions_collapse_last_write_wins() {
        let mapping = recover(&text("'Q': first\n\"Q\": second\nOther: x"));
        assert_eq!(pairs(&mapping), [("Q", "second"), ("Other", "x")]);
    }

    #[test]
    fn garbage_yields_empty_mapping() {
        assert!(recover(&text("!!!not json at all!!!")).is_empty());
        assert!(recover(&text("")).is_empty());
        assert!(recover(&text("```")).is_empty());
    }

    #[test]
    fn standard_chain_skips_line_heuristic() {
        let recovery = ResponseRecovery::standard();
        assert!(recovery.recover(&text("Q: A")).is_empty());
        assert_eq!(recovery.recover(&text("{'Q': 'A'}")).len(), 1);
    }

    #[test]
    fn json_array_is_not_a_mapping() {
        let recovery = ResponseRecovery::standard();
        assert!(recovery.recover(&text(r#"[{"Q": "A"}]"#)).is_empty());
    }

    #[test]
    fn whitespace_only_entries_are_discarded() {
        let mapping = recover(&text(r#"{"  ": "blank question", "Q": "   ", "Ok?": "yes"}"#));
        assert_eq!(pairs(&mapping), [("Ok?", "yes")]);
    }

    #[test]
    fn nested_values_are_flattened() {
        let raw = r#"{"List?": ["a", "b"], "Obj?": {"x": 1, "y": null}, "Num?": 42, "Nil?": null}"#;
        let mapping = recover(&text(raw));
        assert_eq!(mapping.get("List?"), Some("a; b"));
        assert_eq!(mapping.get("Obj?"), Some("x: 1"));
        assert_eq!(mapping.get("Num?"), Some("42"));
        assert_eq!(mapping.get("Nil?"), None);
    }

    #[test]
    fn prose_around_json_falls_through_to_lines() {
        // Fence stripping does not isolate the object from surrounding prose.
        let raw = "Here are your cards:\n```json\n{\"Q\": \"A\"}\n```";
        let mapping = recover(&text(raw));
        assert!(mapping.get("Here are your cards").is_none());
        assert!(mapping.get("Q").is_none());
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn mapping_serializes_in_order() {
        let mapping: RecoveredMapping = [("b", "2"), ("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"b":"2","a":"1"}"#);
    }
}
