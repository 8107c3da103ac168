//! Core types for ensemble aggregation
//!
//! These are plain data values: labels, ballots, score tables and the
//! prediction round documents exchanged with the persistence layer.

use serde::de::{MapAccess, Visitor};
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Model identifier (unique within an ensemble)
pub type ModelName = String;

/// Unique identifier for prediction rounds
pub type RoundId = String;

/// Label text used when every candidate was filtered out
pub const UNCERTAIN_LABEL: &str = "Uncertain";

/// A class label produced by a model
///
/// Integer labels order before text labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    /// Numeric class (cluster index, encoded class)
    Int(i64),
    /// Named class
    Text(String),
}

impl Label {
    /// The sentinel label for a fully filtered result
    pub fn uncertain() -> Self {
        Label::Text(UNCERTAIN_LABEL.to_string())
    }

    /// Whether this is the "Uncertain" sentinel
    pub fn is_uncertain(&self) -> bool {
        matches!(self, Label::Text(t) if t == UNCERTAIN_LABEL)
    }

    /// Parse a label from a map key (integers win over text)
    pub fn from_key(key: &str) -> Self {
        match key.parse::<i64>() {
            Ok(n) => Label::Int(n),
            Err(_) => Label::Text(key.to_string()),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(n) => write!(f, "{}", n),
            Label::Text(t) => write!(f, "{}", t),
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Int(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Label::Int(i64::from(value))
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Text(value)
    }
}

/// One model's vote in a weighted round: an explicit (label, weight) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    /// Model that cast the vote
    pub model: ModelName,
    /// Predicted label
    pub label: Label,
    /// Trust in this vote; absent means 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Ballot {
    /// Create a ballot with no explicit confidence
    pub fn new(model: impl Into<ModelName>, label: impl Into<Label>) -> Self {
        Self {
            model: model.into(),
            label: label.into(),
            confidence: None,
        }
    }

    /// Set explicit confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Confidence with the 1.0 default applied
    pub fn effective_confidence(&self) -> f64 {
        self.confidence.unwrap_or(1.0)
    }

    /// Majority-voting view of this ballot: `{"label": <label>}`
    pub fn to_record(&self) -> PredictionRecord {
        let mut record = PredictionRecord::new();
        record.insert("label", self.label.clone());
        record
    }
}

/// Insertion-ordered key -> label mapping; every entry casts one majority vote
///
/// Entry order is the order keys were first inserted (JSON object order when
/// deserialized); it decides majority-vote ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionRecord {
    entries: Vec<(String, Label)>,
}

impl PredictionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`; a replaced key keeps its position
    pub fn insert(&mut self, key: impl Into<String>, label: impl Into<Label>) {
        let key = key.into();
        let label = label.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, value)) => *value = label,
            None => self.entries.push((key, label)),
        }
    }

    /// Labels in insertion order
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.entries.iter().map(|(_, label)| label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PredictionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, label) in &self.entries {
            map.serialize_entry(key, label)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PredictionRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = PredictionRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of key to label")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = PredictionRecord::new();
                while let Some((key, label)) = access.next_entry::<String, Label>()? {
                    record.insert(key, label);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Insertion-ordered label -> score mapping
///
/// Order is the order in which labels were first seen; it decides ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    entries: Vec<(Label, f64)>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the score of `label`, appending it if unseen
    pub fn accumulate(&mut self, label: &Label, amount: f64) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, score)) => *score += amount,
            None => self.entries.push((label.clone(), amount)),
        }
    }

    /// Score for `label`
    pub fn get(&self, label: &Label) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| *s)
    }

    /// Whether `label` has an entry
    pub fn contains(&self, label: &Label) -> bool {
        self.get(label).is_some()
    }

    /// First entry holding the maximal score
    pub fn leader(&self) -> Option<(&Label, f64)> {
        let mut best: Option<(&Label, f64)> = None;
        for (label, score) in &self.entries {
            match best {
                Some((_, top)) if *score <= top => {}
                _ => best = Some((label, *score)),
            }
        }
        best
    }

    /// Maximal score, if any
    pub fn max_score(&self) -> Option<f64> {
        self.leader().map(|(_, s)| s)
    }

    /// Sum of all scores
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }

    /// Keep only entries matching `keep`, preserving order
    pub fn retain(&self, mut keep: impl FnMut(&Label, f64) -> bool) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(l, s)| keep(l, *s))
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, f64)> {
        self.entries.iter().map(|(l, s)| (l, *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<Label>> FromIterator<(L, f64)> for ScoreTable {
    fn from_iter<I: IntoIterator<Item = (L, f64)>>(iter: I) -> Self {
        let mut table = ScoreTable::new();
        for (label, score) in iter {
            table.accumulate(&label.into(), score);
        }
        table
    }
}

/// Keys are the labels' display form, so a table holding both `Int(n)` and
/// `Text("n")` cannot be serialized and fails instead of writing duplicate keys.
impl Serialize for ScoreTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seen = BTreeSet::new();
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, score) in &self.entries {
            let key = label.to_string();
            if !seen.insert(key.clone()) {
                return Err(S::Error::custom(format!(
                    "labels {} and \"{}\" share the key \"{}\"",
                    key, key, key
                )));
            }
            map.serialize_entry(&key, score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreTableVisitor;

        impl<'de> Visitor<'de> for ScoreTableVisitor {
            type Value = ScoreTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of label to score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = ScoreTable::new();
                while let Some((key, score)) = access.next_entry::<String, f64>()? {
                    table.accumulate(&Label::from_key(&key), score);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(ScoreTableVisitor)
    }
}

/// Resolved label plus the per-label score breakdown
///
/// `result` is always the leader of `details`, except for the "Uncertain"
/// sentinel whose details are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub result: Label,
    pub details: ScoreTable,
}

impl AggregationResult {
    /// Build a result whose winner is the leader of `details`
    ///
    /// Empty details produce the "Uncertain" sentinel.
    pub fn from_details(details: ScoreTable) -> Self {
        match details.leader() {
            Some((label, _)) => Self {
                result: label.clone(),
                details,
            },
            None => Self::uncertain(),
        }
    }

    /// The `{result: "Uncertain", details: {}}` sentinel
    pub fn uncertain() -> Self {
        Self {
            result: Label::uncertain(),
            details: ScoreTable::new(),
        }
    }

    pub fn is_uncertain(&self) -> bool {
        self.result.is_uncertain() && self.details.is_empty()
    }
}

/// Per-model predictions for a batch of items, keyed by model name
pub type BatchPredictions = BTreeMap<ModelName, Vec<Label>>;

/// Per-item outcome of disagreement resolution
///
/// Serialized as the label, or `null` when no consensus was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolution {
    Consensus(Label),
    NoConsensus,
}

impl Resolution {
    /// The resolved label, if consensus was reached
    pub fn label(&self) -> Option<&Label> {
        match self {
            Resolution::Consensus(label) => Some(label),
            Resolution::NoConsensus => None,
        }
    }

    pub fn is_consensus(&self) -> bool {
        matches!(self, Resolution::Consensus(_))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Consensus(label) => write!(f, "{}", label),
            Resolution::NoConsensus => write!(f, "no consensus"),
        }
    }
}

/// One inference/evaluation round as exchanged on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRound {
    /// Round identifier (generated when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RoundId>,

    /// Single-item votes for aggregation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ballots: Vec<Ballot>,

    /// Batched per-item predictions for consensus resolution
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub batch: BatchPredictions,

    /// Ground truth for the batch, enabling evaluation and re-weighting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<Vec<Label>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_json_forms() {
        let labels: Vec<Label> = serde_json::from_str(r#"[0, "A", 7]"#).unwrap();
        assert_eq!(labels, vec![Label::Int(0), Label::from("A"), Label::Int(7)]);
        assert_eq!(serde_json::to_string(&Label::from("B")).unwrap(), r#""B""#);
    }

    #[test]
    fn test_label_ordering_ints_first() {
        let mut labels = vec![Label::from("b"), Label::Int(3), Label::from("a"), Label::Int(-1)];
        labels.sort();
        assert_eq!(
            labels,
            vec![Label::Int(-1), Label::Int(3), Label::from("a"), Label::from("b")]
        );
    }

    #[test]
    fn test_score_table_keeps_first_seen_order() {
        let mut table = ScoreTable::new();
        table.accumulate(&Label::from("B"), 1.0);
        table.accumulate(&Label::from("A"), 2.0);
        table.accumulate(&Label::from("B"), 1.0);

        let order: Vec<String> = table.iter().map(|(l, _)| l.to_string()).collect();
        assert_eq!(order, vec!["B", "A"]);
        // B and A tie at 2.0; B was seen first
        assert_eq!(table.leader().unwrap().0, &Label::from("B"));
    }

    #[test]
    fn test_score_table_json_preserves_order() {
        let table: ScoreTable = vec![("C", 0.1), ("A", 0.6), ("B", 0.3)].into_iter().collect();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"C":0.1,"A":0.6,"B":0.3}"#);

        let back: ScoreTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_score_table_integer_keys_round_trip() {
        let table: ScoreTable = vec![(Label::Int(1), 2.0), (Label::Int(0), 1.0)]
            .into_iter()
            .collect();
        let back: ScoreTable =
            serde_json::from_str(&serde_json::to_string(&table).unwrap()).unwrap();
        assert_eq!(back.get(&Label::Int(1)), Some(2.0));
    }

    #[test]
    fn test_resolution_serializes_null() {
        let items = vec![Resolution::Consensus(Label::Int(1)), Resolution::NoConsensus];
        let json = serde_json::to_string(&items).unwrap();
        assert_eq!(json, "[1,null]");
        let back: Vec<Resolution> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn test_prediction_round_defaults() {
        let round: PredictionRound = serde_json::from_str(
            r#"{"ballots": [{"model": "svm", "label": "A", "confidence": 0.6}]}"#,
        )
        .unwrap();
        assert!(round.id.is_none());
        assert!(round.batch.is_empty());
        assert_eq!(round.ballots[0].effective_confidence(), 0.6);
        assert_eq!(Ballot::new("rf", "B").effective_confidence(), 1.0);
    }

    #[test]
    fn test_prediction_record_keeps_insertion_order() {
        let record: PredictionRecord = serde_json::from_str(r#"{"z": "B", "a": "A"}"#).unwrap();
        let labels: Vec<&Label> = record.labels().collect();
        assert_eq!(labels, vec![&Label::from("B"), &Label::from("A")]);
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"z":"B","a":"A"}"#);

        let mut built = PredictionRecord::new();
        built.insert("z", "B");
        built.insert("a", "A");
        built.insert("z", "C");
        let labels: Vec<&Label> = built.labels().collect();
        assert_eq!(labels, vec![&Label::from("C"), &Label::from("A")]);
        assert_eq!(built.len(), 2);
    }

    #[test]
    fn test_score_table_rejects_colliding_keys() {
        let table: ScoreTable = vec![(Label::Int(1), 0.5), (Label::from("1"), 0.5)]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 2);
        let err = serde_json::to_string(&table).unwrap_err();
        assert!(err.to_string().contains("share the key"));
    }
}
