use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of one task record ("Task ID" column of the input).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One profession/task pair to be evaluated. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: RecordId,
    pub title: String,
    pub task: String,
}

/// Outcome of one rater for one record.
///
/// The rating is absent when the rater's output could not be parsed; the raw
/// output text is then kept verbatim as the justification so nothing is lost
/// for debugging or manual recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaterOutcome {
    pub rating: Option<u8>,
    pub justification: String,
}

impl RaterOutcome {
    pub fn resolved(rating: u8, justification: impl Into<String>) -> Self {
        Self {
            rating: Some(rating),
            justification: justification.into(),
        }
    }

    pub fn unresolved(raw_output: impl Into<String>) -> Self {
        Self {
            rating: None,
            justification: raw_output.into(),
        }
    }
}

/// Result of the secondary classification stage for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryOutcome {
    /// AI engagement level, 1 (no engagement) to 5 (full replacement).
    pub engagement: u8,
    /// Whether significant human complementarity is required.
    pub complementary: bool,
    pub reasoning: String,
}

/// In-memory merged results table, keyed by record identity.
///
/// The pipeline is the single writer: worker pools hand their results to one
/// aggregating consumer, which merges them here after (or while, for the
/// incrementally-flushed secondary stage) the pool drains.
#[derive(Debug, Default)]
pub struct WorkTable {
    records: Vec<TaskRecord>,
    raters: BTreeMap<String, HashMap<RecordId, RaterOutcome>>,
    consensus: HashMap<RecordId, u8>,
    summaries: HashMap<RecordId, String>,
    secondary: HashMap<RecordId, SecondaryOutcome>,
}

impl WorkTable {
    pub fn new(records: Vec<TaskRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge rater outcomes into the table.
    ///
    /// Precedence: an incoming outcome only fills slots that are empty or
    /// carry an absent rating. A record that already has a non-absent rating
    /// is never overwritten, which is what makes re-running a stage a no-op
    /// for completed records.
    pub fn merge_rater(&mut self, rater: &str, outcomes: HashMap<RecordId, RaterOutcome>) {
        let slot = self.raters.entry(rater.to_string()).or_default();
        for (id, outcome) in outcomes {
            match slot.get(&id) {
                Some(existing) if existing.rating.is_some() => {}
                _ => {
                    slot.insert(id, outcome);
                }
            }
        }
    }

    pub fn rater_outcome(&self, rater: &str, id: &RecordId) -> Option<&RaterOutcome> {
        self.raters.get(rater).and_then(|m| m.get(id))
    }

    pub fn rater_outcomes(&self, rater: &str) -> impl Iterator<Item = (&RecordId, &RaterOutcome)> {
        self.raters.get(rater).into_iter().flatten()
    }

    /// Records still lacking a non-absent rating from the given rater.
    pub fn unresolved_for_rater(&self, rater: &str) -> Vec<TaskRecord> {
        let slot = self.raters.get(rater);
        self.records
            .iter()
            .filter(|r| {
                slot.and_then(|m| m.get(&r.id))
                    .map_or(true, |o| o.rating.is_none())
            })
            .cloned()
            .collect()
    }

    pub fn set_consensus(&mut self, id: RecordId, rating: u8) {
        self.consensus.insert(id, rating);
    }

    pub fn consensus(&self, id: &RecordId) -> Option<u8> {
        self.consensus.get(id).copied()
    }

    pub fn merge_summaries(&mut self, summaries: HashMap<RecordId, String>) {
        for (id, summary) in summaries {
            self.summaries.entry(id).or_insert(summary);
        }
    }

    pub fn summary(&self, id: &RecordId) -> Option<&str> {
        self.summaries.get(id).map(String::as_str)
    }

    pub fn summaries(&self) -> impl Iterator<Item = (&RecordId, &str)> {
        self.summaries.iter().map(|(id, s)| (id, s.as_str()))
    }

    pub fn unresolved_for_summary(&self) -> Vec<TaskRecord> {
        self.records
            .iter()
            .filter(|r| !self.summaries.contains_key(&r.id))
            .cloned()
            .collect()
    }

    pub fn set_secondary(&mut self, id: RecordId, outcome: SecondaryOutcome) {
        self.secondary.entry(id).or_insert(outcome);
    }

    pub fn merge_secondary(&mut self, outcomes: HashMap<RecordId, SecondaryOutcome>) {
        for (id, outcome) in outcomes {
            self.set_secondary(id, outcome);
        }
    }

    pub fn secondary(&self, id: &RecordId) -> Option<&SecondaryOutcome> {
        self.secondary.get(id)
    }

    pub fn secondary_outcomes(&self) -> impl Iterator<Item = (&RecordId, &SecondaryOutcome)> {
        self.secondary.iter()
    }

    pub fn unresolved_for_secondary(&self) -> Vec<TaskRecord> {
        self.records
            .iter()
            .filter(|r| !self.secondary.contains_key(&r.id))
            .cloned()
            .collect()
    }
}
