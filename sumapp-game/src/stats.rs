//! Per-learner answer history, one counter pair per fact.
use crate::problems::ProblemKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correct/wrong counters for one fact. Both only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemStat {
    #[serde(default)]
    pub correct: u32,
    #[serde(default)]
    pub wrong: u32,
}

impl ProblemStat {
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.correct.saturating_add(self.wrong)
    }

    fn record(&mut self, is_correct: bool) {
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        } else {
            self.wrong = self.wrong.saturating_add(1);
        }
    }
}

/// Stat store for a single profile. Entries are created on first attempt
/// and never removed; absent entries read as zeroed counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatBook {
    entries: BTreeMap<ProblemKey, ProblemStat>,
}

impl StatBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for `key`, zeroed when the fact was never attempted.
    #[must_use]
    pub fn get_or_default(&self, key: &ProblemKey) -> ProblemStat {
        self.entries.get(key).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn wrong(&self, key: &ProblemKey) -> u32 {
        self.get_or_default(key).wrong
    }

    /// Increment exactly one counter for `key`, creating the entry if needed.
    /// Returns the updated counters.
    pub fn record(&mut self, key: &ProblemKey, is_correct: bool) -> ProblemStat {
        let stat = self.entries.entry(key.clone()).or_default();
        stat.record(is_correct);
        *stat
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProblemKey, &ProblemStat)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed counters across every fact.
    #[must_use]
    pub fn totals(&self) -> ProblemStat {
        self.entries
            .values()
            .fold(ProblemStat::default(), |acc, stat| ProblemStat {
                correct: acc.correct.saturating_add(stat.correct),
                wrong: acc.wrong.saturating_add(stat.wrong),
            })
    }
}

impl FromIterator<(ProblemKey, ProblemStat)> for StatBook {
    fn from_iter<T: IntoIterator<Item = (ProblemKey, ProblemStat)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::{Operation, problem_key};

    #[test]
    fn record_creates_entries_lazily() {
        let mut book = StatBook::new();
        let key = problem_key(3, 4, Operation::Add);
        assert_eq!(book.get_or_default(&key), ProblemStat::default());
        assert!(book.is_empty());

        for _ in 0..3 {
            book.record(&key, true);
        }
        let stat = book.record(&key, false);
        assert_eq!(stat, ProblemStat { correct: 3, wrong: 1 });
        assert_eq!(book.len(), 1);
        assert_eq!(book.wrong(&key), 1);
    }

    #[test]
    fn totals_sum_all_entries() {
        let mut book = StatBook::new();
        book.record(&problem_key(1, 1, Operation::Add), true);
        book.record(&problem_key(5, 2, Operation::Sub), false);
        book.record(&problem_key(5, 2, Operation::Sub), false);
        let totals = book.totals();
        assert_eq!(totals.correct, 1);
        assert_eq!(totals.wrong, 2);
        assert_eq!(totals.attempts(), 3);
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut book = StatBook::new();
        book.record(&problem_key(2, 2, Operation::Add), true);
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json, serde_json::json!({ "2+2": { "correct": 1, "wrong": 0 } }));
    }
}
