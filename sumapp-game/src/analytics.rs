//! Cross-profile aggregates for the administrative view.
//!
//! Everything here is a pure function of the stored document; the
//! presentation layer decides how to chart it. Accuracy figures are
//! percentages rounded to one decimal, 0.0 when nothing was attempted.
use crate::document::GameDocument;
use crate::numbers::{percent, round_to_tenth, usize_to_f64};
use crate::problems::{Operation, ProblemKey};
use crate::profiles::Profile;
use crate::records::Quiz;
use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Per-fact line of a learner summary or error matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRow {
    pub key: ProblemKey,
    pub correct: u32,
    pub wrong: u32,
    pub total: u32,
    pub accuracy: f64,
}

impl ProblemRow {
    fn new(key: &ProblemKey, correct: u32, wrong: u32) -> Self {
        let total = correct.saturating_add(wrong);
        Self {
            key: key.clone(),
            correct,
            wrong,
            total,
            accuracy: accuracy(u64::from(correct), u64::from(total)),
        }
    }

    /// Descending by `wrong / total`, compared exactly.
    fn cmp_error_rate(&self, other: &Self) -> Ordering {
        let lhs = u64::from(other.wrong) * u64::from(self.total);
        let rhs = u64::from(self.wrong) * u64::from(other.total);
        lhs.cmp(&rhs)
    }
}

fn accuracy(correct: u64, total: u64) -> f64 {
    round_to_tenth(percent(correct, total))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub name: String,
    pub level: u32,
    pub total_correct: u64,
    pub total_wrong: u64,
    pub total_questions: u64,
    pub overall_accuracy: f64,
    /// Attempted facts, most-missed first.
    pub problems: Vec<ProblemRow>,
    pub last_played: DateTime<Utc>,
}

#[must_use]
pub fn profile_summary(name: &str, profile: &Profile) -> ProfileSummary {
    let mut problems: Vec<ProblemRow> = profile
        .stats()
        .iter()
        .map(|(key, stat)| ProblemRow::new(key, stat.correct, stat.wrong))
        .collect();
    problems.sort_by(|a, b| b.wrong.cmp(&a.wrong));

    let total_correct: u64 = problems.iter().map(|row| u64::from(row.correct)).sum();
    let total_wrong: u64 = problems.iter().map(|row| u64::from(row.wrong)).sum();
    let total_questions = total_correct + total_wrong;
    ProfileSummary {
        name: name.to_string(),
        level: profile.level(),
        total_correct,
        total_wrong,
        total_questions,
        overall_accuracy: accuracy(total_correct, total_questions),
        problems,
        last_played: profile.last_played(),
    }
}

/// Summaries of every learner, busiest first.
#[must_use]
pub fn learner_summaries(document: &GameDocument) -> Vec<ProfileSummary> {
    let mut summaries: Vec<ProfileSummary> = document
        .learners()
        .map(|(name, profile)| profile_summary(name, profile))
        .collect();
    summaries.sort_by(|a, b| b.total_questions.cmp(&a.total_questions));
    summaries
}

/// Headline figures across all learners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub learners: usize,
    pub total_questions: u64,
    /// Mean of the learners' overall accuracies.
    pub average_accuracy: f64,
    pub summaries: Vec<ProfileSummary>,
}

#[must_use]
pub fn dashboard(document: &GameDocument) -> Dashboard {
    let summaries = learner_summaries(document);
    let total_questions = summaries.iter().map(|s| s.total_questions).sum();
    let average_accuracy = if summaries.is_empty() {
        0.0
    } else {
        let sum: f64 = summaries.iter().map(|s| s.overall_accuracy).sum();
        round_to_tenth(sum / usize_to_f64(summaries.len()))
    };
    Dashboard {
        learners: summaries.len(),
        total_questions,
        average_accuracy,
        summaries,
    }
}

/// Attempted facts ordered by error rate, split by operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMatrix {
    pub additions: Vec<ProblemRow>,
    pub subtractions: Vec<ProblemRow>,
}

#[must_use]
pub fn error_matrix(profile: &Profile) -> ErrorMatrix {
    let mut rows: Vec<ProblemRow> = profile
        .stats()
        .iter()
        .filter(|(_, stat)| stat.attempts() > 0)
        .map(|(key, stat)| ProblemRow::new(key, stat.correct, stat.wrong))
        .collect();
    rows.sort_by(|a, b| a.cmp_error_rate(b).then_with(|| b.total.cmp(&a.total)));

    let mut matrix = ErrorMatrix::default();
    for row in rows {
        match row.key.problem().map(|problem| problem.operation) {
            Some(Operation::Add) => matrix.additions.push(row),
            Some(Operation::Sub) => matrix.subtractions.push(row),
            None => log::warn!("error matrix skipping unknown key {}", row.key),
        }
    }
    matrix
}

/// Closed quizzes that started in one day or week.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyBucket {
    /// `YYYY-MM-DD` for days, `YYYY-Www` (ISO week) for weeks.
    pub key: String,
    pub correct: u64,
    pub total: u64,
    pub accuracy: f64,
    pub quizzes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyEvolution {
    pub by_day: Vec<AccuracyBucket>,
    pub by_week: Vec<AccuracyBucket>,
}

#[derive(Default)]
struct Tally {
    correct: u64,
    total: u64,
    quizzes: u32,
}

fn into_buckets(tallies: BTreeMap<String, Tally>) -> Vec<AccuracyBucket> {
    tallies
        .into_iter()
        .map(|(key, tally)| AccuracyBucket {
            key,
            correct: tally.correct,
            total: tally.total,
            accuracy: accuracy(tally.correct, tally.total),
            quizzes: tally.quizzes,
        })
        .collect()
}

/// Accuracy over time by UTC start day and ISO week. Open quizzes are skipped.
#[must_use]
pub fn accuracy_evolution(quizzes: &[Quiz]) -> AccuracyEvolution {
    let mut by_day: BTreeMap<String, Tally> = BTreeMap::new();
    let mut by_week: BTreeMap<String, Tally> = BTreeMap::new();
    for quiz in quizzes.iter().filter(|quiz| !quiz.is_open()) {
        let day = quiz.start_time.format("%Y-%m-%d").to_string();
        let iso = quiz.start_time.iso_week();
        let week = format!("{}-W{:02}", iso.year(), iso.week());
        for tally in [by_day.entry(day).or_default(), by_week.entry(week).or_default()] {
            tally.correct += u64::from(quiz.correct_count);
            tally.total += u64::from(quiz.total_questions);
            tally.quizzes += 1;
        }
    }
    AccuracyEvolution {
        by_day: into_buckets(by_day),
        by_week: into_buckets(by_week),
    }
}

/// Start, end and length of one session or quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSpan {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds, `None` while still open.
    pub duration_secs: Option<i64>,
}

impl RecordSpan {
    fn new(id: &str, start_time: DateTime<Utc>, duration: Option<TimeDelta>) -> Self {
        Self {
            id: id.to_string(),
            start_time,
            end_time: duration.map(|d| start_time + d),
            duration_secs: duration.map(|d| d.num_seconds()),
        }
    }
}

/// History view of a single learner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetail {
    pub session_count: usize,
    pub quiz_count: usize,
    pub sessions: Vec<RecordSpan>,
    pub quizzes: Vec<RecordSpan>,
    pub evolution: AccuracyEvolution,
}

#[must_use]
pub fn profile_detail(profile: &Profile) -> ProfileDetail {
    ProfileDetail {
        session_count: profile.sessions().len(),
        quiz_count: profile.quizzes().len(),
        sessions: profile
            .sessions()
            .iter()
            .map(|s| RecordSpan::new(&s.id, s.start_time, s.duration()))
            .collect(),
        quizzes: profile
            .quizzes()
            .iter()
            .map(|q| RecordSpan::new(&q.id, q.start_time, q.duration()))
            .collect(),
        evolution: accuracy_evolution(profile.quizzes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::problem_key;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn learner(answers: &[(u8, u8, Operation, bool)]) -> Profile {
        let mut profile = Profile::new(at("2024-03-01T09:00:00Z"));
        for &(a, b, op, ok) in answers {
            profile.update_stats(&problem_key(a, b, op), ok, at("2024-03-01T09:00:00Z"));
        }
        profile
    }

    #[test]
    fn summary_totals_and_ordering() {
        use Operation::{Add, Sub};
        let profile = learner(&[
            (1, 1, Add, true),
            (1, 1, Add, false),
            (7, 3, Sub, false),
            (7, 3, Sub, false),
            (2, 2, Add, true),
        ]);
        let summary = profile_summary("Mia", &profile);
        assert_eq!(summary.total_questions, 5);
        assert_eq!(summary.total_correct, 2);
        assert!((summary.overall_accuracy - 40.0).abs() < 1e-9);
        assert_eq!(summary.problems[0].key.as_str(), "7-3");
        assert!((summary.problems[1].accuracy - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_profile_has_zero_accuracy() {
        let summary = profile_summary("New", &learner(&[]));
        assert_eq!(summary.total_questions, 0);
        assert!(summary.overall_accuracy.abs() < f64::EPSILON);
    }

    #[test]
    fn dashboard_skips_admin_and_sorts_by_activity() {
        let now = at("2024-03-01T09:00:00Z");
        let mut doc = GameDocument::default();
        doc.create_profile("admin", now).unwrap();
        doc.create_profile("Quiet", now).unwrap();
        doc.create_profile("Busy", now).unwrap();
        let key = problem_key(3, 4, Operation::Add);
        let busy = doc.profile_mut("Busy").unwrap();
        busy.update_stats(&key, true, now);
        busy.update_stats(&key, false, now);
        doc.profile_mut("Quiet")
            .unwrap()
            .update_stats(&key, true, now);

        let board = dashboard(&doc);
        assert_eq!(board.learners, 2);
        assert_eq!(board.total_questions, 3);
        assert!((board.average_accuracy - 75.0).abs() < 1e-9);
        let names: Vec<&str> = board.summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Busy", "Quiet"]);
    }

    #[test]
    fn error_matrix_orders_by_rate_then_attempts() {
        use Operation::{Add, Sub};
        let profile = learner(&[
            (5, 5, Add, false),
            (5, 5, Add, true),
            (6, 6, Add, false),
            (6, 6, Add, false),
            (6, 6, Add, true),
            (6, 6, Add, true),
            (9, 0, Add, false),
            (8, 8, Sub, true),
        ]);
        let matrix = error_matrix(&profile);
        let keys: Vec<&str> = matrix.additions.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["9+0", "6+6", "5+5"]);
        assert_eq!(matrix.subtractions.len(), 1);
    }

    #[test]
    fn evolution_buckets_closed_quizzes() {
        let mut profile = Profile::new(at("2024-01-01T00:00:00Z"));
        profile.start_quiz(1, at("2024-01-01T10:00:00Z"));
        profile.end_quiz(false, 8, 10, at("2024-01-01T10:01:00Z"));
        profile.start_quiz(1, at("2024-01-01T11:00:00Z"));
        profile.end_quiz(true, 10, 10, at("2024-01-01T11:01:00Z"));
        profile.start_quiz(2, at("2024-01-08T09:00:00Z"));
        profile.end_quiz(false, 5, 10, at("2024-01-08T09:01:00Z"));
        profile.start_quiz(2, at("2024-01-09T09:00:00Z"));

        let evolution = accuracy_evolution(profile.quizzes());
        let days: Vec<&str> = evolution.by_day.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(days, vec!["2024-01-01", "2024-01-08"]);
        assert!((evolution.by_day[0].accuracy - 90.0).abs() < 1e-9);
        assert_eq!(evolution.by_day[0].quizzes, 2);
        let weeks: Vec<&str> = evolution.by_week.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(weeks, vec!["2024-W01", "2024-W02"]);
    }

    #[test]
    fn detail_reports_open_records_without_duration() {
        let mut profile = Profile::new(at("2024-01-01T00:00:00Z"));
        profile.start_quiz(1, at("2024-01-01T10:00:00Z"));
        profile.end_quiz(true, 10, 10, at("2024-01-01T10:00:45Z"));
        profile.start_quiz(2, at("2024-01-01T10:01:00Z"));

        let detail = profile_detail(&profile);
        assert_eq!((detail.session_count, detail.quiz_count), (1, 2));
        assert_eq!(detail.quizzes[0].duration_secs, Some(45));
        assert_eq!(detail.quizzes[1].duration_secs, None);
        assert_eq!(detail.sessions[0].end_time, None);
    }
}
