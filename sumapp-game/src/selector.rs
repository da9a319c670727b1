//! Adaptive question selection.
//!
//! Every fact in the universe gets a weight of `1 + wrong × difficulty`,
//! where difficulty grows by 0.1 per level. Weights are discretized into
//! `max(1, round(weight × 10))` slots and facts are drawn independently,
//! with replacement, from a cumulative slot table by binary search. The
//! resulting probabilities match a materialized pool of the same slots
//! without ever building that pool.
use crate::constants::{BASE_WEIGHT, DIFFICULTY_STEP, POOL_RESOLUTION};
use crate::numbers::{round_f64_to_u32, u64_to_f64};
use crate::problems::{Problem, ProblemKey, all_problems};
use crate::stats::StatBook;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Multiplier applied to wrong answers at `level` (1.0 at level 1, 1.9 at level 10).
#[must_use]
pub fn difficulty_factor(level: u32) -> f64 {
    BASE_WEIGHT + f64::from(level.saturating_sub(1)) * DIFFICULTY_STEP
}

/// Relative sampling weight of a fact missed `wrong` times, at `level`.
#[must_use]
pub fn problem_weight(wrong: u32, level: u32) -> f64 {
    BASE_WEIGHT + f64::from(wrong) * difficulty_factor(level)
}

/// Number of equally-likely slots a weight occupies. Never zero.
#[must_use]
pub fn slot_count(weight: f64) -> u32 {
    round_f64_to_u32(weight * POOL_RESOLUTION).max(1)
}

/// Cumulative slot table over the whole universe for one learner at one level.
#[derive(Debug, Clone)]
pub struct WeightTable {
    problems: &'static [Problem],
    cumulative: Vec<u64>,
    total: u64,
}

impl WeightTable {
    #[must_use]
    pub fn build(stats: &StatBook, level: u32) -> Self {
        let problems = all_problems();
        let mut cumulative = Vec::with_capacity(problems.len());
        let mut running = 0u64;
        for problem in problems {
            let weight = problem_weight(stats.wrong(&problem.key()), level);
            running += u64::from(slot_count(weight));
            cumulative.push(running);
        }
        Self {
            problems,
            cumulative,
            total: running,
        }
    }

    /// Total slot count across the universe.
    #[must_use]
    pub const fn total_slots(&self) -> u64 {
        self.total
    }

    /// Slots held by the fact named `key`, 0 when the key is not in the universe.
    #[must_use]
    pub fn slots_for(&self, key: &ProblemKey) -> u64 {
        self.problems
            .iter()
            .position(|problem| &problem.key() == key)
            .map_or(0, |idx| {
                let start = if idx == 0 { 0 } else { self.cumulative[idx - 1] };
                self.cumulative[idx] - start
            })
    }

    /// Per-draw probability of selecting the fact named `key`.
    #[must_use]
    pub fn probability(&self, key: &ProblemKey) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        u64_to_f64(self.slots_for(key)) / u64_to_f64(self.total)
    }

    /// Draw one fact.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Problem {
        let roll = rng.gen_range(0..self.total);
        let idx = self.cumulative.partition_point(|&edge| edge <= roll);
        self.problems[idx.min(self.problems.len() - 1)]
    }
}

/// Draw `count` facts independently with replacement, biased toward the
/// learner's past mistakes. A learner with no history gets a uniform draw.
pub fn select_questions<R: Rng>(
    stats: &StatBook,
    level: u32,
    count: usize,
    rng: &mut R,
) -> Vec<Problem> {
    let table = WeightTable::build(stats, level);
    (0..count).map(|_| table.draw(rng)).collect()
}

/// A drawn fact positioned within its quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(flatten)]
    pub problem: Problem,
    pub key: ProblemKey,
    /// 1-based position in the quiz.
    pub question_number: u32,
    pub total_questions: u32,
}

/// Number a selection of facts into quiz questions.
#[must_use]
pub fn number_questions(problems: Vec<Problem>) -> Vec<Question> {
    let total = u32::try_from(problems.len()).unwrap_or(u32::MAX);
    problems
        .into_iter()
        .zip(1u32..)
        .map(|(problem, question_number)| Question {
            key: problem.key(),
            problem,
            question_number,
            total_questions: total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FLOAT_EPSILON, UNIVERSE_SIZE};
    use crate::problems::{Operation, problem_key};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn weight_scales_with_level() {
        assert!((problem_weight(5, 1) - 6.0).abs() < FLOAT_EPSILON);
        assert!((problem_weight(5, 10) - 10.5).abs() < FLOAT_EPSILON);
        assert!((problem_weight(0, 10) - 1.0).abs() < FLOAT_EPSILON);
        for level in 1..10 {
            assert!(problem_weight(1, level + 1) > problem_weight(1, level));
        }
    }

    #[test]
    fn fresh_stats_give_uniform_table() {
        let table = WeightTable::build(&StatBook::new(), 7);
        assert_eq!(table.total_slots(), 10 * UNIVERSE_SIZE as u64);
        let expected = 1.0 / UNIVERSE_SIZE as f64;
        for problem in all_problems() {
            assert!((table.probability(&problem.key()) - expected).abs() < FLOAT_EPSILON);
        }
    }

    #[test]
    fn missed_fact_gets_proportional_share() {
        let mut stats = StatBook::new();
        let missed = problem_key(8, 7, Operation::Add);
        for _ in 0..5 {
            stats.record(&missed, false);
        }
        let table = WeightTable::build(&stats, 1);
        assert_eq!(table.slots_for(&missed), 60);
        assert_eq!(table.total_slots(), 60 + 10 * (UNIVERSE_SIZE as u64 - 1));

        let top = WeightTable::build(&stats, 10);
        assert_eq!(top.slots_for(&missed), 105);
        assert!(top.probability(&missed) > table.probability(&missed));
    }

    #[test]
    fn unknown_keys_have_no_slots() {
        let table = WeightTable::build(&StatBook::new(), 1);
        assert_eq!(table.slots_for(&ProblemKey::from("1*1")), 0);
        assert!(table.probability(&ProblemKey::from("1*1")).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn selection_is_deterministic_for_seed() {
        let stats = StatBook::new();
        let mut a = ChaCha20Rng::seed_from_u64(42);
        let mut b = ChaCha20Rng::seed_from_u64(42);
        let first = select_questions(&stats, 3, 10, &mut a);
        let second = select_questions(&stats, 3, 10, &mut b);
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn draws_cover_universe_edges() {
        let table = WeightTable::build(&StatBook::new(), 1);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut seen_first = false;
        let mut seen_last = false;
        let first = all_problems()[0];
        let last = all_problems()[UNIVERSE_SIZE - 1];
        for _ in 0..20_000 {
            let drawn = table.draw(&mut rng);
            seen_first |= drawn == first;
            seen_last |= drawn == last;
        }
        assert!(seen_first && seen_last);
    }

    #[test]
    fn numbered_questions_carry_position() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let questions = number_questions(select_questions(&StatBook::new(), 1, 4, &mut rng));
        let numbers: Vec<u32> = questions.iter().map(|q| q.question_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert!(questions.iter().all(|q| q.total_questions == 4));
        assert!(questions.iter().all(|q| q.key == q.problem.key()));
    }
}
