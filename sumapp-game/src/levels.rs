//! Level table, answer checking, and pass/fail evaluation.
use crate::constants::{DEFAULT_QUESTIONS_PER_LEVEL, DEFAULT_SUCCESS_THRESHOLD, FLOAT_EPSILON};
use crate::numbers::{ceil_f64_to_u32, round_f64_to_u32};
use crate::problems::Operation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timing and size of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    pub level: u32,
    pub time_limit_seconds: f64,
    pub questions_per_level: u32,
}

impl LevelConfig {
    /// Time limit in whole 100 ms countdown ticks.
    #[must_use]
    pub fn time_limit_ticks(&self) -> u32 {
        round_f64_to_u32(self.time_limit_seconds * 10.0)
    }
}

/// Outcome of a completed level attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelResult {
    pub passed: bool,
    pub percentage: u32,
    pub correct_count: u32,
    pub total_questions: u32,
}

/// Errors raised when a level table violates its invariants.
#[derive(Debug, Error, PartialEq)]
pub enum LevelConfigError {
    #[error("level table is empty")]
    Empty,
    #[error("level {found} out of sequence (expected {expected})")]
    OutOfSequence { expected: u32, found: u32 },
    #[error("level {level}: time limit must be positive (got {value:.2})")]
    TimeLimit { level: u32, value: f64 },
    #[error("level {level}: question count must be positive")]
    QuestionCount { level: u32 },
    #[error("success threshold must be in (0, 1] (got {0:.2})")]
    Threshold(f64),
}

/// Ordered, immutable level table plus the pass threshold.
///
/// Deserialization goes through [`LevelPolicy::validate`], so a decoded
/// policy always has at least one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawLevelPolicy")]
pub struct LevelPolicy {
    levels: Vec<LevelConfig>,
    success_threshold: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLevelPolicy {
    levels: Vec<LevelConfig>,
    #[serde(default = "LevelPolicy::default_threshold")]
    success_threshold: f64,
}

impl TryFrom<RawLevelPolicy> for LevelPolicy {
    type Error = LevelConfigError;

    fn try_from(raw: RawLevelPolicy) -> Result<Self, Self::Error> {
        Self::new(raw.levels, raw.success_threshold)
    }
}

/// Stand-in for an empty table, which validation already rejects.
static FALLBACK_LEVEL: LevelConfig = LevelConfig {
    level: 1,
    time_limit_seconds: 10.0,
    questions_per_level: DEFAULT_QUESTIONS_PER_LEVEL,
};

impl Default for LevelPolicy {
    fn default() -> Self {
        let limits = [10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.5, 3.0, 3.0];
        let levels = limits
            .iter()
            .zip(1u32..)
            .map(|(&time_limit_seconds, level)| LevelConfig {
                level,
                time_limit_seconds,
                questions_per_level: DEFAULT_QUESTIONS_PER_LEVEL,
            })
            .collect();
        Self {
            levels,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}

impl LevelPolicy {
    const fn default_threshold() -> f64 {
        DEFAULT_SUCCESS_THRESHOLD
    }

    /// Build a validated policy from an explicit table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, out of order, or carries
    /// non-positive limits, or if the threshold is outside (0, 1].
    pub fn new(levels: Vec<LevelConfig>, success_threshold: f64) -> Result<Self, LevelConfigError> {
        let policy = Self {
            levels,
            success_threshold,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy from JSON such as
    /// `{"levels":[{"level":1,"timeLimitSeconds":10,"questionsPerLevel":10}],"successThreshold":1.0}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the table is invalid.
    pub fn from_json(json: &str) -> Result<Self, crate::GameError> {
        serde_json::from_str(json).map_err(|err| crate::GameError::Config(err.to_string()))
    }

    /// Check the table invariants: levels numbered 1..=N in order, positive
    /// time limits and question counts, threshold in (0, 1].
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), LevelConfigError> {
        if self.levels.is_empty() {
            return Err(LevelConfigError::Empty);
        }
        for (cfg, expected) in self.levels.iter().zip(1u32..) {
            if cfg.level != expected {
                return Err(LevelConfigError::OutOfSequence {
                    expected,
                    found: cfg.level,
                });
            }
            if !(cfg.time_limit_seconds.is_finite() && cfg.time_limit_seconds > 0.0) {
                return Err(LevelConfigError::TimeLimit {
                    level: cfg.level,
                    value: cfg.time_limit_seconds,
                });
            }
            if cfg.questions_per_level == 0 {
                return Err(LevelConfigError::QuestionCount { level: cfg.level });
            }
        }
        if !(self.success_threshold > 0.0 && self.success_threshold <= 1.0) {
            return Err(LevelConfigError::Threshold(self.success_threshold));
        }
        Ok(())
    }

    #[must_use]
    pub fn levels(&self) -> &[LevelConfig] {
        &self.levels
    }

    #[must_use]
    pub const fn success_threshold(&self) -> f64 {
        self.success_threshold
    }

    /// Highest configured level.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        self.levels.last().map_or(1, |cfg| cfg.level)
    }

    #[must_use]
    pub fn contains(&self, level: u32) -> bool {
        self.levels.iter().any(|cfg| cfg.level == level)
    }

    /// Entry for `level`, or the first entry when `level` is out of range.
    #[must_use]
    pub fn level_config(&self, level: u32) -> &LevelConfig {
        self.levels
            .iter()
            .find(|cfg| cfg.level == level)
            .unwrap_or_else(|| {
                log::warn!("level {level} not configured; falling back to level 1");
                self.levels.first().unwrap_or(&FALLBACK_LEVEL)
            })
    }

    /// Score a finished attempt. `passed` compares the raw ratio, not the
    /// rounded percentage; an empty attempt never passes.
    #[must_use]
    pub fn calculate_level_result(&self, correct_count: u32, total_questions: u32) -> LevelResult {
        if total_questions == 0 {
            return LevelResult {
                passed: false,
                percentage: 0,
                correct_count,
                total_questions,
            };
        }
        let ratio = f64::from(correct_count) / f64::from(total_questions);
        LevelResult {
            passed: ratio + FLOAT_EPSILON >= self.success_threshold,
            percentage: round_f64_to_u32(ratio * 100.0),
            correct_count,
            total_questions,
        }
    }

    /// Correct answers needed to pass an attempt of `total_questions`.
    #[must_use]
    pub fn required_correct(&self, total_questions: u32) -> u32 {
        ceil_f64_to_u32(f64::from(total_questions) * self.success_threshold - FLOAT_EPSILON)
    }

    /// Level unlocked by passing `current`; the top level maps to itself.
    #[must_use]
    pub fn next_level(&self, current: u32) -> u32 {
        if current < self.max_level() {
            current + 1
        } else {
            current
        }
    }
}

/// True iff `answer` is the result of `a op b`.
#[must_use]
pub const fn check_answer(a: i32, b: i32, operation: Operation, answer: i32) -> bool {
    operation.apply(a, b) == answer
}

/// Symbol-based variant of [`check_answer`]; any unrecognized symbol is simply wrong.
#[must_use]
pub fn check_symbol_answer(a: i32, b: i32, symbol: char, answer: i32) -> bool {
    Operation::from_symbol(symbol).is_some_and(|op| check_answer(a, b, op, answer))
}
