//! The fixed universe of single-digit addition and subtraction facts.
use crate::constants::{DIGIT_MAX, DIGIT_MIN, UNIVERSE_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Arithmetic operation of a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
}

impl Operation {
    /// Symbol used in problem keys and on screen.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
        }
    }

    /// Parse an operation symbol, `None` for anything unrecognized.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            _ => None,
        }
    }

    #[must_use]
    pub const fn apply(self, a: i32, b: i32) -> i32 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Canonical identifier of a fact: `a`, the operation symbol, then `b` (e.g. `7+5`, `9-3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemKey(String);

impl ProblemKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the key back to the fact it names, if it belongs to the universe.
    #[must_use]
    pub fn problem(&self) -> Option<Problem> {
        Problem::from_key(&self.0)
    }
}

impl fmt::Display for ProblemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProblemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single arithmetic fact. Only values from [`all_problems`] are valid facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Problem {
    pub a: u8,
    pub b: u8,
    pub operation: Operation,
}

impl Problem {
    /// Build a fact, returning `None` when it falls outside the universe
    /// (digits above 9, or a subtraction with a negative result or zero minuend).
    #[must_use]
    pub fn new(a: u8, b: u8, operation: Operation) -> Option<Self> {
        let in_range = (DIGIT_MIN..=DIGIT_MAX).contains(&a) && (DIGIT_MIN..=DIGIT_MAX).contains(&b);
        let valid = match operation {
            Operation::Add => in_range,
            Operation::Sub => in_range && a >= 1 && b <= a,
        };
        valid.then_some(Self { a, b, operation })
    }

    #[must_use]
    pub fn key(&self) -> ProblemKey {
        problem_key(self.a, self.b, self.operation)
    }

    #[must_use]
    pub fn answer(&self) -> i32 {
        self.operation.apply(i32::from(self.a), i32::from(self.b))
    }

    /// Parse a canonical key such as `4-2`.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let mut chars = key.chars();
        let a = chars.next()?.to_digit(10)?;
        let operation = Operation::from_symbol(chars.next()?)?;
        let b = chars.next()?.to_digit(10)?;
        if chars.next().is_some() {
            return None;
        }
        Self::new(u8::try_from(a).ok()?, u8::try_from(b).ok()?, operation)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.a, self.operation, self.b)
    }
}

/// Canonical key for `(a, op, b)`. Pure and collision-free over the universe.
#[must_use]
pub fn problem_key(a: u8, b: u8, operation: Operation) -> ProblemKey {
    ProblemKey(format!("{a}{}{b}", operation.symbol()))
}

/// Every valid fact: 100 additions `a + b` for `a, b` in 0..=9, then 54
/// subtractions `a - b` for `a` in 1..=9 and `b` in 0..=a. Order is stable.
#[must_use]
pub fn all_problems() -> &'static [Problem] {
    static UNIVERSE: OnceLock<Vec<Problem>> = OnceLock::new();
    UNIVERSE.get_or_init(build_universe)
}

fn build_universe() -> Vec<Problem> {
    let mut problems = Vec::with_capacity(UNIVERSE_SIZE);
    for a in DIGIT_MIN..=DIGIT_MAX {
        for b in DIGIT_MIN..=DIGIT_MAX {
            problems.push(Problem {
                a,
                b,
                operation: Operation::Add,
            });
        }
    }
    for a in 1..=DIGIT_MAX {
        for b in DIGIT_MIN..=a {
            problems.push(Problem {
                a,
                b,
                operation: Operation::Sub,
            });
        }
    }
    problems
}
