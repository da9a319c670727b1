//! Reference tuning values for sumapp game logic.
//!
//! These define the deterministic math of the drill engine. Keeping them
//! together means gameplay can only be adjusted via reviewed code changes;
//! the level table itself is configuration and lives in [`crate::levels`].

// Storage ------------------------------------------------------------------
/// Key under which the whole game document is persisted.
pub const STORAGE_KEY: &str = "sumappGame";
/// Reserved profile name for the administrative view (matched case-insensitively).
pub const ADMIN_PROFILE: &str = "admin";

// Problem universe ---------------------------------------------------------
pub const DIGIT_MIN: u8 = 0;
pub const DIGIT_MAX: u8 = 9;
pub const ADDITION_FACTS: usize = 100;
pub const SUBTRACTION_FACTS: usize = 54;
pub const UNIVERSE_SIZE: usize = ADDITION_FACTS + SUBTRACTION_FACTS;

// Selection ----------------------------------------------------------------
/// Base sampling weight for every fact, attempted or not.
pub const BASE_WEIGHT: f64 = 1.0;
/// Difficulty factor gained per level above the first.
pub const DIFFICULTY_STEP: f64 = 0.1;
/// Slots per unit of weight when weights are discretized for sampling.
pub const POOL_RESOLUTION: f64 = 10.0;

// Levels -------------------------------------------------------------------
pub const DEFAULT_QUESTIONS_PER_LEVEL: u32 = 10;
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 1.0;

// Timing -------------------------------------------------------------------
pub const TICK_INTERVAL_MS: u64 = 100;
pub const FEEDBACK_DELAY_MS: u64 = 1_000;
/// Remaining time at or below which the countdown is flagged as urgent.
pub const TIMER_WARNING_SECS: f64 = 2.0;

pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
