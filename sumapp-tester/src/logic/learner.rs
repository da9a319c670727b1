use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta};
use rand::Rng;
use sumapp_game::constants::{FEEDBACK_DELAY_MS, TICK_INTERVAL_MS};
use sumapp_game::{
    GameEngine, LevelPolicy, LevelResult, ManualClock, MemoryStore, PlayRound, RoundEvent, Tick,
};

pub type SimEngine = GameEngine<MemoryStore, ManualClock>;

/// Fixed start instant so simulated histories are reproducible.
const SIM_EPOCH_SECS: i64 = 1_704_067_200;

/// Fresh in-memory engine on a manual clock.
pub fn sim_engine(policy: &LevelPolicy) -> SimEngine {
    let start = DateTime::from_timestamp(SIM_EPOCH_SECS, 0).unwrap_or_default();
    GameEngine::with_clock(MemoryStore::new(), ManualClock::starting_at(start))
        .with_policy(policy.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Completed(LevelResult),
    Quit { answered: u32, correct: u32 },
}

/// Scripted learner that answers with a fixed accuracy. Half of the misses
/// are wrong answers, the other half are left to time out.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedLearner {
    accuracy: f64,
    quit_after: Option<u32>,
}

impl SimulatedLearner {
    pub const fn perfect() -> Self {
        Self {
            accuracy: 1.0,
            quit_after: None,
        }
    }

    pub const fn with_accuracy(accuracy: f64) -> Self {
        Self {
            accuracy,
            quit_after: None,
        }
    }

    /// Walk away after answering `answers` questions.
    pub const fn quitting_after(mut self, answers: u32) -> Self {
        self.quit_after = Some(answers);
        self
    }

    pub fn play_round<R: Rng>(
        &self,
        engine: &SimEngine,
        profile: &str,
        rng: &mut R,
    ) -> Result<RoundOutcome> {
        let mut round = PlayRound::start(engine, profile, rng)
            .with_context(|| format!("starting round for {profile}"))?;
        loop {
            if self.quit_after.is_some_and(|n| round.answered_count() >= n) {
                round.quit()?;
                return Ok(RoundOutcome::Quit {
                    answered: round.answered_count(),
                    correct: round.correct_count(),
                });
            }
            let expected = round
                .current_question()
                .context("round has no current question")?
                .problem
                .answer();
            if rng.gen_bool(self.accuracy.clamp(0.0, 1.0)) {
                round.submit(expected)?;
            } else if rng.gen_bool(0.5) {
                round.submit(expected + 1)?;
            } else {
                while let Tick::Running(_) = round.tick()? {
                    engine
                        .clock()
                        .advance(TimeDelta::milliseconds(ms(TICK_INTERVAL_MS)));
                }
            }
            engine
                .clock()
                .advance(TimeDelta::milliseconds(ms(FEEDBACK_DELAY_MS)));
            match round.advance(FEEDBACK_DELAY_MS)? {
                Some(RoundEvent::LevelComplete(result)) => {
                    return Ok(RoundOutcome::Completed(result));
                }
                Some(RoundEvent::NextQuestion(number)) => {
                    log::debug!("{profile}: question {number}");
                }
                None => anyhow::bail!("feedback delay did not advance the round"),
            }
        }
    }
}

fn ms(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use sumapp_game::Clock;

    #[test]
    fn perfect_learner_passes_and_moves_clock() {
        let engine = sim_engine(&LevelPolicy::default());
        engine.create("Sim").unwrap();
        let start = engine.clock().now();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let outcome = SimulatedLearner::perfect()
            .play_round(&engine, "Sim", &mut rng)
            .unwrap();
        assert!(matches!(outcome, RoundOutcome::Completed(r) if r.passed));
        assert!(engine.clock().now() > start);
    }

    #[test]
    fn hopeless_learner_times_out_or_misses() {
        let engine = sim_engine(&LevelPolicy::default());
        engine.create("Sim").unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let outcome = SimulatedLearner::with_accuracy(0.0)
            .play_round(&engine, "Sim", &mut rng)
            .unwrap();
        assert!(matches!(outcome, RoundOutcome::Completed(r) if r.correct_count == 0));
        let stats = engine.get_stats("Sim").unwrap();
        assert_eq!(stats.totals().wrong, 10);
    }

    #[test]
    fn quitting_learner_stops_early() {
        let engine = sim_engine(&LevelPolicy::default());
        engine.create("Sim").unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let outcome = SimulatedLearner::perfect()
            .quitting_after(4)
            .play_round(&engine, "Sim", &mut rng)
            .unwrap();
        assert_eq!(outcome, RoundOutcome::Quit { answered: 4, correct: 4 });
    }
}
