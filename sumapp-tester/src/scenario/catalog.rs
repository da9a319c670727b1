use anyhow::{Context, Result, ensure};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;
use sumapp_game::constants::UNIVERSE_SIZE;
use sumapp_game::{
    ProblemKey, ProblemStat, StatBook, WeightTable, all_problems, select_questions,
};

use super::{ScenarioCtx, TestScenario};
use crate::logic::{RoundOutcome, SimulatedLearner, sim_engine};

const LEARNER: &str = "Sim";
const DRAWS_PER_FACT: usize = 100;
/// Far beyond the 99.9th percentile of chi-square with 153 degrees of freedom.
const CHI_SQUARE_LIMIT: f64 = 230.0;
const BIAS_SAMPLE: usize = 20_000;
const BIAS_TOLERANCE: f64 = 0.01;
const STRUGGLING_ACCURACY: f64 = 0.7;
const STRUGGLING_ROUNDS: usize = 15;

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario {
            name: "smoke",
            description: "Create a profile, play one perfect quiz, level advances",
            run: smoke,
        },
        TestScenario {
            name: "uniform-selection",
            description: "A fresh profile draws uniformly over the fact universe",
            run: uniform_selection,
        },
        TestScenario {
            name: "adaptive-bias",
            description: "A heavily missed fact is drawn far more often than baseline",
            run: adaptive_bias,
        },
        TestScenario {
            name: "perfect-learner",
            description: "A flawless learner reaches the top level in levels - 1 passes",
            run: perfect_learner,
        },
        TestScenario {
            name: "struggling-learner",
            description: "A 70% learner only advances on passes and its counters only grow",
            run: struggling_learner,
        },
        TestScenario {
            name: "quit-midway",
            description: "Quitting closes the quiz as failed and ends the session",
            run: quit_midway,
        },
    ]
}

fn as_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

fn level_for_seed(ctx: &ScenarioCtx<'_>) -> u32 {
    let max = u64::from(ctx.policy.max_level());
    u32::try_from(ctx.seed % max).unwrap_or(0) + 1
}

fn smoke(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = sim_engine(ctx.policy);
    engine.create(LEARNER)?;
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let outcome = SimulatedLearner::perfect().play_round(&engine, LEARNER, &mut rng)?;
    ensure!(
        matches!(outcome, RoundOutcome::Completed(result) if result.passed),
        "perfect round did not pass: {outcome:?}"
    );

    let profile = engine.profile(LEARNER)?;
    let expected_level = ctx.policy.next_level(1);
    ensure!(
        profile.level() == expected_level,
        "level {} after a pass, expected {expected_level}",
        profile.level()
    );
    ensure!(profile.open_quiz().is_none(), "quiz left open");
    ensure!(profile.open_session().is_none(), "session left open after a pass");
    let answered = profile.stats().totals().attempts();
    let asked = ctx.policy.level_config(1).questions_per_level;
    ensure!(answered == asked, "recorded {answered} answers for {asked} questions");
    Ok(())
}

fn uniform_selection(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let level = level_for_seed(ctx);
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let draws = select_questions(&StatBook::new(), level, UNIVERSE_SIZE * DRAWS_PER_FACT, &mut rng);

    let mut counts: HashMap<ProblemKey, usize> = HashMap::new();
    for problem in &draws {
        *counts.entry(problem.key()).or_insert(0) += 1;
    }
    let expected = as_f64(DRAWS_PER_FACT);
    let chi_square: f64 = all_problems()
        .iter()
        .map(|problem| {
            let observed = as_f64(counts.get(&problem.key()).copied().unwrap_or(0));
            (observed - expected).powi(2) / expected
        })
        .sum();
    if ctx.verbose {
        println!("     level {level}: chi-square {chi_square:.1}");
    }
    ensure!(
        chi_square < CHI_SQUARE_LIMIT,
        "level {level}: chi-square {chi_square:.1} rejects uniformity"
    );
    Ok(())
}

fn adaptive_bias(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let problems = all_problems();
    let index = usize::try_from(ctx.seed % as_u64(problems.len())).unwrap_or(0);
    let missed = problems
        .get(index)
        .context("seed picked a fact outside the universe")?
        .key();
    let stats: StatBook =
        std::iter::once((missed.clone(), ProblemStat { correct: 1, wrong: 5 })).collect();
    let level = level_for_seed(ctx);
    let table = WeightTable::build(&stats, level);
    let expected = table.probability(&missed);

    let mut rng = SmallRng::seed_from_u64(ctx.seed);
    let hits = select_questions(&stats, level, BIAS_SAMPLE, &mut rng)
        .iter()
        .filter(|problem| problem.key() == missed)
        .count();
    let observed = as_f64(hits) / as_f64(BIAS_SAMPLE);
    let baseline = 1.0 / as_f64(UNIVERSE_SIZE);
    ensure!(
        (observed - expected).abs() <= BIAS_TOLERANCE,
        "{missed} drawn at {observed:.4}, expected {expected:.4}"
    );
    ensure!(
        observed > 4.0 * baseline,
        "{missed} drawn at {observed:.4}, barely above baseline {baseline:.4}"
    );
    Ok(())
}

fn as_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

fn perfect_learner(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = sim_engine(ctx.policy);
    engine.create(LEARNER)?;
    let max = ctx.policy.max_level();
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let mut rounds = 0u32;
    while engine.profile(LEARNER)?.level() < max {
        ensure!(rounds < max, "still below level {max} after {rounds} rounds");
        SimulatedLearner::perfect().play_round(&engine, LEARNER, &mut rng)?;
        rounds += 1;
    }
    ensure!(
        rounds == max - 1,
        "reached level {max} in {rounds} passes, expected {}",
        max - 1
    );
    let profile = engine.profile(LEARNER)?;
    ensure!(
        profile.quizzes().iter().all(|quiz| quiz.passed),
        "a perfect learner failed a quiz"
    );
    ensure!(profile.stats().totals().wrong == 0, "a perfect learner recorded a miss");
    Ok(())
}

fn struggling_learner(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = sim_engine(ctx.policy);
    engine.create(LEARNER)?;
    let max = ctx.policy.max_level();
    let learner = SimulatedLearner::with_accuracy(STRUGGLING_ACCURACY);
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let mut previous = engine.profile(LEARNER)?;

    for round in 1..=STRUGGLING_ROUNDS {
        learner.play_round(&engine, LEARNER, &mut rng)?;
        let profile = engine.profile(LEARNER)?;

        ensure!(
            profile.level() >= previous.level(),
            "round {round}: level fell from {} to {}",
            previous.level(),
            profile.level()
        );
        let passes_below_cap = profile
            .quizzes()
            .iter()
            .filter(|quiz| quiz.passed && quiz.level < max)
            .count();
        ensure!(
            profile.level() == 1 + u32::try_from(passes_below_cap).unwrap_or(u32::MAX),
            "round {round}: level {} does not match {passes_below_cap} passes",
            profile.level()
        );
        for (key, before) in previous.stats().iter() {
            let now = profile.stats().get_or_default(key);
            ensure!(
                now.correct >= before.correct && now.wrong >= before.wrong,
                "round {round}: counters for {key} shrank"
            );
        }
        ensure!(profile.open_quiz().is_none(), "round {round}: quiz left open");
        ensure!(
            profile.sessions().iter().filter(|s| s.is_open()).count() <= 1,
            "round {round}: more than one open session"
        );
        previous = profile;
    }
    Ok(())
}

fn quit_midway(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = sim_engine(ctx.policy);
    engine.create(LEARNER)?;
    let asked = ctx.policy.level_config(1).questions_per_level;
    let stop_after = u32::try_from(ctx.seed % u64::from(asked)).unwrap_or(0);
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let outcome = SimulatedLearner::perfect()
        .quitting_after(stop_after)
        .play_round(&engine, LEARNER, &mut rng)?;
    ensure!(
        outcome
            == RoundOutcome::Quit {
                answered: stop_after,
                correct: stop_after
            },
        "unexpected outcome {outcome:?}"
    );

    let profile = engine.profile(LEARNER)?;
    let quiz = profile.quizzes().last().context("no quiz recorded")?;
    ensure!(!quiz.is_open(), "quiz still open after quitting");
    ensure!(!quiz.passed, "abandoned quiz marked passed");
    ensure!(
        quiz.correct_count == stop_after && quiz.total_questions == stop_after,
        "partial score {}/{}, expected {stop_after}/{stop_after}",
        quiz.correct_count,
        quiz.total_questions
    );
    ensure!(profile.open_session().is_none(), "session still open after quitting");
    ensure!(profile.level() == 1, "quitting changed the level");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumapp_game::LevelPolicy;

    fn run(name: &str, seed: u64) -> Result<()> {
        let policy = LevelPolicy::default();
        let ctx = ScenarioCtx {
            seed,
            policy: &policy,
            verbose: false,
        };
        let scenario = catalog_scenarios()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap();
        (scenario.run)(&ctx)
    }

    #[test]
    fn every_scenario_passes_on_default_policy() {
        for scenario in catalog_scenarios() {
            for seed in [1, 1337] {
                run(scenario.name, seed)
                    .unwrap_or_else(|err| panic!("{} seed {seed}: {err:#}", scenario.name));
            }
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = catalog_scenarios().iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
