use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;
use std::convert::TryFrom;
use sumapp_game::constants::UNIVERSE_SIZE;
use sumapp_game::{
    Operation, ProblemKey, ProblemStat, StatBook, WeightTable, all_problems, problem_key, select_questions,
};

const DRAWS_PER_FACT: usize = 200;
const TOLERANCE: f64 = 0.01;
/// Far beyond the 99.9th percentile of chi-square with 153 degrees of freedom.
const CHI_SQUARE_LIMIT: f64 = 230.0;

fn counts(draws: &[sumapp_game::Problem]) -> HashMap<ProblemKey, usize> {
    let mut counts = HashMap::new();
    for problem in draws {
        *counts.entry(problem.key()).or_insert(0) += 1;
    }
    counts
}

fn as_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).expect("count fits u32"))
}

#[test]
fn fresh_profile_draws_uniformly_at_every_level() {
    let stats = StatBook::new();
    for level in [1, 5, 10] {
        let sample = UNIVERSE_SIZE * DRAWS_PER_FACT;
        let mut rng = ChaCha20Rng::seed_from_u64(0x5EED + u64::from(level));
        let draws = select_questions(&stats, level, sample, &mut rng);
        let counts = counts(&draws);
        assert_eq!(counts.len(), UNIVERSE_SIZE, "some fact never drawn at level {level}");

        let expected = as_f64(DRAWS_PER_FACT);
        let chi_square: f64 = all_problems()
            .iter()
            .map(|problem| {
                let observed = as_f64(counts.get(&problem.key()).copied().unwrap_or(0));
                (observed - expected).powi(2) / expected
            })
            .sum();
        assert!(
            chi_square < CHI_SQUARE_LIMIT,
            "level {level}: chi-square {chi_square:.1} rejects uniformity"
        );
    }
}

#[test]
fn missed_fact_is_drawn_in_proportion_to_weight() {
    let missed = problem_key(8, 7, Operation::Add);
    let stats: StatBook = std::iter::once((missed.clone(), ProblemStat { correct: 0, wrong: 5 })).collect();
    let table = WeightTable::build(&stats, 1);
    let expected = table.probability(&missed);
    assert!((expected - 60.0 / 1590.0).abs() < 1e-12);

    let sample = 20_000;
    let mut rng = SmallRng::seed_from_u64(0xACED);
    let draws = select_questions(&stats, 1, sample, &mut rng);
    let observed = as_f64(counts(&draws).get(&missed).copied().unwrap_or(0)) / as_f64(sample);
    assert!(
        (observed - expected).abs() <= TOLERANCE,
        "missed fact rate drifted: observed {observed:.4}, expected {expected:.4}"
    );
    let baseline = table.probability(&problem_key(1, 1, Operation::Add));
    assert!(observed > 4.0 * baseline);
}

#[test]
fn higher_levels_weigh_mistakes_more() {
    let missed = problem_key(9, 4, Operation::Sub);
    let stats: StatBook = std::iter::once((missed.clone(), ProblemStat { correct: 2, wrong: 3 })).collect();
    let mut previous = 0;
    for level in 1..=10 {
        let slots = WeightTable::build(&stats, level).slots_for(&missed);
        assert!(slots > previous, "level {level} did not raise the weight");
        previous = slots;
    }
}
