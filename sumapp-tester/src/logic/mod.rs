pub mod learner;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use learner::{RoundOutcome, SimulatedLearner, sim_engine};
pub use seeds::resolve_seed_inputs;
pub use tester::*;
