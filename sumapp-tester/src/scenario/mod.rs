use anyhow::Result;
use sumapp_game::LevelPolicy;

pub mod catalog;

/// Everything a scenario iteration needs.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioCtx<'a> {
    pub seed: u64,
    pub policy: &'a LevelPolicy,
    pub verbose: bool,
}

// Logic test scenario
#[derive(Debug, Clone, Copy)]
pub struct TestScenario {
    pub name: &'static str,
    pub description: &'static str,
    pub run: fn(&ScenarioCtx<'_>) -> Result<()>,
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog::catalog_scenarios()
        .into_iter()
        .map(|scenario| (scenario.name, scenario.description))
        .collect()
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let wanted = name.to_lowercase();
    catalog::catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.name == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(get_scenario("SMOKE").is_some());
        assert!(get_scenario("nonexistent").is_none());
        assert_eq!(list_scenarios().len(), 6);
    }
}
