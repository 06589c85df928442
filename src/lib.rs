pub mod config;
pub mod dzn;
pub mod error;
pub mod model;
pub mod params;
pub mod result;
pub mod solver;

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

pub use config::{Backend, BalanceMode, RegimeSelection, SolverConfig};
pub use error::{Error, ValidationError, ValidationErrors};
pub use model::{Formulation, ModelOptions};
pub use params::{ModelParameters, ParameterSet};
pub use result::{SolveResult, SolveStatus, Violation};
pub use solver::{RawOutcome, Solver};

/// An instance file: the parameters plus optional solver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub parameters: ParameterSet,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Instance {
    pub fn solve(&self) -> Result<SolveResult, Error> {
        let params = ModelParameters::try_from(self.parameters.clone())?;
        Ok(solve(&params, &self.solver)?)
    }
}

/// Validate the solver settings against `params`, then solve with the
/// configured backend.
pub fn solve(
    params: &ModelParameters,
    config: &SolverConfig,
) -> Result<SolveResult, ValidationErrors> {
    let options = ModelOptions {
        balance: config.balance,
        regime: config.regime_selection(),
    };
    params.check_regime_selection(&options.regime)?;
    let solver = solver::for_config(config);
    Ok(solve_with(params, &options, solver.as_ref()))
}

/// Build the model for `params` and hand it to `solver`
pub fn solve_with(
    params: &ModelParameters,
    options: &ModelOptions,
    solver: &dyn Solver,
) -> SolveResult {
    let formulation = model::formulate(params, options);
    let layout = formulation.layout.clone();

    let started = Instant::now();
    let outcome = solver.solve(formulation);
    let elapsed = started.elapsed();

    let mut result = result::interpret(params, &layout, outcome);
    result.solver = solver.name().to_owned();
    result.elapsed_ms = elapsed.as_millis() as u64;

    info!(
        solver = solver.name(),
        status = %result.status,
        objective = ?result.objective,
        elapsed_ms = result.elapsed_ms,
        "solve finished"
    );
    for violation in result.violations(params, options.balance) {
        warn!(solver = solver.name(), "returned plan breaks a constraint: {violation}");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{read_dir, read_to_string};
    use std::path::Path;

    #[derive(Debug, Deserialize)]
    struct Expected {
        status: SolveStatus,
        objective: Option<i64>,
        #[serde(rename = "highRegimeDays")]
        high_regime_days: Option<Vec<bool>>,
    }

    fn params(set: ParameterSet) -> ModelParameters {
        ModelParameters::try_from(set).unwrap()
    }

    fn single_plant(
        capacity: i64,
        cost: i64,
        demand: i64,
        rate: i64,
        service: i64,
    ) -> ParameterSet {
        ParameterSet {
            day_count: 1,
            client_count: 1,
            plant_capacity: vec![capacity],
            production_cost: vec![cost],
            plant_names: None,
            hydro_plant: None,
            demand: vec![vec![demand]],
            payment_rate: vec![rate],
            high_regime_days_allowed: 0,
            high_regime_percent: 100,
            min_service_percent: service,
            allow_boost: false,
        }
    }

    /// Only the middle plant produces, and it may be boosted to 150 %
    fn boosted_hydro(days_allowed: i64) -> ParameterSet {
        ParameterSet {
            day_count: 1,
            client_count: 1,
            plant_capacity: vec![0, 100, 0],
            production_cost: vec![1, 1, 1],
            plant_names: None,
            hydro_plant: None,
            demand: vec![vec![150]],
            payment_rate: vec![10],
            high_regime_days_allowed: days_allowed,
            high_regime_percent: 150,
            min_service_percent: 50,
            allow_boost: true,
        }
    }

    fn solve_default(params: &ModelParameters) -> SolveResult {
        solve(params, &SolverConfig::default()).unwrap()
    }

    fn assert_sound(result: &SolveResult, params: &ModelParameters, balance: BalanceMode) {
        assert!(result.status.has_solution(), "no plan: {:?}", result.message);
        let violations = result.violations(params, balance);
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn single_plant_serves_full_demand() {
        let params = params(single_plant(100, 10, 50, 20, 50));
        let result = solve_default(&params);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(500));
        assert_eq!(result.production, Some(vec![vec![50]]));
        assert_eq!(result.delivered, Some(vec![vec![50]]));
        assert_eq!(result.solver, "microlp");
        assert_sound(&result, &params, BalanceMode::Exact);
    }

    #[test]
    fn service_floor_above_capacity_is_infeasible() {
        let params = params(single_plant(10, 1, 100, 5, 50));
        let result = solve_default(&params);
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert_eq!(result.production, None);
        assert_eq!(result.delivered, None);
    }

    #[test]
    fn no_high_regime_days_keeps_nominal_ceiling() {
        let params = params(boosted_hydro(0));
        let result = solve_default(&params);
        assert_eq!(result.production, Some(vec![vec![0], vec![100], vec![0]]));
        assert_eq!(result.objective, Some(900));
        assert_eq!(result.high_regime_days, Some(vec![false]));
        assert_sound(&result, &params, BalanceMode::Exact);
    }

    #[test]
    fn high_regime_day_raises_ceiling() {
        let params = params(boosted_hydro(1));
        let result = solve_default(&params);
        assert_eq!(result.production, Some(vec![vec![0], vec![150], vec![0]]));
        assert_eq!(result.objective, Some(1350));
        assert_eq!(result.high_regime_days, Some(vec![true]));
        assert_sound(&result, &params, BalanceMode::Exact);
    }

    #[test]
    fn break_even_rates_give_zero_profit() {
        let params = params(single_plant(50, 20, 50, 20, 100));
        let result = solve_default(&params);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(0));
        assert_eq!(result.delivered, Some(vec![vec![50]]));
    }

    #[test]
    fn higher_rate_never_lowers_profit() {
        let profits: Vec<i64> = [10, 20, 30]
            .into_iter()
            .map(|rate| {
                let params = params(single_plant(100, 20, 60, rate, 50));
                solve_default(&params).objective.unwrap()
            })
            .collect();
        assert_eq!(profits, [-300, 0, 600]);
        assert!(profits.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn reference_instance_runs_hydro_first() {
        let params = ModelParameters::reference();
        let result = solve_default(&params);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(30124));
        assert_eq!(result.delivered, Some(vec![vec![61, 149, 104]; 3]));
        let production = result.production.clone().unwrap();
        assert_eq!(production[1], [183, 300, 300]);
        assert_eq!(
            result.plants,
            Some(vec!["Nuclear".into(), "Hydro".into(), "Thermal".into()])
        );
        assert_sound(&result, &params, BalanceMode::Exact);
    }

    #[test]
    fn time_limited_solve_returns_a_sound_plan_or_reports_the_timeout() {
        let days = 30;
        let clients = 12;
        let set = ParameterSet {
            day_count: days,
            client_count: clients,
            plant_capacity: vec![900, 700, 1200],
            production_cost: vec![11, 7, 17],
            plant_names: None,
            hydro_plant: Some(1),
            demand: (0..clients)
                .map(|c| (0..days).map(|d| 40 + (c * 37 + d * 53) % 160).collect())
                .collect(),
            payment_rate: (0..clients).map(|c| 12 + (c * 7) % 20).collect(),
            high_regime_days_allowed: 9,
            high_regime_percent: 170,
            min_service_percent: 35,
            allow_boost: true,
        };
        let params = params(set);
        let config = SolverConfig {
            time_limit: Some(0.05),
            ..SolverConfig::default()
        };
        let result = solve(&params, &config).unwrap();
        match result.status {
            SolveStatus::Optimal | SolveStatus::FeasibleSuboptimal => {
                assert_sound(&result, &params, BalanceMode::Exact)
            }
            SolveStatus::Error => {
                let message = result.message.unwrap_or_default();
                assert!(message.contains("Time limit"), "{message}");
            }
            other => panic!("unexpected status {other}"),
        }
    }

    #[test]
    fn fixed_high_regime_day_is_honored() {
        let params = ModelParameters::reference();
        let config = SolverConfig {
            high_regime_days: Some(vec![1]),
            ..SolverConfig::default()
        };
        let result = solve(&params, &config).unwrap();
        assert_eq!(result.objective, Some(29524));
        assert_eq!(result.high_regime_days, Some(vec![false, true, false]));
        assert_eq!(result.production.as_ref().unwrap()[1][1], 240);
        assert_sound(&result, &params, BalanceMode::Exact);
    }

    #[test]
    fn invalid_fixed_days_are_rejected_before_solving() {
        let params = ModelParameters::reference();
        let config = SolverConfig {
            high_regime_days: Some(vec![0, 1]),
            ..SolverConfig::default()
        };
        let errors = solve(&params, &config).unwrap_err();
        assert!(errors.has_field("highRegimeDays"));
    }

    #[test]
    fn surplus_mode_matches_exact_when_production_costs() {
        let params = ModelParameters::reference();
        let config = SolverConfig {
            balance: BalanceMode::AllowSurplus,
            ..SolverConfig::default()
        };
        let result = solve(&params, &config).unwrap();
        assert_eq!(result.objective, Some(30124));
        assert_sound(&result, &params, BalanceMode::AllowSurplus);
    }

    #[test]
    fn any_solver_can_be_plugged_in() {
        struct Broken;

        impl Solver for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }

            fn solve(&self, _formulation: Formulation) -> RawOutcome {
                RawOutcome::Error("license expired".into())
            }
        }

        let params = ModelParameters::reference();
        let result = solve_with(&params, &ModelOptions::default(), &Broken);
        assert_eq!(result.status, SolveStatus::Error);
        assert_eq!(result.message.as_deref(), Some("license expired"));
        assert_eq!(result.solver, "broken");
        assert_eq!(result.objective, None);
    }

    #[test]
    fn invalid_instance_reports_validation_error() {
        let mut set = single_plant(100, 10, 50, 20, 50);
        set.client_count = 2;
        let instance = Instance {
            parameters: set,
            solver: SolverConfig::default(),
        };
        assert!(matches!(
            instance.solve(),
            Err(Error::Validation(errors)) if errors.has_field("demand")
        ));
    }

    // Helper function to run a test from a test file
    fn run_test_file(test_file: &Path) {
        println!("Running test for file: {:?}", test_file);

        let failure_message = format!("Failed to read test file: {}", test_file.display());
        let yaml_content = read_to_string(test_file).expect(&failure_message);

        // Split the file content at the "expected:" marker to separate input
        // and expected outcome
        let parts: Vec<&str> = yaml_content.split("expected:").collect();

        let failure_message = format!("Failed to parse input YAML: {}", test_file.display());
        let input_yaml = parts.first().expect("No input found in test file").trim();
        let instance: Instance = serde_yaml::from_str(input_yaml).expect(&failure_message);

        let failure_message = format!("Failed to parse expected YAML: {}", test_file.display());
        let expected_yaml = parts.get(1).expect(&failure_message);
        let expected: Expected = serde_yaml::from_str(expected_yaml).expect(&failure_message);

        let failure_message = format!("Failed to solve test file: {}", test_file.display());
        let result = instance.solve().expect(&failure_message);
        println!("received: {}", serde_yaml::to_string(&result).unwrap());

        assert_eq!(expected.status, result.status, "{}", test_file.display());
        assert_eq!(expected.objective, result.objective, "{}", test_file.display());
        if let Some(days) = expected.high_regime_days {
            assert_eq!(Some(days), result.high_regime_days, "{}", test_file.display());
        }

        let params = ModelParameters::try_from(instance.parameters.clone()).unwrap();
        let violations = result.violations(&params, instance.solver.balance);
        assert!(violations.is_empty(), "{}: {:?}", test_file.display(), violations);
    }

    #[test]
    fn run_all_test_files() {
        let test_data_dir = Path::new("test_data");
        let mut entries: Vec<_> = read_dir(test_data_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == "yaml").unwrap_or(false)
            })
            .collect();

        // Sort paths lexically by filename
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in entries {
            run_test_file(&path);
        }
    }
}
