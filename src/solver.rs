//! Solver backends. Anything implementing [`Solver`] can solve a
//! [`Formulation`]; the rest of the crate never names a backend directly.

use good_lp::solvers::microlp::microlp;
use good_lp::{
    Constraint, ResolutionError, Solution as LpSolution, SolutionStatus, SolverModel, Variable,
    WithTimeLimit,
};
use std::time::Duration;
use tracing::debug;

use crate::config::{Backend, SolverConfig};
use crate::model::Formulation;

/// What a backend reports for one formulation
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// A feasible point, with one value per decision variable in layout order
    Solved { optimal: bool, values: Vec<f64> },
    Infeasible,
    Unbounded,
    Error(String),
}

pub trait Solver {
    fn name(&self) -> &'static str;

    fn solve(&self, formulation: Formulation) -> RawOutcome;
}

/// Pure-Rust branch and bound from the `microlp` crate. When the time
/// limit stops the search, the best plan found so far is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLp {
    pub time_limit: Option<Duration>,
}

impl Solver for MicroLp {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, formulation: Formulation) -> RawOutcome {
        let Formulation {
            variables,
            objective,
            constraints,
            decisions,
            ..
        } = formulation;
        let mut model = variables.maximise(objective).using(microlp);
        if let Some(limit) = self.time_limit {
            model = model.with_time_limit(limit.as_secs_f64());
        }
        match with_constraints(model, constraints).solve() {
            Ok(solution) => collect_values(&solution, &decisions),
            Err(err) => from_resolution_error(err),
        }
    }
}

/// COIN-OR CBC
#[derive(Debug, Clone, Copy, Default)]
pub struct Cbc {
    pub time_limit: Option<Duration>,
}

impl Solver for Cbc {
    fn name(&self) -> &'static str {
        "cbc"
    }

    #[cfg(feature = "cbc")]
    fn solve(&self, formulation: Formulation) -> RawOutcome {
        use good_lp::solvers::coin_cbc::coin_cbc;

        let Formulation {
            variables,
            objective,
            constraints,
            decisions,
            ..
        } = formulation;
        let mut model = variables.maximise(objective).using(coin_cbc);
        #[cfg(not(debug_assertions))]
        model.set_parameter("loglevel", "0");
        if let Some(limit) = self.time_limit {
            model = model.with_time_limit(limit.as_secs_f64());
        }
        match with_constraints(model, constraints).solve() {
            Ok(solution) => collect_values(&solution, &decisions),
            Err(err) => from_resolution_error(err),
        }
    }

    #[cfg(not(feature = "cbc"))]
    fn solve(&self, _formulation: Formulation) -> RawOutcome {
        RawOutcome::Error(
            "the cbc backend is not compiled in; rebuild with `--features cbc`".into(),
        )
    }
}

/// Pick the backend a configuration asks for
pub fn for_config(config: &SolverConfig) -> Box<dyn Solver + Send + Sync> {
    let time_limit = config.time_limit();
    debug!(backend = %config.backend, ?time_limit, "selecting solver");
    match config.backend {
        Backend::MicroLp => Box::new(MicroLp { time_limit }),
        Backend::Cbc => Box::new(Cbc { time_limit }),
    }
}

fn with_constraints<Model: SolverModel>(model: Model, constraints: Vec<Constraint>) -> Model {
    constraints.into_iter().fold(model, |m, c| m.with(c))
}

/// Read every decision variable. Anything short of a proven optimum (time or
/// gap limit reached) keeps its plan but is reported as suboptimal.
fn collect_values(solution: &impl LpSolution, decisions: &[Variable]) -> RawOutcome {
    RawOutcome::Solved {
        optimal: matches!(solution.status(), SolutionStatus::Optimal),
        values: decisions.iter().map(|&v| solution.value(v)).collect(),
    }
}

fn from_resolution_error(err: ResolutionError) -> RawOutcome {
    match err {
        ResolutionError::Infeasible => RawOutcome::Infeasible,
        ResolutionError::Unbounded => RawOutcome::Unbounded,
        other => RawOutcome::Error(other.to_string()),
    }
}
