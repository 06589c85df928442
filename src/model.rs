//! Builds the mixed-integer program for one instance: decision variables,
//! constraints and the profit objective.

use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable, variables};
use tracing::debug;

use crate::config::{BalanceMode, RegimeSelection};
use crate::params::ModelParameters;

/// Modelling choices that are not part of the instance itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOptions {
    pub balance: BalanceMode,
    pub regime: RegimeSelection,
}

/// How the regime plant's high-regime days are represented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegimeLayout {
    /// No plant is subject to the high-regime rule
    Absent,
    /// One binary variable per day
    Variables,
    /// Days chosen up front
    Fixed(Vec<bool>),
}

/// Position of every decision variable in the flat assignment vector.
///
/// Production comes first (plant-major), then deliveries (client-major),
/// then one regime indicator per day when those are optimized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableLayout {
    pub plants: usize,
    pub clients: usize,
    pub days: usize,
    pub regime: RegimeLayout,
}

impl VariableLayout {
    pub fn production(&self, plant: usize, day: usize) -> usize {
        plant * self.days + day
    }

    pub fn delivered(&self, client: usize, day: usize) -> usize {
        (self.plants + client) * self.days + day
    }

    pub fn high_regime(&self, day: usize) -> Option<usize> {
        match self.regime {
            RegimeLayout::Variables => Some((self.plants + self.clients) * self.days + day),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        let regime = match self.regime {
            RegimeLayout::Variables => self.days,
            _ => 0,
        };
        (self.plants + self.clients) * self.days + regime
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a backend needs to solve one instance. The objective is
/// always maximised.
pub struct Formulation {
    pub variables: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
    /// Decision variables in layout order
    pub decisions: Vec<Variable>,
    pub layout: VariableLayout,
}

/// Per-day variable handles, indexed `[row][day]`
type Grid = Vec<Vec<Variable>>;

pub fn formulate(params: &ModelParameters, options: &ModelOptions) -> Formulation {
    let layout = VariableLayout {
        plants: params.plant_count(),
        clients: params.client_count(),
        days: params.day_count(),
        regime: match (&options.regime, params.hydro_plant()) {
            (_, None) => RegimeLayout::Absent,
            (RegimeSelection::Optimized, Some(_)) => RegimeLayout::Variables,
            (RegimeSelection::Fixed(days), Some(_)) => RegimeLayout::Fixed(
                (0..params.day_count()).map(|d| days.contains(&d)).collect(),
            ),
        },
    };

    let (variables, production, delivered, high_regime, decisions) = init_variables(&layout);

    let objective = create_objective_function(params, &production, &delivered);

    let constraints = Vec::new();
    let constraints =
        constrain_plant_capacities(constraints, params, &layout, &production, &high_regime);
    let constraints = constrain_high_regime_days(constraints, params, &high_regime);
    let constraints = constrain_deliveries(constraints, params, &delivered);
    let constraints =
        constrain_daily_balance(constraints, options.balance, &production, &delivered);

    debug!(
        variables = decisions.len(),
        constraints = constraints.len(),
        regime = ?layout.regime,
        "formulated dispatch model"
    );

    Formulation {
        variables,
        objective,
        constraints,
        decisions,
        layout,
    }
}

fn init_variables(
    layout: &VariableLayout,
) -> (ProblemVariables, Grid, Grid, Vec<Variable>, Vec<Variable>) {
    let mut problem_vars = variables!();
    let mut decisions = Vec::with_capacity(layout.len());

    let production: Grid = (0..layout.plants)
        .map(|plant| {
            (0..layout.days)
                .map(|day| {
                    let name = format!("production_{plant}_{day}");
                    let v = problem_vars.add(variable().integer().min(0).name(name));
                    decisions.push(v);
                    v
                })
                .collect()
        })
        .collect();

    let delivered: Grid = (0..layout.clients)
        .map(|client| {
            (0..layout.days)
                .map(|day| {
                    let name = format!("delivered_{client}_{day}");
                    let v = problem_vars.add(variable().integer().min(0).name(name));
                    decisions.push(v);
                    v
                })
                .collect()
        })
        .collect();

    let high_regime: Vec<Variable> = match layout.regime {
        RegimeLayout::Variables => (0..layout.days)
            .map(|day| {
                let name = format!("high_regime_{day}");
                let v = problem_vars.add(variable().binary().name(name));
                decisions.push(v);
                v
            })
            .collect(),
        _ => Vec::new(),
    };

    (problem_vars, production, delivered, high_regime, decisions)
}

/// Net profit: revenue from every delivered unit minus the cost of every
/// produced unit
fn create_objective_function(
    params: &ModelParameters,
    production: &Grid,
    delivered: &Grid,
) -> Expression {
    let revenue = delivered
        .iter()
        .zip(params.payment_rate())
        .fold(Expression::from(0.0), |sum, (row, &rate)| {
            row.iter().fold(sum, |sum, &v| sum + v * rate as f64)
        });

    production
        .iter()
        .zip(params.production_cost())
        .fold(revenue, |sum, (row, &cost)| {
            row.iter().fold(sum, |sum, &v| sum - v * cost as f64)
        })
}

/// Every plant stays under its ceiling. The regime plant's ceiling moves to
/// the high-regime level on days whose indicator is set.
fn constrain_plant_capacities(
    constraints: Vec<Constraint>,
    params: &ModelParameters,
    layout: &VariableLayout,
    production: &Grid,
    high_regime: &[Variable],
) -> Vec<Constraint> {
    production.iter().enumerate().fold(constraints, |cs, (plant, row)| {
        row.iter().enumerate().fold(cs, |mut cs, (day, &v)| {
            let nominal = params.plant_capacity()[plant] as f64;
            let is_regime_plant = params.hydro_plant() == Some(plant);
            let c = match &layout.regime {
                RegimeLayout::Variables if is_regime_plant => {
                    let high = params.ceiling(plant, true) as f64;
                    constraint!(v <= high_regime[day] * (high - nominal) + nominal)
                }
                RegimeLayout::Fixed(days) if is_regime_plant => {
                    constraint!(v <= params.ceiling(plant, days[day]) as f64)
                }
                _ => constraint!(v <= nominal),
            };
            cs.push(c);
            cs
        })
    })
}

fn constrain_high_regime_days(
    mut constraints: Vec<Constraint>,
    params: &ModelParameters,
    high_regime: &[Variable],
) -> Vec<Constraint> {
    if high_regime.is_empty() {
        return constraints;
    }
    let used = high_regime
        .iter()
        .fold(Expression::from(0.0), |sum, &v| sum + v);
    constraints.push(used.leq(params.high_regime_days_allowed() as f64));
    constraints
}

/// Deliveries lie between the guaranteed service floor and the demand
fn constrain_deliveries(
    constraints: Vec<Constraint>,
    params: &ModelParameters,
    delivered: &Grid,
) -> Vec<Constraint> {
    delivered.iter().enumerate().fold(constraints, |cs, (client, row)| {
        row.iter().enumerate().fold(cs, |mut cs, (day, &v)| {
            let demand = params.demand()[client][day] as f64;
            let floor = params.service_floor(client, day) as f64;
            cs.push(constraint!(v <= demand));
            cs.push(constraint!(v >= floor));
            cs
        })
    })
}

fn constrain_daily_balance(
    constraints: Vec<Constraint>,
    balance: BalanceMode,
    production: &Grid,
    delivered: &Grid,
) -> Vec<Constraint> {
    let days = production.first().map_or(0, Vec::len);
    (0..days).fold(constraints, |mut cs, day| {
        let supply = production
            .iter()
            .fold(Expression::from(0.0), |sum, row| sum + row[day]);
        let sold = delivered
            .iter()
            .fold(Expression::from(0.0), |sum, row| sum + row[day]);
        cs.push(match balance {
            BalanceMode::Exact => supply.eq(sold),
            BalanceMode::AllowSurplus => constraint!(supply >= sold),
        });
        cs
    })
}
