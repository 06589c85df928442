use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::BalanceMode;
use crate::model::{RegimeLayout, VariableLayout};
use crate::params::ModelParameters;
use crate::solver::RawOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Optimal,
    FeasibleSuboptimal,
    Infeasible,
    Unbounded,
    Error,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::FeasibleSuboptimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::FeasibleSuboptimal => "feasible (not proven optimal)",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Outcome of one solve, shaped like the input: rows follow plant and
/// client order, columns follow day order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub status: SolveStatus,
    /// Net profit of the returned plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<i64>,
    /// Plant names, one per `production` row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<Vec<Vec<u64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered: Option<Vec<Vec<u64>>>,
    /// Days on which the regime plant ran at its high-regime ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_regime_days: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub solver: String,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl SolveResult {
    pub fn without_solution(status: SolveStatus, message: Option<String>) -> Self {
        SolveResult {
            status,
            objective: None,
            plants: None,
            production: None,
            delivered: None,
            high_regime_days: None,
            message,
            solver: String::new(),
            elapsed_ms: 0,
        }
    }

    /// Every rule of the model that the returned plan breaks. Empty for a
    /// sound plan, and for results without a plan.
    pub fn violations(&self, params: &ModelParameters, balance: BalanceMode) -> Vec<Violation> {
        let (Some(production), Some(delivered)) = (&self.production, &self.delivered) else {
            return Vec::new();
        };
        let days = params.day_count();
        let shaped =
            |m: &Vec<Vec<u64>>, rows| m.len() == rows && m.iter().all(|r| r.len() == days);
        if !shaped(production, params.plant_count()) || !shaped(delivered, params.client_count())
        {
            return vec![Violation::Shape];
        }
        let high_regime = self
            .high_regime_days
            .clone()
            .unwrap_or_else(|| vec![false; days]);

        let mut violations = Vec::new();

        let used = high_regime.iter().filter(|&&h| h).count();
        if used > params.high_regime_days_allowed() {
            violations.push(Violation::RegimeDays {
                used,
                allowed: params.high_regime_days_allowed(),
            });
        }

        for (plant, row) in production.iter().enumerate() {
            for (day, &produced) in row.iter().enumerate() {
                let high = high_regime.get(day).copied().unwrap_or(false);
                let ceiling = params.ceiling(plant, high);
                if produced > ceiling {
                    violations.push(Violation::Capacity {
                        plant,
                        day,
                        produced,
                        ceiling,
                    });
                }
            }
        }

        for (client, row) in delivered.iter().enumerate() {
            for (day, &amount) in row.iter().enumerate() {
                let demand = params.demand()[client][day];
                let floor = params.service_floor(client, day);
                if amount > demand {
                    violations.push(Violation::OverDelivery {
                        client,
                        day,
                        delivered: amount,
                        demand,
                    });
                }
                if amount < floor {
                    violations.push(Violation::UnderService {
                        client,
                        day,
                        delivered: amount,
                        floor,
                    });
                }
            }
        }

        for day in 0..days {
            let produced: u64 = production.iter().map(|row| row[day]).sum();
            let sold: u64 = delivered.iter().map(|row| row[day]).sum();
            let balanced = match balance {
                BalanceMode::Exact => produced == sold,
                BalanceMode::AllowSurplus => produced >= sold,
            };
            if !balanced {
                violations.push(Violation::Imbalance {
                    day,
                    produced,
                    delivered: sold,
                });
            }
        }

        violations
    }
}

/// A rule broken by a returned plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Shape,
    Capacity {
        plant: usize,
        day: usize,
        produced: u64,
        ceiling: u64,
    },
    RegimeDays {
        used: usize,
        allowed: usize,
    },
    OverDelivery {
        client: usize,
        day: usize,
        delivered: u64,
        demand: u64,
    },
    UnderService {
        client: usize,
        day: usize,
        delivered: u64,
        floor: u64,
    },
    Imbalance {
        day: usize,
        produced: u64,
        delivered: u64,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Shape => write!(f, "result matrices do not match the instance shape"),
            Violation::Capacity {
                plant,
                day,
                produced,
                ceiling,
            } => write!(
                f,
                "plant {plant} produced {produced} on day {day}, above its ceiling of {ceiling}"
            ),
            Violation::RegimeDays { used, allowed } => {
                write!(f, "{used} high-regime days used, {allowed} allowed")
            }
            Violation::OverDelivery {
                client,
                day,
                delivered,
                demand,
            } => write!(
                f,
                "client {client} received {delivered} on day {day}, above its demand of {demand}"
            ),
            Violation::UnderService {
                client,
                day,
                delivered,
                floor,
            } => write!(
                f,
                "client {client} received {delivered} on day {day}, \
                 below the service floor of {floor}"
            ),
            Violation::Imbalance {
                day,
                produced,
                delivered,
            } => write!(f, "day {day} produced {produced} but delivered {delivered}"),
        }
    }
}

/// Turn a backend's raw outcome into a domain result
pub fn interpret(
    params: &ModelParameters,
    layout: &VariableLayout,
    outcome: RawOutcome,
) -> SolveResult {
    match outcome {
        RawOutcome::Solved { optimal, values } if values.len() == layout.len() => {
            let production = reshape(layout.plants, layout.days, |p, d| {
                values[layout.production(p, d)]
            });
            let delivered = reshape(layout.clients, layout.days, |c, d| {
                values[layout.delivered(c, d)]
            });
            let high_regime_days = match &layout.regime {
                RegimeLayout::Absent => vec![false; layout.days],
                RegimeLayout::Fixed(days) => days.clone(),
                RegimeLayout::Variables => (0..layout.days)
                    .map(|d| layout.high_regime(d).is_some_and(|i| values[i] > 0.5))
                    .collect(),
            };
            let objective = profit(params, &production, &delivered);
            let status = if optimal {
                SolveStatus::Optimal
            } else {
                SolveStatus::FeasibleSuboptimal
            };

            SolveResult {
                status,
                objective: Some(objective),
                plants: Some(params.plant_names().to_vec()),
                production: Some(production),
                delivered: Some(delivered),
                high_regime_days: Some(high_regime_days),
                ..SolveResult::without_solution(status, None)
            }
        }
        RawOutcome::Solved { values, .. } => SolveResult::without_solution(
            SolveStatus::Error,
            Some(format!(
                "solver returned {} values for {} variables",
                values.len(),
                layout.len()
            )),
        ),
        RawOutcome::Infeasible => SolveResult::without_solution(
            SolveStatus::Infeasible,
            Some("no plan satisfies every constraint".into()),
        ),
        RawOutcome::Unbounded => SolveResult::without_solution(
            SolveStatus::Unbounded,
            Some("the objective is unbounded".into()),
        ),
        RawOutcome::Error(message) => {
            SolveResult::without_solution(SolveStatus::Error, Some(message))
        }
    }
}

fn reshape(rows: usize, days: usize, value: impl Fn(usize, usize) -> f64) -> Vec<Vec<u64>> {
    (0..rows)
        .map(|r| (0..days).map(|d| value(r, d).round().max(0.0) as u64).collect())
        .collect()
}

/// Revenue minus production cost, computed exactly from the rounded plan
pub fn profit(params: &ModelParameters, production: &[Vec<u64>], delivered: &[Vec<u64>]) -> i64 {
    let weighted = |rows: &[Vec<u64>], weights: &[u64]| -> i128 {
        rows.iter()
            .zip(weights)
            .map(|(row, &w)| row.iter().map(|&v| v as i128 * w as i128).sum::<i128>())
            .sum()
    };
    let total = weighted(delivered, params.payment_rate())
        - weighted(production, params.production_cost());
    i64::try_from(total).unwrap_or(if total > 0 { i64::MAX } else { i64::MIN })
}
