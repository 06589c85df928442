//! Instance parameters: the raw, deserializable form and its validated counterpart.

use serde::{Deserialize, Serialize};

use crate::config::RegimeSelection;
use crate::error::{ValidationError, ValidationErrors};

/// Largest capacity, cost, demand or rate accepted. Keeps every product the
/// model forms exactly representable as `f64`.
pub const MAX_VALUE: i64 = 1_000_000_000;

/// Highest `highRegimePercent` accepted when boosting is allowed
pub const MAX_BOOST_PERCENT: i64 = 1000;

const REFERENCE_PLANT_NAMES: [&str; 3] = ["Nuclear", "Hydro", "Thermal"];

/// Parameters as supplied by a caller, before any validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSet {
    pub day_count: i64,
    pub client_count: i64,
    pub plant_capacity: Vec<i64>,
    pub production_cost: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_names: Option<Vec<String>>,
    /// Index of the plant subject to the high-regime rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydro_plant: Option<usize>,
    /// One row per client, one column per day
    pub demand: Vec<Vec<i64>>,
    pub payment_rate: Vec<i64>,
    pub high_regime_days_allowed: i64,
    pub high_regime_percent: i64,
    pub min_service_percent: i64,
    /// Permit `highRegimePercent` above 100
    #[serde(default)]
    pub allow_boost: bool,
}

/// A validated, immutable problem instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelParameters {
    day_count: usize,
    client_count: usize,
    plant_names: Vec<String>,
    plant_capacity: Vec<u64>,
    production_cost: Vec<u64>,
    hydro_plant: Option<usize>,
    demand: Vec<Vec<u64>>,
    payment_rate: Vec<u64>,
    high_regime_days_allowed: usize,
    high_regime_percent: u64,
    min_service_percent: u64,
}

impl ModelParameters {
    /// The instance the planner ships with: three plants, three clients, three days.
    pub fn reference() -> Self {
        let set = ParameterSet {
            day_count: 3,
            client_count: 3,
            plant_capacity: vec![1000, 300, 500],
            production_cost: vec![23, 13, 31],
            plant_names: None,
            hydro_plant: None,
            demand: vec![vec![61, 149, 104]; 3],
            payment_rate: vec![40, 55, 45],
            high_regime_days_allowed: 1,
            high_regime_percent: 80,
            min_service_percent: 50,
            allow_boost: false,
        };
        Self::try_from(set).expect("reference parameters are valid")
    }

    pub fn day_count(&self) -> usize {
        self.day_count
    }

    pub fn client_count(&self) -> usize {
        self.client_count
    }

    pub fn plant_count(&self) -> usize {
        self.plant_capacity.len()
    }

    pub fn plant_names(&self) -> &[String] {
        &self.plant_names
    }

    pub fn plant_capacity(&self) -> &[u64] {
        &self.plant_capacity
    }

    pub fn production_cost(&self) -> &[u64] {
        &self.production_cost
    }

    pub fn hydro_plant(&self) -> Option<usize> {
        self.hydro_plant
    }

    pub fn demand(&self) -> &[Vec<u64>] {
        &self.demand
    }

    pub fn payment_rate(&self) -> &[u64] {
        &self.payment_rate
    }

    pub fn high_regime_days_allowed(&self) -> usize {
        self.high_regime_days_allowed
    }

    pub fn high_regime_percent(&self) -> u64 {
        self.high_regime_percent
    }

    pub fn min_service_percent(&self) -> u64 {
        self.min_service_percent
    }

    /// Least energy that must reach `client` on `day`: `ceil(demand * G / 100)`
    pub fn service_floor(&self, client: usize, day: usize) -> u64 {
        (self.demand[client][day] * self.min_service_percent).div_ceil(100)
    }

    /// Production ceiling of the regime plant on a high-regime day, rounded
    /// down to whole units.
    pub fn high_regime_ceiling(&self) -> Option<u64> {
        self.hydro_plant
            .map(|h| self.plant_capacity[h] * self.high_regime_percent / 100)
    }

    /// Ceiling of `plant` on a day, given whether that day runs in high regime
    pub fn ceiling(&self, plant: usize, high_regime: bool) -> u64 {
        match self.high_regime_ceiling() {
            Some(high) if high_regime && self.hydro_plant == Some(plant) => high,
            _ => self.plant_capacity[plant],
        }
    }

    /// Check a fixed set of high-regime days against this instance
    pub fn check_regime_selection(
        &self,
        selection: &RegimeSelection,
    ) -> Result<(), ValidationErrors> {
        let RegimeSelection::Fixed(days) = selection else {
            return Ok(());
        };
        let mut errors = Vec::new();
        if self.hydro_plant.is_none() && !days.is_empty() {
            errors.push(ValidationError::new(
                "highRegimeDays",
                "no plant is subject to the high-regime rule",
            ));
        }
        if days.len() > self.high_regime_days_allowed {
            errors.push(ValidationError::new(
                "highRegimeDays",
                format!(
                    "{} days given but only {} allowed",
                    days.len(),
                    self.high_regime_days_allowed
                ),
            ));
        }
        for (i, &day) in days.iter().enumerate() {
            if day >= self.day_count {
                errors.push(ValidationError::new(
                    format!("highRegimeDays[{i}]"),
                    format!("day {day} is outside the {}-day horizon", self.day_count),
                ));
            } else if days[..i].contains(&day) {
                errors.push(ValidationError::new(
                    format!("highRegimeDays[{i}]"),
                    format!("day {day} listed twice"),
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

impl TryFrom<ParameterSet> for ModelParameters {
    type Error = ValidationErrors;

    fn try_from(set: ParameterSet) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let day_count = count(&mut errors, "dayCount", set.day_count);
        let client_count = count(&mut errors, "clientCount", set.client_count);

        if set.plant_capacity.is_empty() {
            errors.push(ValidationError::new("plantCapacity", "at least one plant is required"));
        }
        let plant_capacity = amounts(&mut errors, "plantCapacity", &set.plant_capacity);
        let production_cost = amounts(&mut errors, "productionCost", &set.production_cost);
        if set.production_cost.len() != set.plant_capacity.len() {
            errors.push(ValidationError::new(
                "productionCost",
                format!(
                    "expected {} entries (one per plant), got {}",
                    set.plant_capacity.len(),
                    set.production_cost.len()
                ),
            ));
        }

        let plant_count = set.plant_capacity.len();
        let plant_names = match set.plant_names {
            Some(names) => {
                if names.len() != plant_count {
                    errors.push(ValidationError::new(
                        "plantNames",
                        format!("expected {plant_count} names, got {}", names.len()),
                    ));
                }
                names
            }
            None if plant_count == REFERENCE_PLANT_NAMES.len() => {
                REFERENCE_PLANT_NAMES.iter().map(|n| n.to_string()).collect()
            }
            None => (0..plant_count).map(|p| format!("plant-{p}")).collect(),
        };

        let hydro_plant = match set.hydro_plant {
            Some(h) if h >= plant_count => {
                errors.push(ValidationError::new(
                    "hydroPlant",
                    format!("plant {h} does not exist ({plant_count} plants)"),
                ));
                None
            }
            Some(h) => Some(h),
            None if plant_count == REFERENCE_PLANT_NAMES.len() => Some(1),
            None => None,
        };

        if set.demand.len() as i64 != set.client_count {
            errors.push(ValidationError::new(
                "demand",
                format!(
                    "expected {} rows (one per client), got {}",
                    set.client_count,
                    set.demand.len()
                ),
            ));
        }
        let demand = set
            .demand
            .iter()
            .enumerate()
            .map(|(c, row)| {
                let field = format!("demand[{c}]");
                if row.len() as i64 != set.day_count {
                    errors.push(ValidationError::new(
                        field.clone(),
                        format!("expected {} days, got {}", set.day_count, row.len()),
                    ));
                }
                amounts(&mut errors, &field, row)
            })
            .collect();

        let payment_rate = amounts(&mut errors, "paymentRate", &set.payment_rate);
        if set.payment_rate.len() as i64 != set.client_count {
            errors.push(ValidationError::new(
                "paymentRate",
                format!(
                    "expected {} entries (one per client), got {}",
                    set.client_count,
                    set.payment_rate.len()
                ),
            ));
        }

        let high_regime_days_allowed = if set.high_regime_days_allowed < 0 {
            errors.push(ValidationError::new("highRegimeDaysAllowed", "must not be negative"));
            0
        } else if set.high_regime_days_allowed > set.day_count {
            errors.push(ValidationError::new(
                "highRegimeDaysAllowed",
                format!("must not exceed dayCount ({})", set.day_count),
            ));
            0
        } else {
            set.high_regime_days_allowed as usize
        };

        let max_percent = if set.allow_boost { MAX_BOOST_PERCENT } else { 100 };
        let high_regime_percent = percent(
            &mut errors,
            "highRegimePercent",
            set.high_regime_percent,
            max_percent,
        );
        let min_service_percent =
            percent(&mut errors, "minServicePercent", set.min_service_percent, 100);

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(ModelParameters {
            day_count,
            client_count,
            plant_names,
            plant_capacity,
            production_cost,
            hydro_plant,
            demand,
            payment_rate,
            high_regime_days_allowed,
            high_regime_percent,
            min_service_percent,
        })
    }
}

impl From<&ModelParameters> for ParameterSet {
    fn from(params: &ModelParameters) -> Self {
        ParameterSet {
            day_count: params.day_count as i64,
            client_count: params.client_count as i64,
            plant_capacity: signed(&params.plant_capacity),
            production_cost: signed(&params.production_cost),
            plant_names: Some(params.plant_names.clone()),
            hydro_plant: params.hydro_plant,
            demand: params.demand.iter().map(|row| signed(row)).collect(),
            payment_rate: signed(&params.payment_rate),
            high_regime_days_allowed: params.high_regime_days_allowed as i64,
            high_regime_percent: params.high_regime_percent as i64,
            min_service_percent: params.min_service_percent as i64,
            allow_boost: params.high_regime_percent > 100,
        }
    }
}

fn signed(values: &[u64]) -> Vec<i64> {
    values.iter().map(|&v| v as i64).collect()
}

fn count(errors: &mut Vec<ValidationError>, field: &str, value: i64) -> usize {
    if value < 1 {
        errors.push(ValidationError::new(field, "must be at least 1"));
        0
    } else {
        value as usize
    }
}

fn amounts(errors: &mut Vec<ValidationError>, field: &str, values: &[i64]) -> Vec<u64> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v < 0 {
                errors.push(ValidationError::new(format!("{field}[{i}]"), "must not be negative"));
                0
            } else if v > MAX_VALUE {
                errors.push(ValidationError::new(
                    format!("{field}[{i}]"),
                    format!("must not exceed {MAX_VALUE}"),
                ));
                0
            } else {
                v as u64
            }
        })
        .collect()
}

fn percent(errors: &mut Vec<ValidationError>, field: &str, value: i64, max: i64) -> u64 {
    if !(1..=max).contains(&value) {
        errors.push(ValidationError::new(field, format!("must be between 1 and {max}")));
        0
    } else {
        value as u64
    }
}
