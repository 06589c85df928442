use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Settings for one solve, read from the `solver:` section of an instance file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    pub backend: Backend,
    /// Wall-clock limit in seconds. No limit when absent.
    #[serde(rename = "timeLimit", skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    pub balance: BalanceMode,
    /// Zero-based days on which the regime plant runs at its high-regime
    /// ceiling. When absent the optimizer picks the days itself.
    #[serde(rename = "highRegimeDays", skip_serializing_if = "Option::is_none")]
    pub high_regime_days: Option<Vec<usize>>,
}

impl SolverConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn regime_selection(&self) -> RegimeSelection {
        match &self.high_regime_days {
            Some(days) => RegimeSelection::Fixed(days.clone()),
            None => RegimeSelection::Optimized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    MicroLp,
    Cbc,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::MicroLp => "microlp",
            Backend::Cbc => "cbc",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" => Ok(Backend::MicroLp),
            "cbc" | "coin-cbc" | "coin_cbc" => Ok(Backend::Cbc),
            _ => Err(Error::UnknownBackend(s.to_owned())),
        }
    }
}

/// How daily production must relate to daily deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BalanceMode {
    /// Production equals deliveries every day
    #[default]
    Exact,
    /// Production may exceed deliveries; the surplus is unsold
    AllowSurplus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegimeSelection {
    #[default]
    Optimized,
    Fixed(Vec<usize>),
}
