use serde::Serialize;

use super::month::YearMonth;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Frequency {
    Monthly,
    Annually,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Deposit,
    Withdrawal,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Deposit => 1.0,
            Direction::Withdrawal => -1.0,
        }
    }
}

/// Recurring windows are inclusive; `end: None` is unbounded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CashFlowKind {
    OneOff {
        date: YearMonth,
    },
    Recurring {
        direction: Direction,
        start: YearMonth,
        end: Option<YearMonth>,
        frequency: Frequency,
    },
}

#[derive(Debug, Clone)]
pub struct CashFlow {
    pub id: String,
    pub label: String,
    pub kind: CashFlowKind,
    /// Magnitude, never negative. The sign comes from `kind`.
    pub amount: f64,
    /// Annual percent, e.g. 6.0 for 6%/year.
    pub growth_rate: f64,
    pub enabled: bool,
}

impl CashFlow {
    pub fn start(&self) -> YearMonth {
        match self.kind {
            CashFlowKind::OneOff { date } => date,
            CashFlowKind::Recurring { start, .. } => start,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationInputs {
    pub starting_balance: f64,
    pub cash_flows: Vec<CashFlow>,
    /// Annual volatility in percent.
    pub volatility: f64,
    pub num_paths: u32,
    pub end_override: Option<YearMonth>,
    pub seed: Option<u64>,
    pub include_paths: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PercentileBand {
    pub p10: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p90: f64,
}

impl PercentileBand {
    pub fn flat(value: f64) -> Self {
        Self {
            p10: value,
            p25: value,
            median: value,
            p75: value,
            p90: value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStep {
    pub label: String,
    pub month_index: u32,
    pub p10: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub time_steps: Vec<TimeStep>,
    pub final_p10: f64,
    pub final_p25: f64,
    pub final_median: f64,
    pub final_p75: f64,
    pub final_p90: f64,
    pub depleted_share: f64,
    pub start_month: YearMonth,
    pub end_month: YearMonth,
    pub total_months: u32,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<Vec<f64>>>,
}

impl SimulationResult {
    pub fn final_band(&self) -> PercentileBand {
        PercentileBand {
            p10: self.final_p10,
            p25: self.final_p25,
            median: self.final_median,
            p75: self.final_p75,
            p90: self.final_p90,
        }
    }
}
