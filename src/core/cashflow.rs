use super::month::YearMonth;
use super::types::{CashFlow, CashFlowKind, Frequency};

/// Fallback expected return, annual percent, for months with no active flow.
pub const DEFAULT_ANNUAL_GROWTH: f64 = 6.0;
pub const DEFAULT_HORIZON_MONTHS: i32 = 360;
const ONE_OFF_AFTERMATH_MONTHS: i32 = 12;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MonthRange {
    pub start_abs: i32,
    pub end_abs: i32,
}

impl MonthRange {
    pub fn total_months(self) -> i32 {
        self.end_abs - self.start_abs
    }

    pub fn is_empty(self) -> bool {
        self.total_months() <= 0
    }
}

/// `end_override` replaces the computed end outright, even when that leaves an
/// empty range.
pub fn resolve_range(
    cash_flows: &[CashFlow],
    end_override: Option<YearMonth>,
    now: YearMonth,
) -> MonthRange {
    let enabled = cash_flows.iter().filter(|cf| cf.enabled);

    let start_abs = enabled
        .clone()
        .map(|cf| cf.start().to_abs())
        .fold(now.to_abs(), i32::min);

    let mut end_abs = start_abs + DEFAULT_HORIZON_MONTHS;
    for cf in enabled {
        match cf.kind {
            CashFlowKind::OneOff { date } => {
                end_abs = end_abs.max(date.to_abs() + ONE_OFF_AFTERMATH_MONTHS);
            }
            CashFlowKind::Recurring { end: Some(end), .. } => {
                end_abs = end_abs.max(end.to_abs());
            }
            CashFlowKind::Recurring { end: None, .. } => {}
        }
    }

    if let Some(end) = end_override {
        end_abs = end.to_abs();
    }

    MonthRange { start_abs, end_abs }
}

fn is_active(cf: &CashFlow, month: i32) -> bool {
    if !cf.enabled {
        return false;
    }
    match cf.kind {
        CashFlowKind::OneOff { date } => date.to_abs() == month,
        CashFlowKind::Recurring { start, end, .. } => {
            month >= start.to_abs() && end.is_none_or(|end| month <= end.to_abs())
        }
    }
}

fn contribution_at(cf: &CashFlow, month: i32) -> f64 {
    if !is_active(cf, month) {
        return 0.0;
    }
    match cf.kind {
        CashFlowKind::OneOff { .. } => cf.amount,
        CashFlowKind::Recurring {
            direction,
            start,
            frequency,
            ..
        } => {
            let pays = match frequency {
                Frequency::Monthly => true,
                Frequency::Annually => month.rem_euclid(12) == start.to_abs().rem_euclid(12),
            };
            if pays { direction.sign() * cf.amount } else { 0.0 }
        }
    }
}

pub fn net_cash_flow_at(cash_flows: &[CashFlow], month: i32) -> f64 {
    cash_flows.iter().map(|cf| contribution_at(cf, month)).sum()
}

// Annual flows weigh in for every month of their window, not only payout months.
pub fn blended_monthly_return(
    cash_flows: &[CashFlow],
    month: i32,
    default_annual_growth: f64,
) -> f64 {
    let (weighted, total_weight) = cash_flows
        .iter()
        .filter(|cf| is_active(cf, month))
        .fold((0.0, 0.0), |(weighted, total), cf| {
            let weight = cf.amount.abs();
            (weighted + weight * cf.growth_rate, total + weight)
        });

    let annual = if total_weight > 0.0 {
        weighted / total_weight
    } else {
        default_annual_growth
    };
    annual / 100.0 / 12.0
}

#[derive(Debug, Clone)]
pub struct MonthlySchedule {
    start_abs: i32,
    net_cash_flow: Vec<f64>,
    expected_return: Vec<f64>,
}

impl MonthlySchedule {
    pub fn build(cash_flows: &[CashFlow], start_abs: i32, total_months: u32) -> Self {
        let months = (1..=total_months as i32).map(|m| start_abs + m);
        let net_cash_flow = months
            .clone()
            .map(|month| net_cash_flow_at(cash_flows, month))
            .collect();
        let expected_return = months
            .map(|month| blended_monthly_return(cash_flows, month, DEFAULT_ANNUAL_GROWTH))
            .collect();
        Self {
            start_abs,
            net_cash_flow,
            expected_return,
        }
    }

    pub fn start_abs(&self) -> i32 {
        self.start_abs
    }

    pub fn total_months(&self) -> usize {
        self.net_cash_flow.len()
    }

    pub fn months(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.expected_return
            .iter()
            .copied()
            .zip(self.net_cash_flow.iter().copied())
    }
}
