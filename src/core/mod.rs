mod cashflow;
mod engine;
mod month;
mod types;

pub use cashflow::{
    DEFAULT_ANNUAL_GROWTH, MonthRange, MonthlySchedule, blended_monthly_return, net_cash_flow_at,
    resolve_range,
};
pub use engine::{
    depleted_share, percentile, run_simulation, run_simulation_at, sample_months, simulate_path,
    standard_normal,
};
pub use month::{MonthParseError, YearMonth, current_month, format_month};
pub use types::{
    CashFlow, CashFlowKind, Direction, Frequency, PercentileBand, SimulationInputs,
    SimulationResult, TimeStep,
};
