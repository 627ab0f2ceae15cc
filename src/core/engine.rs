use std::f64::consts::PI;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info};

use super::cashflow::{MonthRange, MonthlySchedule, resolve_range};
use super::month::YearMonth;
use super::types::{CashFlow, PercentileBand, SimulationInputs, SimulationResult, TimeStep};

const MONTHLY_SAMPLING_LIMIT: u32 = 60;
const YEARLY_STRIDE: usize = 12;

struct PathRecord {
    sampled: Vec<f64>,
    full: Option<Vec<f64>>,
}

pub fn run_simulation(inputs: &SimulationInputs) -> SimulationResult {
    run_simulation_at(inputs, YearMonth::current())
}

pub fn run_simulation_at(inputs: &SimulationInputs, now: YearMonth) -> SimulationResult {
    let started = Instant::now();
    let cash_flows: Vec<CashFlow> = inputs
        .cash_flows
        .iter()
        .filter(|cf| cf.enabled)
        .cloned()
        .collect();
    let range = resolve_range(&cash_flows, inputs.end_override, now);
    let seed = inputs.seed.unwrap_or_else(|| rand::rng().random());

    debug!(
        start = %YearMonth::from_abs(range.start_abs),
        end = %YearMonth::from_abs(range.end_abs),
        flows = cash_flows.len(),
        seed,
        "resolved simulation range"
    );

    if range.is_empty() {
        debug!("simulation range is empty; reporting starting balance");
        return empty_result(inputs, range, seed);
    }

    let total_months = range.total_months() as u32;
    let schedule = MonthlySchedule::build(&cash_flows, range.start_abs, total_months);
    let sample_months = sample_months(total_months);
    debug!(
        steps = sample_months.len(),
        monthly = total_months <= MONTHLY_SAMPLING_LIMIT,
        "sampling plan"
    );

    let monthly_volatility = inputs.volatility / 100.0 / 12f64.sqrt();
    let records = simulate_paths(
        inputs,
        &schedule,
        monthly_volatility,
        &sample_months,
        seed,
    );

    let mut column = Vec::with_capacity(records.len());
    let mut time_steps = Vec::with_capacity(sample_months.len());
    for (idx, &month_index) in sample_months.iter().enumerate() {
        column.clear();
        column.extend(records.iter().map(|record| record.sampled[idx]));
        let band = PercentileBand::from_values(&mut column);
        time_steps.push(TimeStep {
            label: year_label(range.start_abs + month_index as i32),
            month_index,
            p10: band.p10,
            p25: band.p25,
            median: band.median,
            p75: band.p75,
            p90: band.p90,
        });
    }

    // The last sampled month is always the horizon.
    let finals: Vec<f64> = records
        .iter()
        .filter_map(|record| record.sampled.last().copied())
        .collect();
    let final_band = time_steps
        .last()
        .map(|step| PercentileBand {
            p10: step.p10,
            p25: step.p25,
            median: step.median,
            p75: step.p75,
            p90: step.p90,
        })
        .unwrap_or(PercentileBand::flat(0.0));

    let paths = if inputs.include_paths {
        Some(records.into_iter().filter_map(|record| record.full).collect())
    } else {
        None
    };

    info!(
        paths = inputs.num_paths,
        months = total_months,
        final_median = final_band.median,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation complete"
    );

    SimulationResult {
        time_steps,
        final_p10: final_band.p10,
        final_p25: final_band.p25,
        final_median: final_band.median,
        final_p75: final_band.p75,
        final_p90: final_band.p90,
        depleted_share: depleted_share(&finals),
        start_month: YearMonth::from_abs(range.start_abs),
        end_month: YearMonth::from_abs(range.end_abs),
        total_months,
        seed,
        paths,
    }
}

fn empty_result(inputs: &SimulationInputs, range: MonthRange, seed: u64) -> SimulationResult {
    let band = PercentileBand::flat(inputs.starting_balance);
    SimulationResult {
        time_steps: Vec::new(),
        final_p10: band.p10,
        final_p25: band.p25,
        final_median: band.median,
        final_p75: band.p75,
        final_p90: band.p90,
        depleted_share: depleted_share(&[inputs.starting_balance]),
        start_month: YearMonth::from_abs(range.start_abs),
        end_month: YearMonth::from_abs(range.end_abs),
        total_months: 0,
        seed,
        paths: inputs.include_paths.then(Vec::new),
    }
}

fn simulate_paths(
    inputs: &SimulationInputs,
    schedule: &MonthlySchedule,
    monthly_volatility: f64,
    sample_months: &[u32],
    seed: u64,
) -> Vec<PathRecord> {
    let run = |path_index: u32| {
        let mut rng = StdRng::seed_from_u64(derive_seed(seed, path_index));
        let path = simulate_path(
            inputs.starting_balance,
            schedule,
            monthly_volatility,
            &mut rng,
        );
        PathRecord {
            sampled: sample_months.iter().map(|&m| path[m as usize]).collect(),
            full: inputs.include_paths.then_some(path),
        }
    };

    #[cfg(feature = "parallel")]
    let records = (0..inputs.num_paths).into_par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let records = (0..inputs.num_paths).map(run).collect();

    records
}

/// Advances one trajectory through `schedule`. Entry 0 is the starting
/// balance; entry `m` is the value after month `m`. Values never go below zero.
pub fn simulate_path<R: Rng + ?Sized>(
    starting_balance: f64,
    schedule: &MonthlySchedule,
    monthly_volatility: f64,
    rng: &mut R,
) -> Vec<f64> {
    let mut path = Vec::with_capacity(schedule.total_months() + 1);
    path.push(starting_balance);

    let mut value = starting_balance;
    for (expected_return, cash_flow) in schedule.months() {
        let random_return = expected_return + monthly_volatility * standard_normal(rng);
        value = (value * (1.0 + random_return) + cash_flow).max(0.0);
        path.push(value);
    }
    path
}

/// Box-Muller draw. A uniform of exactly zero is redrawn so `ln` stays finite.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u: f64 = rng.random();
    while u == 0.0 {
        u = rng.random();
    }
    let v: f64 = rng.random();
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Month offsets that get a time step. The horizon itself is always included.
pub fn sample_months(total_months: u32) -> Vec<u32> {
    let stride = if total_months <= MONTHLY_SAMPLING_LIMIT {
        1
    } else {
        YEARLY_STRIDE
    };
    let mut months: Vec<u32> = (0..=total_months).step_by(stride).collect();
    if months.last() != Some(&total_months) {
        months.push(total_months);
    }
    months
}

fn year_label(abs_month: i32) -> String {
    YearMonth::from_abs(abs_month).year().to_string()
}

pub fn depleted_share(finals: &[f64]) -> f64 {
    if finals.is_empty() {
        return 0.0;
    }
    let depleted = finals.iter().filter(|&&v| v <= 0.0).count();
    depleted as f64 / finals.len() as f64
}

impl PercentileBand {
    /// Sorts `values` in place and reads off the 10/25/50/75/90 percentiles.
    pub fn from_values(values: &mut [f64]) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        Self {
            p10: percentile(values, 10.0),
            p25: percentile(values, 25.0),
            median: percentile(values, 50.0),
            p75: percentile(values, 75.0),
            p90: percentile(values, 90.0),
        }
    }
}

/// Linear-interpolated percentile of an ascending slice; `p` is in 0..=100.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] * (1.0 - w) + sorted[upper] * w
    }
}

pub(crate) fn derive_seed(base_seed: u64, path_index: u32) -> u64 {
    let mixed = base_seed ^ (u64::from(path_index) << 32) ^ u64::from(path_index);
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
