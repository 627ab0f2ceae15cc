use std::path::PathBuf;

use thiserror::Error;

use crate::core::{MonthParseError, YearMonth};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("numPaths must be between 1 and {max}, got {got}")]
    NumPaths { got: u32, max: u32 },
    #[error("simulated range spans {months} months, more than the {max} allowed")]
    Horizon { months: i32, max: i32 },
    #[error("includePaths would return {values} values, more than the {max} allowed; lower numPaths or shorten the range")]
    PathOutput { values: u64, max: u64 },
    #[error("volatility must be a finite percentage >= 0, got {0}")]
    Volatility(f64),
    #[error("startingBalance must be a finite amount >= 0, got {0}")]
    StartingBalance(f64),
    #[error("cash flow {id:?}: amount must be a finite amount >= 0, got {amount}")]
    Amount { id: String, amount: f64 },
    #[error("cash flow {id:?}: growthRate must be finite")]
    GrowthRate { id: String },
    #[error("cash flow {id:?}: one-off entries cannot carry {field}")]
    OneOffSchedule { id: String, field: &'static str },
    #[error("cash flow {id:?}: recurring entries need a frequency")]
    MissingFrequency { id: String },
    #[error("cash flow {id:?}: endDate {end} is before startDate {start}")]
    EndBeforeStart {
        id: String,
        start: YearMonth,
        end: YearMonth,
    },
    #[error("{field}: {source}")]
    Month {
        field: String,
        source: MonthParseError,
    },
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid query string: {0}")]
    Query(String),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Month(#[from] MonthParseError),
    #[error("cannot read scenario {path}: {source}")]
    Scenario {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("failed to encode result: {0}")]
    Output(serde_json::Error),
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}
