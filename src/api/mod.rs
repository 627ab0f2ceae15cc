use axum::{
    Router,
    body::Bytes,
    extract::{Json, Query, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    CashFlow, CashFlowKind, DEFAULT_ANNUAL_GROWTH, Direction, Frequency, SimulationInputs,
    YearMonth, resolve_range, run_simulation_at,
};
use crate::error::InputError;

pub const MAX_PATHS: u32 = 10_000;
pub const MAX_HORIZON_MONTHS: i32 = 1_200;
pub const MAX_INCLUDED_PATH_VALUES: u64 = 4_000_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCashFlowType {
    #[serde(alias = "oneOff", alias = "one_off")]
    OneOff,
    #[serde(alias = "recurringDeposit", alias = "recurring_deposit")]
    RecurringDeposit,
    #[serde(alias = "recurringWithdrawal", alias = "recurring_withdrawal")]
    RecurringWithdrawal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiFrequency {
    Monthly,
    #[serde(alias = "annual", alias = "yearly")]
    Annually,
}

impl From<ApiFrequency> for Frequency {
    fn from(value: ApiFrequency) -> Self {
        match value {
            ApiFrequency::Monthly => Frequency::Monthly,
            ApiFrequency::Annually => Frequency::Annually,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

fn default_growth_rate() -> f64 {
    DEFAULT_ANNUAL_GROWTH
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CashFlowPayload {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: ApiCashFlowType,
    #[serde(default)]
    label: String,
    amount: f64,
    #[serde(default = "default_growth_rate")]
    growth_rate: f64,
    start_date: String,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    frequency: Option<ApiFrequency>,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct SimulatePayload {
    pub(crate) starting_balance: Option<f64>,
    pub(crate) cash_flows: Option<Vec<CashFlowPayload>>,
    pub(crate) volatility: Option<f64>,
    pub(crate) num_paths: Option<u32>,
    pub(crate) end_override: Option<String>,
    pub(crate) seed: Option<u64>,
    pub(crate) include_paths: Option<bool>,
}

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    starting_balance: f64,
    cash_flows: Vec<CashFlowPayload>,
    volatility: f64,
    num_paths: u32,
    end_override: Option<String>,
    seed: Option<u64>,
    include_paths: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            starting_balance: 10_000.0,
            cash_flows: Vec::new(),
            volatility: 15.0,
            num_paths: 500,
            end_override: None,
            seed: None,
            include_paths: false,
        }
    }
}

impl Settings {
    pub(crate) fn apply(&mut self, payload: SimulatePayload) {
        if let Some(v) = payload.starting_balance {
            self.starting_balance = v;
        }
        if let Some(v) = payload.cash_flows {
            self.cash_flows = v;
        }
        if let Some(v) = payload.volatility {
            self.volatility = v;
        }
        if let Some(v) = payload.num_paths {
            self.num_paths = v;
        }
        if let Some(v) = payload.end_override {
            self.end_override = Some(v);
        }
        if let Some(v) = payload.seed {
            self.seed = Some(v);
        }
        if let Some(v) = payload.include_paths {
            self.include_paths = v;
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct MonthResponse {
    month: String,
    label: String,
}

fn parse_month(field: impl Into<String>, raw: &str) -> Result<YearMonth, InputError> {
    raw.parse().map_err(|source| InputError::Month {
        field: field.into(),
        source,
    })
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn build_cash_flow(payload: CashFlowPayload) -> Result<CashFlow, InputError> {
    let id = payload.id;
    if !payload.amount.is_finite() || payload.amount < 0.0 {
        return Err(InputError::Amount {
            id,
            amount: payload.amount,
        });
    }
    if !payload.growth_rate.is_finite() {
        return Err(InputError::GrowthRate { id });
    }

    let start = parse_month(format!("cash flow {id:?} startDate"), &payload.start_date)?;
    let end = non_blank(payload.end_date.as_deref())
        .map(|raw| parse_month(format!("cash flow {id:?} endDate"), raw))
        .transpose()?;

    let kind = match payload.kind {
        ApiCashFlowType::OneOff => {
            if end.is_some() {
                return Err(InputError::OneOffSchedule {
                    id,
                    field: "endDate",
                });
            }
            if payload.frequency.is_some() {
                return Err(InputError::OneOffSchedule {
                    id,
                    field: "frequency",
                });
            }
            CashFlowKind::OneOff { date: start }
        }
        ApiCashFlowType::RecurringDeposit | ApiCashFlowType::RecurringWithdrawal => {
            let Some(frequency) = payload.frequency else {
                return Err(InputError::MissingFrequency { id });
            };
            if let Some(end) = end {
                if end < start {
                    return Err(InputError::EndBeforeStart { id, start, end });
                }
            }
            let direction = if payload.kind == ApiCashFlowType::RecurringDeposit {
                Direction::Deposit
            } else {
                Direction::Withdrawal
            };
            CashFlowKind::Recurring {
                direction,
                start,
                end,
                frequency: frequency.into(),
            }
        }
    };

    Ok(CashFlow {
        id,
        label: payload.label,
        kind,
        amount: payload.amount,
        growth_rate: payload.growth_rate,
        enabled: payload.enabled,
    })
}

pub(crate) fn build_inputs(
    settings: Settings,
    now: YearMonth,
) -> Result<SimulationInputs, InputError> {
    if settings.num_paths == 0 || settings.num_paths > MAX_PATHS {
        return Err(InputError::NumPaths {
            got: settings.num_paths,
            max: MAX_PATHS,
        });
    }

    if !settings.volatility.is_finite() || settings.volatility < 0.0 {
        return Err(InputError::Volatility(settings.volatility));
    }

    if !settings.starting_balance.is_finite() || settings.starting_balance < 0.0 {
        return Err(InputError::StartingBalance(settings.starting_balance));
    }

    let end_override = non_blank(settings.end_override.as_deref())
        .map(|raw| parse_month("endOverride", raw))
        .transpose()?;

    let cash_flows = settings
        .cash_flows
        .into_iter()
        .map(build_cash_flow)
        .collect::<Result<Vec<_>, _>>()?;

    let months = resolve_range(&cash_flows, end_override, now).total_months();
    if months > MAX_HORIZON_MONTHS {
        return Err(InputError::Horizon {
            months,
            max: MAX_HORIZON_MONTHS,
        });
    }
    if settings.include_paths {
        let values = u64::from(settings.num_paths) * (months.max(0) as u64 + 1);
        if values > MAX_INCLUDED_PATH_VALUES {
            return Err(InputError::PathOutput {
                values,
                max: MAX_INCLUDED_PATH_VALUES,
            });
        }
    }

    Ok(SimulationInputs {
        starting_balance: settings.starting_balance,
        cash_flows,
        volatility: settings.volatility,
        num_paths: settings.num_paths,
        end_override,
        seed: settings.seed,
        include_paths: settings.include_paths,
    })
}

pub(crate) fn payload_from_json(json: impl AsRef<[u8]>) -> Result<SimulatePayload, InputError> {
    Ok(serde_json::from_slice::<SimulatePayload>(json.as_ref())?)
}

fn inputs_from_payload(
    payload: SimulatePayload,
    now: YearMonth,
) -> Result<SimulationInputs, InputError> {
    let mut settings = Settings::default();
    settings.apply(payload);
    build_inputs(settings, now)
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/health", get(health_handler))
        .route("/api/month/current", get(current_month_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "portfolio simulation API listening");
    info!("local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn current_month_handler() -> Response {
    let month = YearMonth::current();
    json_response(
        StatusCode::OK,
        MonthResponse {
            month: month.to_string(),
            label: month.label(),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    query: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => bad_request(InputError::Query(rejection.body_text())),
    }
}

async fn simulate_post_handler(body: Bytes) -> Response {
    match payload_from_json(&body) {
        Ok(payload) => simulate_handler_impl(payload).await,
        Err(err) => bad_request(err),
    }
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let now = YearMonth::current();
    let inputs = match inputs_from_payload(payload, now) {
        Ok(inputs) => inputs,
        Err(err) => return bad_request(err),
    };

    let encoded = tokio::task::spawn_blocking(move || {
        serde_json::to_vec(&run_simulation_at(&inputs, now))
    })
    .await;
    match encoded {
        Ok(Ok(body)) => encoded_json_response(StatusCode::OK, body),
        Ok(Err(err)) => {
            error!(%err, "failed to encode simulation result");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
        Err(err) => {
            error!(%err, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn bad_request(err: InputError) -> Response {
    warn!(%err, "rejected simulation request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn encoded_json_response(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
