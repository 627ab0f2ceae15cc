use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::api::{self, Settings, SimulatePayload};
use crate::core::{SimulationInputs, YearMonth, run_simulation_at};
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-mc",
    about = "Monte Carlo portfolio projection with dated deposits, withdrawals and one-off events"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level for this crate; RUST_LOG overrides it"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON simulation API over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one simulation and print the result as JSON
    Simulate(SimulateArgs),
    /// Print "Mon YYYY" labels for YYYY-MM months (default: the current month)
    Months { months: Vec<String> },
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(long, help = "JSON scenario file using the same keys as the HTTP API")]
    scenario: Option<PathBuf>,
    #[arg(long, help = "Starting portfolio value")]
    starting_balance: Option<f64>,
    #[arg(long, help = "Annual volatility in percent, e.g. 15")]
    volatility: Option<f64>,
    #[arg(long, help = "Number of simulated paths (1..=10000)")]
    paths: Option<u32>,
    #[arg(long, help = "Last simulated month as YYYY-MM, overriding the derived horizon")]
    end: Option<String>,
    #[arg(long, help = "Seed for reproducible runs")]
    seed: Option<u64>,
    #[arg(long, help = "Include every simulated path in the output")]
    include_paths: bool,
    #[arg(long, help = "Pretty-print the JSON result")]
    pretty: bool,
}

impl SimulateArgs {
    fn overrides(&self) -> SimulatePayload {
        SimulatePayload {
            starting_balance: self.starting_balance,
            cash_flows: None,
            volatility: self.volatility,
            num_paths: self.paths,
            end_override: self.end.clone(),
            seed: self.seed,
            include_paths: self.include_paths.then_some(true),
        }
    }
}

fn inputs_from_args(
    args: &SimulateArgs,
    now: YearMonth,
) -> Result<SimulationInputs, CliError> {
    let mut settings = Settings::default();
    if let Some(path) = &args.scenario {
        debug!(path = %path.display(), "loading scenario");
        let json = fs::read_to_string(path).map_err(|source| CliError::Scenario {
            path: path.clone(),
            source,
        })?;
        settings.apply(api::payload_from_json(&json)?);
    }
    settings.apply(args.overrides());
    Ok(api::build_inputs(settings, now)?)
}

fn month_labels(months: &[String]) -> Result<Vec<String>, CliError> {
    if months.is_empty() {
        return Ok(vec![YearMonth::current().label()]);
    }
    months
        .iter()
        .map(|raw| {
            raw.parse::<YearMonth>()
                .map(YearMonth::label)
                .map_err(CliError::from)
        })
        .collect()
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve { port } => api::run_http_server(port).await?,
        Command::Simulate(args) => {
            let now = YearMonth::current();
            let inputs = inputs_from_args(&args, now)?;
            let result =
                tokio::task::spawn_blocking(move || run_simulation_at(&inputs, now)).await?;
            let json = if args.pretty {
                serde_json::to_string_pretty(&result)
            } else {
                serde_json::to_string(&result)
            }
            .map_err(CliError::Output)?;
            println!("{json}");
        }
        Command::Months { months } => {
            for label in month_labels(&months)? {
                println!("{label}");
            }
        }
    }
    Ok(())
}
