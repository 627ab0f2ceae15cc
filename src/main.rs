use clap::Parser;

use portfolio_mc::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    portfolio_mc::logging::init_logging(&cli.log_level);

    if let Err(e) = cli::run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
