use clap::Parser;
use stockpulse::application::pipeline::RunOptions;
use stockpulse::cli::commands::{Cli, Commands};
use stockpulse::domain::values::market_scope::MarketScope;
use stockpulse::domain::values::run_status::TriggerType;
use stockpulse::StockPulse;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stockpulse=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = std::env::var("STOCKPULSE_DB").unwrap_or_else(|_| "./stockpulse.db".into());

    let sp = match StockPulse::new(&db_path) {
        Ok(sp) => sp,
        Err(e) => {
            eprintln!("Error initializing StockPulse: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(sp, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_command(sp: StockPulse, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Run {
            scope,
            trigger,
            strategy,
            provider,
            symbol,
            force,
        } => {
            let scope: MarketScope = scope.parse().map_err(|e: String| e)?;
            let mut options = RunOptions::new(scope);
            options.trigger_type = trigger.parse::<TriggerType>().map_err(|e: String| e)?;
            options.strategy_key = strategy;
            options.reasoning_provider = provider;
            options.target_symbol = symbol;
            options.ignore_min_interval = force;

            let outcome = sp.run_pipeline(options).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Runs { scope, limit } => {
            let scope: MarketScope = scope.parse().map_err(|e: String| e)?;
            let runs = sp.list_runs(scope, limit)?;
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
        Commands::Report { scope, date } => {
            let scope: MarketScope = scope.parse().map_err(|e: String| e)?;
            let date = date
                .map(|d| chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
                .transpose()
                .map_err(|e| format!("Invalid date format: {e}. Use YYYY-MM-DD"))?;
            match sp.report(scope, date)? {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => println!("null"),
            }
        }
        Commands::Decisions { run_id } => {
            let decisions = sp.decisions_for_run(&run_id)?;
            println!("{}", serde_json::to_string_pretty(&decisions)?);
        }
    }
    Ok(())
}
