use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stockpulse", about = "Market signal research pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline once for a market scope
    Run {
        /// Market scope (kr, us)
        #[arg(long)]
        scope: String,
        /// Trigger type (manual, scheduled, api)
        #[arg(long, default_value = "manual")]
        trigger: String,
        /// Strategy key recorded on the run
        #[arg(long, default_value = "default")]
        strategy: String,
        /// Reasoning provider override (openai, anthropic, noop)
        #[arg(long)]
        provider: Option<String>,
        /// Restrict the run to one symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Ignore the minimum interval between runs
        #[arg(long)]
        force: bool,
    },
    /// List recent runs
    Runs {
        #[arg(long)]
        scope: String,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show the daily report
    Report {
        #[arg(long)]
        scope: String,
        /// Report date (YYYY-MM-DD), defaults to today in the market's calendar
        #[arg(long)]
        date: Option<String>,
    },
    /// List the decisions a run produced
    Decisions {
        /// Run ID
        run_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "stockpulse", "run", "--scope", "kr", "--symbol", "005930", "--force",
        ]);
        match cli.command {
            Commands::Run {
                scope,
                trigger,
                symbol,
                force,
                provider,
                ..
            } => {
                assert_eq!(scope, "kr");
                assert_eq!(trigger, "manual");
                assert_eq!(symbol.as_deref(), Some("005930"));
                assert!(force);
                assert!(provider.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn decisions_takes_positional_run_id() {
        let cli = Cli::parse_from(["stockpulse", "decisions", "abc-123"]);
        assert!(matches!(cli.command, Commands::Decisions { run_id } if run_id == "abc-123"));
    }
}
