use clap::Parser;
use dnszonetest::cli::{self, Args, EXIT_ERROR};
use dnszonetest::reconcile;
use std::process::ExitCode;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_logging(args.verbose, args.quiet);
    let json = args.json;

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let result = match reconcile::run(&config).await {
        Ok(result) => result,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(report) => println!("{}", report),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    ExitCode::from(result.exit_code())
}
