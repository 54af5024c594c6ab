pub mod cli;

use std::process::ExitCode;

use clap::Parser;
use tickflow::{
    app::{App, join_loops, log_counters},
    config::AppConfig,
    handlers::{self, InvocationResult},
    logger::init_tracing,
    scheduler::StopHandle,
    time::now_secs,
};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut cfg = AppConfig::from_env()?;
    if let Some(symbol) = cli.symbol {
        cfg.symbol = symbol;
    }

    let app = App::build(cfg).await?;

    let result = match cli.command {
        Command::Ingest => handlers::ingest(&app.poller).await,
        Command::Process => handlers::process(&app.consumer).await,
        Command::Analyze { at } => {
            handlers::analyze(&app.analyzer, at.unwrap_or_else(now_secs)).await
        }
        Command::Run => {
            let counters = app.counters.clone();
            let (stop, _) = StopHandle::new();
            let loops = app.spawn(&stop);

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown signal received");
            stop.stop();
            join_loops(loops).await;
            log_counters(&counters);

            return Ok(ExitCode::SUCCESS);
        }
    };

    Ok(report(&result))
}

fn report(result: &InvocationResult) -> ExitCode {
    if result.is_success() {
        println!("{}", result.body);
        ExitCode::SUCCESS
    } else {
        eprintln!("{}", result.body);
        ExitCode::FAILURE
    }
}
