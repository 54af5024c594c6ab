use tickflow::{
    app::{App, join_loops, log_counters},
    config::AppConfig,
    logger::init_tracing,
    scheduler::StopHandle,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting tickflow service...");

    let cfg = AppConfig::from_env()?;
    let app = App::build(cfg).await?;
    let counters = app.counters.clone();

    let (stop, _) = StopHandle::new();
    let loops = app.spawn(&stop);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, finishing in-flight cycles");

    stop.stop();
    join_loops(loops).await;
    log_counters(&counters);

    Ok(())
}
