use anyhow::Result;

use ipl_matches::api;
use ipl_matches::config::AppConfig;
use ipl_matches::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let mut config = AppConfig::from_env()?;
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    config.apply_args(&args)?;

    if let Err(err) = api::run_server(&config).await {
        tracing::error!("server exited: {err:#}");
        return Err(err);
    }
    Ok(())
}
