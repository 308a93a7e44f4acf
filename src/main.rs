use articlee::config::AppConfig;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let rocket = match AppConfig::from_env().map_err(Into::into).and_then(articlee::rocket) {
        Ok(rocket) => rocket,
        Err(e) => {
            error!("failed to start: {}", e);
            for cause in e.iter().skip(1) {
                error!("caused by: {}", cause);
            }
            process::exit(1);
        }
    };

    info!("starting articlee");
    if let Err(e) = rocket.launch().await {
        error!("server stopped: {}", e);
        process::exit(1);
    }
}
