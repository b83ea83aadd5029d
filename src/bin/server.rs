use anyhow::Context;
use trivia_api::configuration::get_configuration;
use trivia_api::db::{establish_connection, run_migrations};
use trivia_api::server::app::run_server;
use trivia_api::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = get_configuration().context("Failed to read configuration")?;
    let pool = establish_connection(settings.database.connect_options())
        .await
        .with_context(|| format!("Cannot open database {}", settings.database.path))?;

    tracing::info!("Running db migrations...");
    run_migrations(&pool).await?;

    run_server(pool, settings.application).await
}
