use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trivia_api::configuration::DatabaseSettings;
use trivia_api::db::backup::{export_data, import_data};
use trivia_api::db::{establish_connection, run_migrations};
use trivia_api::telemetry::init_tracing;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Database path
    db_path: PathBuf,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import categories and questions from CSV files in a directory
    Import { path: PathBuf },
    /// Export categories and questions to CSV files in a directory
    Export { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let database = DatabaseSettings {
        path: cli.db_path.display().to_string(),
    };
    let pool = establish_connection(database.connect_options())
        .await
        .context("Cannot connect to DB")?;
    run_migrations(&pool).await?;
    match cli.command {
        Commands::Export { path } => export_data(&pool, &path).await.context("Cannot export"),
        Commands::Import { path } => import_data(&pool, &path).await.context("Cannot import"),
    }
}
