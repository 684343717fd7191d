use std::path::PathBuf;

use anyhow::Result;
use appstatus_etl::{StoreConfig, run_pipeline};
use clap::Parser;

/// Load an application status spreadsheet into the database,
/// reconciling each record field by field
#[derive(Parser)]
#[command(name = "appstatus-etl", version, about)]
struct Cli {
    /// Path to the spreadsheet export to load
    source: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let store = StoreConfig::from_env()?;

    let summary = run_pipeline(&cli.source, &store).await?;
    println!("{}", summary);
    Ok(())
}
