use dotenvy::dotenv;
use target_commit::{
    config::{catalog, database},
    core::report::{self, ReportScope},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the seed catalog
    let catalog_config = catalog::load_default_config()
        .inspect_err(|e| error!("Failed to load catalog: {}", e))?;

    // 4. Connect and ensure the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed categories, organization and product lines
    catalog::seed_catalog(&db, &catalog_config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Print the organization-wide summary
    let summary = report::generate_target_report(&db, ReportScope::All).await?;
    info!("\n{}", report::format_report_summary(&summary));

    Ok(())
}
