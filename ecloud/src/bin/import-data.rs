use ecloud::cli::{parse_args, run_import_cli, ImportCli, USAGE_EXIT_CODE};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli: ImportCli = parse_args();
    tracing::info!("CLI arguments parsed, invoking run");
    match run_import_cli(cli).await {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("error: {e:#}");
            eprintln!("Use --help for more information.");
            std::process::exit(USAGE_EXIT_CODE);
        }
    }
}
