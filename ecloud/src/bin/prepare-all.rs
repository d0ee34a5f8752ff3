use ecloud::cli::{parse_args, run_prepare_all_cli, PrepareAllCli, USAGE_EXIT_CODE};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli: PrepareAllCli = parse_args();
    match run_prepare_all_cli(cli).await {
        Ok((report, _)) => tracing::info!(
            steps = report.steps.len(),
            failed = report.failures().count(),
            "CLI completed successfully"
        ),
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("error: {e:#}");
            eprintln!("Use --help for more information.");
            std::process::exit(USAGE_EXIT_CODE);
        }
    }
}
