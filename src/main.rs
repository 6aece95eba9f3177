use linkchain::cli::commands::run_cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging is initialized inside the CLI based on the debug flag
    run_cli().await?;

    Ok(())
}
