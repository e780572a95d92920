use std::process::ExitCode;

use clap::Parser;
use tether::{CliArgs, ClientConfig, ClientError, InteractiveDriver, init_tracing, run_client};
use tokio::io::BufReader;

async fn run(cli: CliArgs) -> Result<u8, ClientError> {
    let file = tether::load_env_file(&cli.env_file)?;
    let process = tether::process_env();
    let config = ClientConfig::resolve(&cli, &file, &process)?;
    tracing::debug!(?config, "configuration resolved");

    let mut driver = InteractiveDriver::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .with_interrupt(|| {
            Box::pin(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            })
        });

    let exit = run_client(config, &mut driver).await?;
    tracing::info!(?exit, "client finished");
    Ok(exit.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("\nError: {}", error.message);
            tracing::debug!(error = %error, "client failed");
            ExitCode::FAILURE
        }
    }
}
