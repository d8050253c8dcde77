use linkflow_cli::{cli, error};
use std::process;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        process::exit(error::exit_code(&e));
    }
    Ok(())
}
