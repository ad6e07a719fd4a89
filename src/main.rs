use anyhow::Result;
use bank_ledger::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    bank_ledger::telemetry::init(cli.verbose);
    cli.run().await
}
