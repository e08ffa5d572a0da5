use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = kcc::cli::Cli::parse();
    cli.run()
}
