use clap::Parser;

use lexis::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    lexis::cli::run(cli).await
}
