use {anyhow::Result, clap::Parser, secretshare::cli::Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    secretshare::setup_logger(&cli.log_filter)?;
    secretshare::run(cli).await
}
