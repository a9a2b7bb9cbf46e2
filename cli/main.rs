use clap::Parser as _;
use predmarket_app_cli_lib::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let output = cli.run().await?;
    println!("{output}");
    Ok(())
}
