use clap::Parser;
use logger::conf::{CliArgs, LoggerConfig};
use logger::runtime::{boot, stop};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();

    let args = CliArgs::parse();
    let mut config = LoggerConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    let mut session = boot::boot(&config).await?;
    session.run(stop::shutdown_signal()).await?;
    Ok(())
}
