use clap::Parser;
use ldp_conneg::{CliArgs, ConvertConfig, LoggingConfig, init_logging, run_conversion};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = ConvertConfig::from_args(cli)?;

    // Validate configuration before touching the input (fail-fast)
    config.validate()?;

    match config.output.as_ref() {
        Some(path) => {
            let mut file = tokio::fs::File::create(path).await?;
            run_conversion(&config, &mut file).await?;
        }
        None => {
            let mut stdout = tokio::io::stdout();
            run_conversion(&config, &mut stdout).await?;
        }
    }

    Ok(())
}
