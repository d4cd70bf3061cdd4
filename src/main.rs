use clap::Parser;
use std::sync::Arc;
use tbinit::cli::Cli;
use tbinit::config::AppConfig;
use tbinit::error::{InitError, Result};
use tbinit::gate::{OpensslAes256Cbc, TerminalPrompt};
use tbinit::{logging, output, Bootstrap, TumblebugClient};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(InitError::Cancelled) => {
            let args: Vec<String> = std::env::args().collect();
            output::print_success(&format!("Cancel [{}]", args.join(" ")));
            output::print_success("See you soon. :)");
            InitError::Cancelled.exit_code()
        }
        Err(e) => {
            error!(error = %e, "bootstrap failed");
            output::print_error(&format!("Error: {e}"));
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: &Cli) -> Result<i32> {
    let mut config = AppConfig::load_from(&cli.config_dir)?;
    if let Some(secs) = cli.expected_secs {
        config.expected_completion_secs = secs;
    }
    logging::init(&config.logging);

    let client = Arc::new(TumblebugClient::from_config(&config)?);
    let report = Bootstrap::new(config, client, OpensslAes256Cbc::default(), TerminalPrompt)
        .auto_confirm(cli.yes)
        .run()
        .await?;

    Ok(report.print())
}
