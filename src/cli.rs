use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "tbinit")]
#[command(author, version)]
#[command(
    about = "Register cloud credentials and load common specs and images into Tumblebug",
    long_about = None
)]
pub struct Cli {
    /// Automatically answer yes to prompts and proceed
    #[arg(short, long)]
    pub yes: bool,

    /// Directory with default.toml and environment-specific config files
    #[arg(short, long, default_value = "config", env = "TBINIT_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Override the expected completion time of the resource load, in seconds
    #[arg(long)]
    pub expected_secs: Option<u64>,
}
