use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flagbot", version, about = "Automated exploit verification bot for security training challenges")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the verification polling loop
    Run(RunArgs),
    /// Run a single verification pass and exit
    Check(RunArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "flagbot.yaml")]
    pub config: String,

    /// Override the submission database path
    #[arg(long)]
    pub database: Option<String>,

    /// Override the polling interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "flagbot.yaml")]
    pub config: String,
}
