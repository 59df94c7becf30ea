use crate::commands::{run_export, run_validate, ExportArgs, ValidateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sembrador::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "El Sembrador",
    about = "Run the event registration service and its admin tooling",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check a registration form against the field rules without submitting it
    Validate(ValidateArgs),
    /// Write subscriber lists as spreadsheet-ready CSV files
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Export(args) => run_export(args).await,
    }
}
