use std::process::ExitCode;

use ccboot::COMMAND_HELP;
use clap::Parser;
use session::{SessionOptions, handle_session};
use tracing::{Level, error, info};

mod session;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, after_help = COMMAND_HELP)]
struct Cli {
    #[command(flatten)]
    session: SessionOptions,

    /// More output, repeat for trace level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose", default_value_t = false)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .init();

    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match handle_session(cli.session) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
