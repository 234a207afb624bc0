// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, hand off to `Cli`.
// - Exits non-zero only for fatal configuration errors; failed uploads are
//   reported in the summary and the log.

use clap::Parser;
use file_uploader::{cli::Cli, logging};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(&cli.log_file, cli.verbose) {
        logging::init_logging_console(cli.verbose);
        tracing::warn!("{:#}; logging to console only", err);
    }

    if let Err(err) = cli.execute() {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}
