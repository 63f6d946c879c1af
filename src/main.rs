// Entrypoint for the CLI. Parses arguments, sets up logging, then hands
// off to the command dispatcher.

use clap::Parser;

use synadmin_cli::cli::{execute_command, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays pipeable.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    execute_command(&cli)
}
