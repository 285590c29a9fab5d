use colored::Colorize;
use concrete_stone::cli::CommandLineInterface;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let command_line_interface = CommandLineInterface::load();

    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if command_line_interface.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
