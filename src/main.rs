use clap::Parser;
use eodtrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
