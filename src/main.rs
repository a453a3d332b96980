use clap::Parser;
use longshort::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
