use clap::Parser;
use nestcast::cli::{Cli, run};
use nestcast::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("warning: logging disabled: {e}");
    }
    run(cli)
}
