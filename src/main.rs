use clap::Parser;

use prime_uve::cli;
use prime_uve::utils::output;

fn main() {
    let cli = cli::Cli::parse();
    if let Err(e) = cli::run(cli) {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
