use clap::Parser;
use tgvmax_archive::cli::Cli;
use tgvmax_archive::commands::{self, EXIT_FAILURE, EXIT_OK};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match commands::run(cli) {
        Ok(EXIT_OK) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    }
}
