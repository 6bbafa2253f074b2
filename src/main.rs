use clap::Parser;
use log::LevelFilter;
use tasklist::cli::commands::Cli;
use tasklist::cli::handlers;

fn setup_logging(level: &str, verbose: bool) {
    let default = if verbose {
        LevelFilter::Debug
    } else {
        level.parse().unwrap_or(LevelFilter::Warn)
    };
    env_logger::Builder::new()
        .filter_level(default)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match handlers::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    setup_logging(&config.log_level, cli.verbose);

    if let Err(e) = handlers::dispatch(cli, config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
