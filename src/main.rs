use clap::Parser;

use cgwt::cli::Cli;
use cgwt::config::Config;

fn main() {
    let cli = Cli::parse();
    let config = Config::resolve(cli.verbose);

    env_logger::Builder::new()
        .filter_level(config.log_level)
        .format_timestamp(None)
        .init();

    let exit_code = match cgwt::runner::run(cli, &config) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("{e:#}");
            1
        }
    };
    std::process::exit(exit_code);
}
