use clap::Parser;
use log::error;

use cellsnip::cli::Cli;

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e:?}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cellsnip::run(&config) {
        error!("run failed: {e:?}");
        std::process::exit(1);
    }
}
