use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

mod cli;

fn init_logger() {
    // RUST_LOG overrides the default level
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    let args = cli::Cli::parse();
    if let Err(e) = cli::run(args) {
        error!("{:?}", e);
        std::process::exit(1);
    }
}
