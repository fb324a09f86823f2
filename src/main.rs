use clap::Parser;
use log::{debug, error};

mod args;
mod returns;

use crate::args::Args;

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
    debug!("args: {:?}", args);

    if let Err(e) = returns::run_returns(&args) {
        error!("{}", e);
        let mut source = std::error::Error::source(e.as_ref());
        while let Some(s) = source {
            error!("  caused by: {}", s);
            source = s.source();
        }
        std::process::exit(1);
    }
}
