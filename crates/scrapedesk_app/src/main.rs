use std::io;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

mod platform;

fn main() -> ExitCode {
    match try_main() {
        Ok(outcome) if outcome.succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> anyhow::Result<platform::Outcome> {
    let cli = platform::Cli::parse();
    let config = cli.into_config().context("read arguments")?;
    scrapedesk_logging::initialize(config.log_to, config.log_level, &config.log_file);
    platform::run_app(config, io::stdout()).context("run scrape")
}
