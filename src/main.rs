use clap::Parser;
use meteoprofiles::cli::{self, Cli};
use meteoprofiles::{MeteoConfig, MeteoError, logging};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, verbose);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MeteoConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging, cli.verbose)?;
    cli::run(cli, config).await
}

fn report(err: &anyhow::Error, verbose: bool) {
    match err.chain().find_map(|e| e.downcast_ref::<MeteoError>()) {
        Some(meteo) => eprintln!("Error [{}]: {}", meteo.code().as_str(), meteo.user_message()),
        None => eprintln!("Error: {err}"),
    }
    if verbose {
        eprintln!("\n{err:?}");
    } else {
        eprintln!("{err:#}");
    }
}
