use std::path::PathBuf;

use clap::Parser;
use rudis::config::Config;
use rudis::{server, Error};

#[derive(Parser, Debug)]
#[command(name = "rudis-server", version, about = "An in-memory key-value server")]
struct Args {
    /// Path to the configuration file; defaults apply when omitted
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    init_tracing(&config)?;

    server::run(config).await
}

fn init_tracing(config: &Config) -> Result<(), Error> {
    let level = config.loglevel.as_tracing_level();

    if config.logfile.is_empty() {
        let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logfile)?;
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .try_init();
    }

    Ok(())
}
