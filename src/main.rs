mod cli;
mod mirror;
mod refresh;
mod selector;
mod server;
mod util;

use anyhow::Result;
use cli::Cli;
use log::{debug, error, info};
use server::ServiceConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli);

    debug!("CLI arguments: {:?}", cli);
    let config: ServiceConfig = cli.try_into()?;

    info!("starting");
    server::serve(config).await
}

fn init_logger(cli: &Cli) {
    use env_logger::Env;
    use log::LevelFilter;

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp_secs();
    let _ = builder.try_init();
}
