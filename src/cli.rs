use std::convert::TryFrom;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use reqwest::Url;

use crate::selector::SelectionPolicy;
use crate::server::ServiceConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "mirrorlb", author, version, about = "Redirects clients to a live, fully synced mirror", long_about = None)]
pub struct Cli {
    /// Upstream mirror status URL
    #[arg(
        long = "url",
        value_name = "url",
        default_value = "https://archlinux.org/mirrors/status/json/"
    )]
    pub url: String,

    /// Refresh interval in seconds
    #[arg(long = "interval", value_name = "secs", default_value_t = 3600)]
    pub interval: u64,

    /// Minimum mirror completion threshold (0.0 - 1.0)
    #[arg(long = "completion", value_name = "ratio", default_value_t = 1.0)]
    pub completion: f64,

    /// Host to listen for connections on
    #[arg(long = "host", value_name = "addr", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long = "port", value_name = "port", default_value_t = 9090)]
    pub port: u16,

    /// Timeout for one upstream fetch in seconds
    #[arg(long = "fetch-timeout", value_name = "secs", default_value_t = 30)]
    pub fetch_timeout: u64,

    /// How to pick among qualifying mirrors
    #[arg(long = "selection", value_enum, default_value_t = SelectionPolicy::Best)]
    pub selection: SelectionPolicy,

    /// Quiet mode
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

impl TryFrom<Cli> for ServiceConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let source = Url::parse(&cli.url).with_context(|| format!("invalid URL: {}", cli.url))?;
        if source.scheme() != "http" && source.scheme() != "https" {
            return Err(anyhow!("unsupported URL scheme: {}", source.scheme()));
        }

        if cli.interval == 0 {
            return Err(anyhow!("--interval must be at least one second"));
        }
        if cli.fetch_timeout == 0 {
            return Err(anyhow!("--fetch-timeout must be at least one second"));
        }
        if !(0.0..=1.0).contains(&cli.completion) {
            return Err(anyhow!(
                "--completion must be between 0.0 and 1.0, got {}",
                cli.completion
            ));
        }

        Ok(ServiceConfig {
            source,
            interval: Duration::from_secs(cli.interval),
            min_completion: cli.completion,
            host: cli.host,
            port: cli.port,
            fetch_timeout: Duration::from_secs(cli.fetch_timeout),
            selection: cli.selection,
        })
    }
}
