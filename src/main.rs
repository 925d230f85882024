use chrono::NaiveDate;
use clap::Parser;
use env_logger::Env;
use log::error;
use pws_harvester::config::{self, default_config_path};
use pws_harvester::{
    Config, ForecastMode, HarvestError, Harvester, HistoryMode, RunOptions, StorageBackend, Units,
    WundergroundClient,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Incrementally harvest Weather Underground PWS history and hourly forecasts.
///
/// Options left out fall back to the configuration file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Station groups to harvest. Defaults to every configured group.
    #[arg(short, long, num_args = 1..)]
    groups: Vec<String>,

    /// History modes (hourly, daily, all). Pass the flag alone to skip history.
    #[arg(long, num_args = 0..)]
    history: Option<Vec<HistoryMode>>,

    /// Hourly forecast horizons (1day, 2day, 3day, 10day, 15day).
    #[arg(long, visible_alias = "forecast_hourly", num_args = 0..)]
    forecast_hourly: Option<Vec<ForecastMode>>,

    /// Unit systems: m (metric) or e (imperial).
    #[arg(short, long, num_args = 1..)]
    units: Option<Vec<Units>>,

    /// First day to fetch, YYYY-MM-DD. Defaults to each dataset's last stored day.
    #[arg(short, long)]
    start: Option<NaiveDate>,

    /// Last day to fetch, YYYY-MM-DD. Defaults to today.
    #[arg(short, long)]
    end: Option<NaiveDate>,

    /// Storage backends.
    #[arg(long, visible_alias = "store_to", num_args = 1..)]
    store_to: Option<Vec<StorageBackend>>,

    /// Configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn run_options(self, config: &Config) -> RunOptions {
        let defaults = RunOptions::from_config(config);
        RunOptions {
            groups: self.groups,
            history: self.history.unwrap_or(defaults.history),
            forecast_hourly: self.forecast_hourly.unwrap_or(defaults.forecast_hourly),
            units: self.units.unwrap_or(defaults.units),
            store_to: self.store_to.unwrap_or(defaults.store_to),
            start: self.start,
            end: self.end,
        }
    }
}

fn harvest(cli: Cli) -> Result<(), HarvestError> {
    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = config::install(Config::load(&path)?)?;

    let api = WundergroundClient::new(config.api_key.as_str())?;
    Harvester::builder()
        .config(config)
        .api(&api)
        .options(cli.run_options(config))
        .build()
        .run()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match harvest(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}
