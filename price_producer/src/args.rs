//! Command-line arguments and validated configuration.
//!
//! Every flag also reads an environment variable so the producer can be configured from
//! a container environment. Values are resolved once at startup; [`Config::try_from`]
//! rejects anything contradictory before the first cycle runs.
use crate::driver::{DriverSettings, MIN_CYCLE_INTERVAL};
use clap::Parser;
use log::LevelFilter;
use price_common::{Instrument, ProducerError, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Publishes commodity price records to a Kafka topic", long_about = None)]
pub struct Args {
    /// Comma-separated Kafka bootstrap servers.
    #[clap(
        long,
        env = "KAFKA_BOOTSTRAP_SERVERS",
        default_value = "localhost:9092",
        value_delimiter = ','
    )]
    pub bootstrap_servers: Vec<String>,

    /// Topic the price records are published to.
    #[clap(long, env = "KAFKA_TOPIC", default_value = "commodity-prices")]
    pub topic: String,

    /// MetalpriceAPI key. Without one only simulated prices are produced.
    #[clap(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Seconds between cycles (at least 60).
    #[clap(long, env = "PRODUCER_INTERVAL", default_value_t = 300)]
    pub interval: u64,

    /// Minimum seconds between successful price feed refreshes.
    #[clap(long, env = "REFRESH_INTERVAL", default_value_t = 3600)]
    pub refresh_interval: u64,

    /// Volatility bound override, e.g. `GOLD=0.01`. May be repeated.
    #[clap(long = "volatility", value_name = "SYMBOL=BOUND", value_parser = parse_volatility)]
    pub volatility: Vec<(Instrument, f64)>,

    /// Port of the health/metrics listener; 0 disables it.
    #[clap(long, env = "STATUS_PORT", default_value_t = 8000)]
    pub status_port: u16,

    /// Log verbosity (error, warn, info, debug, trace).
    #[clap(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,

    /// Print records to stdout instead of publishing them to Kafka.
    #[clap(long, env = "DRY_RUN")]
    pub dry_run: bool,
}

fn parse_volatility(raw: &str) -> std::result::Result<(Instrument, f64), String> {
    let (symbol, bound) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=BOUND, got `{}`", raw))?;
    let instrument = symbol
        .trim()
        .parse::<Instrument>()
        .map_err(|e| format!("unknown instrument `{}`: {}", symbol.trim(), e))?;
    let bound = bound
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid bound `{}`: {}", bound.trim(), e))?;
    Ok((instrument, bound))
}

/// Startup configuration after validation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker bootstrap servers.
    pub servers: Vec<String>,
    /// Destination topic.
    pub topic: String,
    /// Feed credential.
    pub api_key: Option<String>,
    /// Time between cycles.
    pub cycle_interval: Duration,
    /// Minimum time between successful refreshes.
    pub refresh_interval: Duration,
    /// Operator volatility overrides.
    pub volatility: HashMap<Instrument, f64>,
    /// Status listener port, `None` when disabled.
    pub status_port: Option<u16>,
    /// Log filter.
    pub log_level: LevelFilter,
    /// Write records to stdout instead of the broker.
    pub dry_run: bool,
}

impl TryFrom<Args> for Config {
    type Error = ProducerError;

    fn try_from(args: Args) -> Result<Self> {
        let cycle_interval = Duration::from_secs(args.interval);
        if cycle_interval < MIN_CYCLE_INTERVAL {
            return Err(ProducerError::ConfigInvalid(format!(
                "interval must be at least {}s, got {}s",
                MIN_CYCLE_INTERVAL.as_secs(),
                args.interval
            )));
        }
        if args.refresh_interval == 0 {
            return Err(ProducerError::ConfigInvalid(
                "refresh interval must be positive".to_string(),
            ));
        }

        let servers: Vec<String> = args
            .bootstrap_servers
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if servers.is_empty() {
            return Err(ProducerError::ConfigInvalid(
                "at least one bootstrap server is required".to_string(),
            ));
        }
        let topic = args.topic.trim().to_string();
        if topic.is_empty() {
            return Err(ProducerError::ConfigInvalid("topic must not be empty".to_string()));
        }

        let mut volatility = HashMap::new();
        for (instrument, bound) in args.volatility {
            if !bound.is_finite() || bound < 0.0 {
                return Err(ProducerError::ConfigInvalid(format!(
                    "volatility for {} must be a non-negative number, got {}",
                    instrument, bound
                )));
            }
            volatility.insert(instrument, bound);
        }

        Ok(Config {
            servers,
            topic,
            api_key: args.api_key.filter(|k| !k.trim().is_empty()),
            cycle_interval,
            refresh_interval: Duration::from_secs(args.refresh_interval),
            volatility,
            status_port: (args.status_port != 0).then_some(args.status_port),
            log_level: args.log_level,
            dry_run: args.dry_run,
        })
    }
}

impl Config {
    /// Parse and validate a command line.
    pub fn from_cli<I, T>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args = Args::try_parse_from(argv)
            .map_err(|e| ProducerError::ConfigInvalid(e.to_string()))?;
        Config::try_from(args)
    }

    /// Driver settings derived from this configuration.
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings::new(self.servers.clone(), &self.topic, self.cycle_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Config> {
        let mut argv = vec!["price_producer"];
        argv.extend_from_slice(extra);
        Config::from_cli(argv)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.cycle_interval, Duration::from_secs(300));
        assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.status_port, Some(8000));
        assert!(config.volatility.is_empty());
        assert!(!config.dry_run);
    }

    #[test]
    fn dry_run_is_opt_in() {
        let config = parse(&["--dry-run"]).unwrap();
        assert!(config.dry_run);
    }

    #[test]
    fn interval_below_sixty_is_rejected() {
        let err = parse(&["--interval", "59"]).unwrap_err();
        assert!(matches!(err, ProducerError::ConfigInvalid(_)));
        assert!(parse(&["--interval", "60"]).is_ok());
    }

    #[test]
    fn splits_server_list_and_drops_blanks() {
        let config = parse(&["--bootstrap-servers", "a:9092, b:9092,"]).unwrap();
        assert_eq!(config.servers, vec!["a:9092", "b:9092"]);
    }

    #[test]
    fn empty_topic_and_zero_refresh_are_rejected() {
        assert!(matches!(
            parse(&["--topic", " "]),
            Err(ProducerError::ConfigInvalid(_))
        ));
        assert!(matches!(
            parse(&["--refresh-interval", "0"]),
            Err(ProducerError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn volatility_overrides() {
        let config = parse(&["--volatility", "gold=0.01", "--volatility", "PALLADIUM=0"]).unwrap();
        assert_eq!(config.volatility[&Instrument::GOLD], 0.01);
        assert_eq!(config.volatility[&Instrument::PALLADIUM], 0.0);

        assert!(parse(&["--volatility", "GOLD=-0.1"]).is_err());
        assert!(parse(&["--volatility", "COPPER=0.1"]).is_err());
        assert!(parse(&["--volatility", "GOLD"]).is_err());
    }

    #[test]
    fn status_port_zero_disables_listener() {
        assert_eq!(parse(&["--status-port", "0"]).unwrap().status_port, None);
    }
}
