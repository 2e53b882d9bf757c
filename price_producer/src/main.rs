//! Commodity price producer binary.
//!
//! Wires the pieces together and hands control to the cycle driver:
//!
//! - configuration from flags/environment, validated before anything starts;
//! - `env_logger` at the configured level (`RUST_LOG` still applies on top);
//! - Ctrl+C / SIGTERM routed into the driver's shutdown signal;
//! - the optional health/metrics listener on its own thread;
//! - MetalpriceAPI as the baseline feed;
//! - Kafka as the broker, or stdout with `--dry-run`.
use clap::Parser;
use log::{error, info, warn};
use price_common::{ProducerError, Result};
use price_producer::args::{Args, Config};
use price_producer::broker::Connector;
use price_producer::broker::stdout::StdoutConnector;
use price_producer::driver::CycleDriver;
use price_producer::feed::MetalPriceApi;
use price_producer::model::refresh::RefreshPolicy;
use price_producer::model::variation::VolatilityTable;
use price_producer::shutdown::{ShutdownSignal, install_ctrlc};
use price_producer::status::{StatusBoard, StatusServer};

#[cfg(feature = "kafka")]
fn run_kafka(config: &Config, status: StatusBoard, signal: ShutdownSignal) -> Result<()> {
    let connector = price_producer::broker::kafka::KafkaConnector {
        message_timeout: config.driver_settings().ack_timeout,
    };
    run(connector, config, status, signal)
}

#[cfg(not(feature = "kafka"))]
fn run_kafka(_config: &Config, _status: StatusBoard, _signal: ShutdownSignal) -> Result<()> {
    Err(ProducerError::ConfigInvalid(
        "built without the `kafka` feature; pass --dry-run to print records instead".to_string(),
    ))
}

fn run<C: Connector>(
    connector: C,
    config: &Config,
    status: StatusBoard,
    signal: ShutdownSignal,
) -> Result<()> {
    let feed = MetalPriceApi::new(config.api_key.clone())?;
    let refresh = RefreshPolicy::new(Box::new(feed), config.refresh_interval);
    let volatility = VolatilityTable::new(&config.volatility);

    let mut driver = CycleDriver::new(
        connector,
        config.driver_settings(),
        refresh,
        volatility,
        rand::rng(),
        Box::new(signal),
    )
    .with_status(status);

    driver.run()
}

fn main() -> Result<(), ProducerError> {
    let args = Args::parse();
    init_logger(args.log_level);

    let config = Config::try_from(args).inspect_err(|e| error!("{}", e))?;
    info!(
        "Starting price producer: topic={} servers={} interval={}s refresh={}s",
        config.topic,
        config.servers.join(","),
        config.cycle_interval.as_secs(),
        config.refresh_interval.as_secs()
    );
    if config.api_key.is_none() {
        warn!("No API key configured, baselines will never be refreshed");
    }

    let (stop_tx, signal) = ShutdownSignal::new();
    install_ctrlc(stop_tx)
        .map_err(|e| ProducerError::ConfigInvalid(format!("cannot install signal handler: {}", e)))?;

    let status = StatusBoard::new();
    if let Some(port) = config.status_port {
        StatusServer::start(&format!("0.0.0.0:{}", port), status.clone())?;
    }

    if config.dry_run {
        info!("Dry run: records go to stdout");
        run(StdoutConnector, &config, status, signal)
    } else {
        run_kafka(&config, status, signal)
    }
}

fn init_logger(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
