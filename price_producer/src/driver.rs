//! Cycle driver.
//!
//! Owns the baseline store and refresh state and runs the pipeline on the calling
//! thread:
//!
//! ```text
//! Disconnected -> Connecting -> Running -> ShuttingDown -> Stopped
//!                     |            |
//!                     |            +-- broker lost --> Disconnected (reconnect)
//!                     +-- retries exhausted --> Stopped (fatal)
//! ```
//!
//! While `Running`, each iteration is: refresh check, build records, publish them one by
//! one, then sleep for the cycle interval. Anything that goes wrong inside an iteration,
//! other than losing the broker, is logged and followed by a fixed cooldown; the loop
//! itself never ends on a per-cycle error.

use crate::broker::{BrokerError, Connector};
use crate::model::baseline::BaselineStore;
use crate::model::record_builder::build_cycle;
use crate::model::refresh::{RefreshOutcome, RefreshPolicy};
use crate::model::variation::VolatilityTable;
use crate::publisher::{ACK_TIMEOUT, Publisher};
use crate::retry::{Backoff, RetryError, retry};
use crate::shutdown::{Sleeper, Wake};
use crate::status::StatusBoard;
use chrono::{SecondsFormat, Utc};
use log::{error, info, warn};
use price_common::{Instrument, ProducerError, Provenance, Result};
use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default time between cycles.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(300);
/// Shortest allowed time between cycles.
pub const MIN_CYCLE_INTERVAL: Duration = Duration::from_secs(60);
/// Pause after a failed cycle.
pub const ERROR_COOLDOWN: Duration = Duration::from_secs(30);

/// Lifecycle of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverState {
    /// No broker connection.
    Disconnected,
    /// Trying to open a broker connection.
    Connecting,
    /// Producing cycles.
    Running,
    /// Stop requested, releasing the connection.
    ShuttingDown,
    /// Terminal.
    Stopped,
}

/// Timing and addressing for the driver.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Broker bootstrap servers.
    pub servers: Vec<String>,
    /// Topic every record goes to.
    pub topic: String,
    /// Sleep between successful cycles.
    pub cycle_interval: Duration,
    /// Sleep after a failed cycle.
    pub error_cooldown: Duration,
    /// Connect retry policy.
    pub connect_backoff: Backoff,
    /// Per-record acknowledgement timeout.
    pub ack_timeout: Duration,
}

impl DriverSettings {
    /// Settings with the standard cooldown, connect backoff and ack timeout.
    pub fn new(servers: Vec<String>, topic: &str, cycle_interval: Duration) -> Self {
        Self {
            servers,
            topic: topic.to_string(),
            cycle_interval,
            error_cooldown: ERROR_COOLDOWN,
            connect_backoff: Backoff::BROKER_CONNECT,
            ack_timeout: ACK_TIMEOUT,
        }
    }
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// What the refresh check did.
    pub outcome: RefreshOutcome,
    /// Tag carried by every record of the cycle.
    pub provenance: Provenance,
    /// Records acknowledged.
    pub published: usize,
    /// Records built.
    pub total: usize,
}

enum Exit {
    Stop,
    Disconnected(String),
}

/// Runs the refresh/build/publish loop against brokers opened by `C`.
pub struct CycleDriver<C: Connector, R: Rng> {
    connector: C,
    settings: DriverSettings,
    store: BaselineStore,
    refresh: RefreshPolicy,
    volatility: VolatilityTable,
    rng: R,
    sleeper: Box<dyn Sleeper>,
    status: StatusBoard,
    state: DriverState,
}

impl<C: Connector, R: Rng> CycleDriver<C, R> {
    /// Driver over the full instrument set with default baselines.
    pub fn new(
        connector: C,
        settings: DriverSettings,
        refresh: RefreshPolicy,
        volatility: VolatilityTable,
        rng: R,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            connector,
            settings,
            store: BaselineStore::with_defaults(&Instrument::all()),
            refresh,
            volatility,
            rng,
            sleeper,
            status: StatusBoard::new(),
            state: DriverState::Disconnected,
        }
    }

    /// Report into `status` instead of a private board.
    pub fn with_status(mut self, status: StatusBoard) -> Self {
        self.status = status;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Current baselines.
    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Board this driver reports into.
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Run until stopped. Returns an error only when the broker cannot be reached.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.set_state(DriverState::Connecting);
            let mut publisher = match self.connect() {
                Ok(publisher) => publisher,
                Err(RetryError::Interrupted { .. }) => {
                    self.set_state(DriverState::Stopped);
                    return Ok(());
                }
                Err(RetryError::Exhausted { attempts, last }) => {
                    self.set_state(DriverState::Stopped);
                    let err = ProducerError::BrokerConnectFailure {
                        attempts,
                        reason: last.to_string(),
                    };
                    error!("{}", err);
                    return Err(err);
                }
            };

            info!("Connected to brokers {}", self.settings.servers.join(","));
            self.set_state(DriverState::Running);

            match self.run_connected(&mut publisher) {
                Exit::Stop => {
                    self.set_state(DriverState::ShuttingDown);
                    publisher.close();
                    self.set_state(DriverState::Stopped);
                    info!("Producer stopped");
                    return Ok(());
                }
                Exit::Disconnected(reason) => {
                    warn!("Broker connection lost: {}. Reconnecting", reason);
                    publisher.close();
                    self.set_state(DriverState::Disconnected);
                }
            }
        }
    }

    /// One refresh/build/publish pass over `publisher`.
    ///
    /// Fails with [`ProducerError::BrokerDisconnected`] if any record reported a lost
    /// connection; every record has still been attempted by then.
    pub fn run_cycle(&mut self, publisher: &mut Publisher<C::Connection>) -> Result<CycleReport> {
        let outcome = self.refresh.maybe_refresh(Instant::now(), &mut self.store);
        let records = build_cycle(
            &self.store,
            &self.volatility,
            outcome,
            Utc::now(),
            &mut self.rng,
        );
        let report = publisher.publish_all(&records);
        let provenance = if outcome.is_live() {
            Provenance::Live
        } else {
            Provenance::Simulated
        };
        info!(
            "Published {}/{} records ({})",
            report.succeeded, report.attempted, provenance
        );

        let baselines = self.store.snapshot();
        let last_refresh = self
            .refresh
            .last_success_at()
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));
        let updated = self.status.update(|s| {
            s.cycles += 1;
            s.records_published += report.succeeded as u64;
            s.publish_failures += report.failures.len() as u64;
            s.baselines = baselines;
            s.last_refresh = last_refresh;
        });

        // A lost broker outranks a status failure: only the former triggers reconnect.
        if let Some(lost) = report.disconnect() {
            if let Err(e) = updated {
                error!("Could not report cycle: {}", e);
            }
            return Err(ProducerError::BrokerDisconnected(lost.to_string()));
        }
        updated?;
        Ok(CycleReport {
            outcome,
            provenance,
            published: report.succeeded,
            total: report.attempted,
        })
    }

    fn connect(&self) -> std::result::Result<Publisher<C::Connection>, RetryError<BrokerError>> {
        let connector = &self.connector;
        let servers = &self.settings.servers;
        let broker = retry(
            self.settings.connect_backoff,
            self.sleeper.as_ref(),
            |attempt| {
                info!(
                    "Connecting to brokers {} (attempt {})",
                    servers.join(","),
                    attempt
                );
                connector.connect(servers)
            },
        )?;
        Ok(Publisher::with_timeout(
            broker,
            &self.settings.topic,
            self.settings.ack_timeout,
        ))
    }

    fn run_connected(&mut self, publisher: &mut Publisher<C::Connection>) -> Exit {
        loop {
            let wait = match self.run_cycle(publisher) {
                Ok(_) => self.settings.cycle_interval,
                Err(ProducerError::BrokerDisconnected(reason)) => {
                    return Exit::Disconnected(reason);
                }
                Err(e) => {
                    error!(
                        "Error in producer loop: {}. Retrying in {}s",
                        e,
                        self.settings.error_cooldown.as_secs()
                    );
                    self.settings.error_cooldown
                }
            };
            if self.sleeper.sleep(wait) == Wake::Stopped {
                return Exit::Stop;
            }
        }
    }

    fn set_state(&mut self, state: DriverState) {
        self.state = state;
        let connected = state == DriverState::Running;
        if let Err(e) = self.status.update(|s| {
            s.state = state;
            s.connected = connected;
        }) {
            error!("Could not report state {:?}: {}", state, e);
        }
    }
}
