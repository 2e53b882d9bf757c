//! Broker that prints records instead of sending them anywhere.

use super::{Ack, Broker, BrokerError, Connector};
use log::{info, warn};
use std::io::{self, Write};
use std::time::Duration;

/// Writes `topic<TAB>key<TAB>payload` lines to any writer.
pub struct StdoutBroker<W: Write> {
    out: W,
    offset: i64,
}

impl<W: Write> StdoutBroker<W> {
    /// Wrap `out`.
    pub fn new(out: W) -> Self {
        Self { out, offset: 0 }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Broker for StdoutBroker<W> {
    fn publish(
        &mut self,
        topic: &str,
        key: &str,
        payload: &[u8],
        _timeout: Duration,
    ) -> Result<Ack, BrokerError> {
        let line = String::from_utf8_lossy(payload);
        writeln!(self.out, "{}\t{}\t{}", topic, key, line)
            .and_then(|_| self.out.flush())
            .map_err(|e| BrokerError::Disconnected(e.to_string()))?;
        let ack = Ack {
            partition: 0,
            offset: self.offset,
        };
        self.offset += 1;
        Ok(ack)
    }

    fn close(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Stdout flush on close failed: {}", e);
        }
    }
}

/// Connector for [`StdoutBroker`] on the process's standard output.
pub struct StdoutConnector;

impl Connector for StdoutConnector {
    type Connection = StdoutBroker<io::Stdout>;

    fn connect(&self, servers: &[String]) -> Result<Self::Connection, BrokerError> {
        info!(
            "Printing records to stdout instead of brokers {}",
            servers.join(",")
        );
        Ok(StdoutBroker::new(io::stdout()))
    }
}
