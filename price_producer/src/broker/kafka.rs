//! Kafka producer built on librdkafka.
//!
//! Uses a `BaseProducer` so the whole pipeline stays on plain threads. Every record is
//! sent with a sequence number as its delivery opaque; the delivery callback forwards
//! `(sequence, outcome)` over a crossbeam channel and `publish` polls the producer until
//! its own sequence number comes back or the timeout elapses. Reports for records that
//! already timed out are drained and dropped.

use super::{Ack, Broker, BrokerError, Connector};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use rdkafka::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::producer::{BaseProducer, BaseRecord, DeliveryResult, Producer, ProducerContext};
use std::time::{Duration, Instant};

/// Time allowed for the metadata round-trip that validates a new connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed to flush in-flight records on close.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type DeliveryReport = (usize, Result<Ack, BrokerError>);

/// Producer context that reports delivery outcomes over a channel.
pub struct DeliveryReporter {
    tx: Sender<DeliveryReport>,
}

impl ClientContext for DeliveryReporter {}

impl ProducerContext for DeliveryReporter {
    type DeliveryOpaque = usize;

    fn delivery(&self, result: &DeliveryResult<'_>, sequence: Self::DeliveryOpaque) {
        let outcome = match result {
            Ok(message) => Ok(Ack {
                partition: message.partition(),
                offset: message.offset(),
            }),
            Err((err, _)) => Err(err),
        };
        self.report(sequence, outcome);
    }
}

impl DeliveryReporter {
    fn report(&self, sequence: usize, outcome: Result<Ack, &KafkaError>) {
        if self.tx.send((sequence, outcome.map_err(classify))).is_err() {
            debug!("Delivery report for {} dropped, producer closed", sequence);
        }
    }
}

/// Open Kafka connection.
pub struct KafkaBroker {
    producer: BaseProducer<DeliveryReporter>,
    reports: Receiver<DeliveryReport>,
    next_sequence: usize,
}

fn classify(err: &KafkaError) -> BrokerError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::AllBrokersDown) | Some(RDKafkaErrorCode::Fatal) => {
            BrokerError::Disconnected(err.to_string())
        }
        _ => BrokerError::Delivery(err.to_string()),
    }
}

impl Broker for KafkaBroker {
    fn publish(
        &mut self,
        topic: &str,
        key: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Ack, BrokerError> {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let record = BaseRecord::with_opaque_to(topic, sequence)
            .key(key)
            .payload(payload);
        self.producer
            .send(record)
            .map_err(|(err, _)| classify(&err))?;

        let deadline = Instant::now() + timeout;
        loop {
            self.producer.poll(POLL_INTERVAL);
            while let Ok((acked, outcome)) = self.reports.try_recv() {
                if acked == sequence {
                    return outcome;
                }
                debug!("Discarding late delivery report for record {}", acked);
            }
            if Instant::now() >= deadline {
                return Err(BrokerError::Timeout(timeout));
            }
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.producer.flush(FLUSH_TIMEOUT) {
            warn!("Kafka flush on close failed: {}", e);
        }
    }
}

/// Connector that builds [`KafkaBroker`]s.
pub struct KafkaConnector {
    /// Broker-side delivery timeout, also used as the librdkafka message timeout.
    pub message_timeout: Duration,
}

impl Connector for KafkaConnector {
    type Connection = KafkaBroker;

    fn connect(&self, servers: &[String]) -> Result<Self::Connection, BrokerError> {
        let (tx, reports) = unbounded();
        let producer: BaseProducer<DeliveryReporter> = ClientConfig::new()
            .set("bootstrap.servers", servers.join(","))
            .set("acks", "all")
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            )
            .create_with_context(DeliveryReporter { tx })
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        producer
            .client()
            .fetch_metadata(None, CONNECT_TIMEOUT)
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        Ok(KafkaBroker {
            producer,
            reports,
            next_sequence: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_errors_are_classified() {
        let (tx, rx) = unbounded();
        let reporter = DeliveryReporter { tx };

        let down = KafkaError::MessageProduction(RDKafkaErrorCode::AllBrokersDown);
        reporter.report(3, Err(&down));
        let fatal = KafkaError::MessageProduction(RDKafkaErrorCode::Fatal);
        reporter.report(4, Err(&fatal));
        let too_large = KafkaError::MessageProduction(RDKafkaErrorCode::MessageSizeTooLarge);
        reporter.report(5, Err(&too_large));
        reporter.report(6, Ok(Ack { partition: 0, offset: 9 }));

        assert!(matches!(rx.recv().unwrap(), (3, Err(BrokerError::Disconnected(_)))));
        assert!(matches!(rx.recv().unwrap(), (4, Err(BrokerError::Disconnected(_)))));
        assert!(matches!(rx.recv().unwrap(), (5, Err(BrokerError::Delivery(_)))));
        assert_eq!(rx.recv().unwrap(), (6, Ok(Ack { partition: 0, offset: 9 })));
    }
}
