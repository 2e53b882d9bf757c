//! Interruptible waiting.
//!
//! Every wait in the producer (cycle interval, error cooldown, connect backoff) goes
//! through a [`Sleeper`], so a stop signal cuts it short and tests can record the
//! requested durations instead of sleeping.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full duration passed.
    Elapsed,
    /// A stop was requested.
    Stopped,
}

/// Something that can wait for a while.
pub trait Sleeper {
    /// Wait up to `duration`.
    fn sleep(&self, duration: Duration) -> Wake;
}

/// Sleeper driven by a stop channel.
///
/// Once a stop has been observed it is latched: every later wait returns
/// [`Wake::Stopped`] immediately.
pub struct ShutdownSignal {
    rx: Receiver<()>,
    stopped: AtomicBool,
}

impl ShutdownSignal {
    /// Create the signal together with the sender that triggers it.
    pub fn new() -> (Sender<()>, Self) {
        let (tx, rx) = bounded(1);
        (
            tx,
            Self {
                rx,
                stopped: AtomicBool::new(false),
            },
        )
    }

    /// Non-blocking check.
    pub fn is_stopped(&self) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return true;
        }
        if self.rx.try_recv().is_ok() {
            self.stopped.store(true, Ordering::SeqCst);
        }
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Sleeper for ShutdownSignal {
    fn sleep(&self, duration: Duration) -> Wake {
        if self.is_stopped() {
            return Wake::Stopped;
        }
        match self.rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => Wake::Elapsed,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.stopped.store(true, Ordering::SeqCst);
                Wake::Stopped
            }
        }
    }
}

/// Route Ctrl+C / SIGTERM into `tx`.
pub fn install_ctrlc(tx: Sender<()>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        log::info!("Stop signal received, shutting down producer...");
        let _ = tx.try_send(());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn elapses_without_a_signal() {
        let (_tx, signal) = ShutdownSignal::new();
        assert_eq!(signal.sleep(Duration::from_millis(10)), Wake::Elapsed);
        assert!(!signal.is_stopped());
    }

    #[test]
    fn stop_interrupts_and_latches() {
        let (tx, signal) = ShutdownSignal::new();
        tx.send(()).unwrap();

        let started = Instant::now();
        assert_eq!(signal.sleep(Duration::from_secs(30)), Wake::Stopped);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(signal.sleep(Duration::from_secs(30)), Wake::Stopped);
        assert!(signal.is_stopped());
    }

    #[test]
    fn dropped_sender_counts_as_stop() {
        let (tx, signal) = ShutdownSignal::new();
        drop(tx);
        assert_eq!(signal.sleep(Duration::from_secs(30)), Wake::Stopped);
    }
}
