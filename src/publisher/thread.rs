//! Background publisher loop.
//!
//! A single logical publisher per process: a thread that drains the outbox
//! on a fixed interval, wakes early on demand, and stops cleanly between
//! records.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::store::OutboxStore;

use super::drain::OutboxPublisher;

enum Signal {
    Wake,
    Stop,
}

/// Totals over the lifetime of a publisher thread.
#[derive(Debug, Default, Clone)]
pub struct PublisherStats {
    pub polls: usize,
    pub delivered: usize,
    pub failed: usize,
    pub quarantined: usize,
}

/// A background thread that runs an [`OutboxPublisher`] on an interval.
///
/// ## Example
///
/// ```ignore
/// let publisher = OutboxPublisher::new(store.clone(), Arc::new(registry));
/// let worker = PublisherThread::spawn(publisher, Duration::from_secs(5));
///
/// // ... commit aggregates; optionally worker.wake() for low latency ...
///
/// let stats = worker.stop();
/// println!("delivered {} records", stats.delivered);
/// ```
pub struct PublisherThread {
    control_tx: Sender<Signal>,
    handle: Option<JoinHandle<PublisherStats>>,
}

impl PublisherThread {
    /// Spawn the loop. Each iteration drains one batch, then waits out the
    /// poll interval unless woken or stopped. Shutdown lands between
    /// records, never mid-mutation.
    pub fn spawn<S>(publisher: OutboxPublisher<S>, poll_interval: Duration) -> Self
    where
        S: OutboxStore + 'static,
    {
        let (control_tx, control_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = PublisherStats::default();

            loop {
                stats.polls += 1;
                let result = publisher.run_once();
                stats.delivered += result.delivered;
                stats.failed += result.failed;
                stats.quarantined += result.quarantined;

                match control_rx.recv_timeout(poll_interval) {
                    Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    Ok(Signal::Wake) | Err(RecvTimeoutError::Timeout) => {}
                }
            }

            stats
        });

        Self {
            control_tx,
            handle: Some(handle),
        }
    }

    /// Skip the rest of the current wait and poll now.
    pub fn wake(&self) {
        let _ = self.control_tx.send(Signal::Wake);
    }

    /// Signal the loop to stop and wait for it to finish.
    /// Returns the lifetime statistics.
    pub fn stop(mut self) -> PublisherStats {
        let _ = self.control_tx.send(Signal::Stop);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            PublisherStats::default()
        }
    }

    /// Signal the loop to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.control_tx.send(Signal::Stop);
    }
}

impl Drop for PublisherThread {
    fn drop(&mut self) {
        let _ = self.control_tx.send(Signal::Stop);
        // Don't join on drop - let the thread finish naturally
    }
}
