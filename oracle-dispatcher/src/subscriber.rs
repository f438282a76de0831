//! Event subscriber over the surety broadcast channel

use crate::{metrics::EVENTS_RECEIVED_TOTAL, Result};
use async_trait::async_trait;
use std::sync::Arc;
use surety_core::{EventRecord, SuretyHandle};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

/// Event handler trait
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle a committed event
    async fn handle(&self, record: EventRecord) -> Result<()>;
}

/// Delivers surety events to one handler, in commit order
///
/// The receiver and its log position are captured together on construction,
/// so no event committed after `new` returns is missed. A lagging subscriber
/// replays the skipped records from the event log.
#[derive(Debug)]
pub struct EventSubscriber {
    surety: SuretyHandle,
    receiver: broadcast::Receiver<EventRecord>,
    name: String,
    next_sequence: u64,
}

impl EventSubscriber {
    /// Create new subscriber
    pub fn new(surety: SuretyHandle, name: impl Into<String>) -> Self {
        let (receiver, next_sequence) = surety.subscribe_from_log_end();
        Self {
            surety,
            receiver,
            name: name.into(),
            next_sequence,
        }
    }

    /// Receive and dispatch until the event channel closes
    pub async fn subscribe<H>(mut self, handler: Arc<H>) -> Result<()>
    where
        H: EventHandler + ?Sized + 'static,
    {
        info!(subscriber = %self.name, "subscribed to surety events");

        loop {
            match self.receiver.recv().await {
                Ok(record) => self.dispatch(handler.as_ref(), record).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(subscriber = %self.name, skipped, "subscriber lagged, replaying from log");
                    self.catch_up(handler.as_ref()).await;
                }
                Err(RecvError::Closed) => {
                    info!(subscriber = %self.name, "event channel closed");
                    return Ok(());
                }
            }
        }
    }

    async fn catch_up<H>(&mut self, handler: &H)
    where
        H: EventHandler + ?Sized,
    {
        for record in self.surety.events_since(self.next_sequence) {
            self.dispatch(handler, record).await;
        }
    }

    async fn dispatch<H>(&mut self, handler: &H, record: EventRecord)
    where
        H: EventHandler + ?Sized,
    {
        // Replay and live delivery can overlap after a lag
        if record.sequence < self.next_sequence {
            return;
        }
        self.next_sequence = record.sequence + 1;

        let event = record.event.name();
        debug!(subscriber = %self.name, sequence = record.sequence, event, "event received");

        let status = match handler.handle(record).await {
            Ok(()) => "success",
            Err(e) => {
                error!(subscriber = %self.name, event, "Error handling event: {}", e);
                "error"
            }
        };
        EVENTS_RECEIVED_TOTAL.with_label_values(&[event, status]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::time::Duration;
    use surety_core::{spawn_surety_actor, treasury::InMemoryWallets, Config};
    use tokio::sync::Mutex;

    /// Records event names; fails on a chosen event
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, record: EventRecord) -> Result<()> {
            let name = record.event.name();
            self.seen.lock().await.push(name);
            if self.fail_on == Some(name) {
                return Err(Error::Subscribe(format!("refused {}", name)));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_delivery() {
        let config = Config::default();
        let founder = config.governance.founding_airline.clone();
        let surety = spawn_surety_actor(config, Arc::new(InMemoryWallets::new())).unwrap();

        let recorder = Arc::new(Recorder {
            fail_on: Some("flight_registered"),
            ..Default::default()
        });
        let subscriber = EventSubscriber::new(surety.clone(), "recorder");
        let task = tokio::spawn(subscriber.subscribe(recorder.clone()));

        let index = surety.register_flight(&founder, "FLT1", 1).await.unwrap();
        let key = surety.flight(index).unwrap().key;
        surety.request_status(&key).await.unwrap();

        for _ in 0..100 {
            if recorder.seen.lock().await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            *recorder.seen.lock().await,
            vec!["flight_registered", "status_requested"]
        );

        task.abort();
        surety.shutdown().await.unwrap();
    }

    /// Records sequences; blocks while the test holds `gate`
    #[derive(Default)]
    struct SlowRecorder {
        gate: Mutex<()>,
        sequences: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl EventHandler for SlowRecorder {
        async fn handle(&self, record: EventRecord) -> Result<()> {
            let _open = self.gate.lock().await;
            self.sequences.lock().await.push(record.sequence);
            Ok(())
        }
    }

    impl SlowRecorder {
        async fn wait_for(&self, count: usize) {
            for _ in 0..200 {
                if self.sequences.lock().await.len() >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }

    #[tokio::test]
    async fn test_lagging_subscriber_replays_missed_events() {
        let mut config = Config::default();
        config.actor.event_channel_capacity = 2;
        let founder = config.governance.founding_airline.clone();
        let surety = spawn_surety_actor(config, Arc::new(InMemoryWallets::new())).unwrap();

        let recorder = Arc::new(SlowRecorder::default());
        let subscriber = EventSubscriber::new(surety.clone(), "slow");

        // Overflow the channel before the first event is received
        for n in 0..5 {
            surety.register_flight(&founder, &format!("FLT{}", n), 1).await.unwrap();
        }
        let task = tokio::spawn(subscriber.subscribe(recorder.clone()));
        recorder.wait_for(5).await;
        assert_eq!(*recorder.sequences.lock().await, (0..5).collect::<Vec<u64>>());

        // Overflow it again while the handler is stalled
        let gate = recorder.gate.lock().await;
        for n in 5..10 {
            surety.register_flight(&founder, &format!("FLT{}", n), 1).await.unwrap();
        }
        drop(gate);
        recorder.wait_for(10).await;

        assert_eq!(*recorder.sequences.lock().await, (0..10).collect::<Vec<u64>>());
        assert!(!task.is_finished());

        task.abort();
        surety.shutdown().await.unwrap();
    }
}
