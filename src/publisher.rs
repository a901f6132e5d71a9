use crate::models::{BrokerEvent, ConnectionState, Reading};
use crate::mqtt_service::BrokerClient;
use rand::Rng;
use std::future::Future;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublisherReport {
    /// Ticks that produced publishes (ticks while disconnected are skipped).
    pub ticks: u64,
    pub published: u64,
    pub connect_failures: u64,
}

/// Publishes one fresh [`Reading`] per topic on every tick, but only while the
/// broker has acknowledged the connection.
pub struct Publisher<'a, C> {
    client: &'a C,
    topics: &'a [&'a str],
    period: Duration,
}

impl<'a, C: BrokerClient> Publisher<'a, C> {
    pub fn new(client: &'a C, topics: &'a [&'a str], period: Duration) -> Self {
        Self {
            client,
            topics,
            period,
        }
    }

    /// Runs until `shutdown` resolves, then disconnects exactly once.
    ///
    /// A tick already in progress finishes before shutdown is honoured, and no
    /// tick starts afterwards.
    pub async fn run<R, S>(
        &self,
        events: &mut UnboundedReceiver<BrokerEvent>,
        rng: &mut R,
        shutdown: S,
    ) -> PublisherReport
    where
        R: Rng,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut report = PublisherReport::default();
        let mut state = ConnectionState::Connecting;
        let mut events_open = true;

        // first tick completes immediately, so publishing starts right after CONNACK
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                event = events.recv(), if events_open => match event {
                    Some(BrokerEvent::ConnectResult { success: true, .. }) => {
                        info!("Connected to the MQTT broker.");
                        state = ConnectionState::Connected;
                    }
                    Some(BrokerEvent::ConnectResult { success: false, reason_code }) => {
                        error!("Error connecting to the MQTT broker (reason code {:?}).", reason_code);
                        report.connect_failures += 1;
                        state = ConnectionState::Disconnected;
                    }
                    Some(BrokerEvent::MessageReceived { topic, .. }) => {
                        debug!("Ignoring message on '{}'.", topic);
                    }
                    None => {
                        warn!("MQTT event stream closed, waiting for shutdown.");
                        events_open = false;
                        state = ConnectionState::Disconnected;
                    }
                },

                _ = ticker.tick(), if state == ConnectionState::Connected => {
                    report.published += self.publish_tick(rng).await;
                    report.ticks += 1;
                }
            }
        }

        self.shutdown().await;
        report
    }

    /// Publishes one independently sampled reading to each topic. Failures are
    /// logged and otherwise ignored.
    async fn publish_tick<R: Rng>(&self, rng: &mut R) -> u64 {
        let mut sent = 0;
        for topic in self.topics {
            let reading = Reading::sample(rng);
            match self.client.publish(topic, reading.to_payload()).await {
                Ok(()) => {
                    info!("Published {} to '{}'.", reading, topic);
                    sent += 1;
                }
                Err(e) => warn!("Failed to publish to '{}': {}", topic, e),
            }
        }
        sent
    }

    async fn shutdown(&self) {
        info!("Disconnecting from the MQTT broker...");
        if let Err(e) = self.client.disconnect().await {
            warn!("Disconnect did not complete cleanly: {}", e);
        }
        info!("Disconnected.");
    }
}
