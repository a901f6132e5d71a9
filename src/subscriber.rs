use crate::models::{BrokerEvent, ConnectionState};
use crate::mqtt_service::BrokerClient;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberReport {
    pub subscriptions: u64,
    pub messages: u64,
    pub connect_failures: u64,
}

/// Subscribes to `topic` on every successful connect and logs each payload
/// received on it. Returns once the event stream closes.
pub async fn run<C: BrokerClient>(
    client: &C,
    events: &mut UnboundedReceiver<BrokerEvent>,
    topic: &str,
) -> SubscriberReport {
    let mut report = SubscriberReport::default();
    let mut state = ConnectionState::Connecting;

    while let Some(event) = events.recv().await {
        match event {
            BrokerEvent::ConnectResult { success: true, .. } => {
                info!("Connected to the MQTT broker.");
                state = ConnectionState::Connected;

                match client.subscribe(topic).await {
                    Ok(()) => {
                        info!("Subscribed to topic: {}", topic);
                        state = ConnectionState::Subscribed;
                        report.subscriptions += 1;
                    }
                    Err(e) => warn!("Failed to subscribe to '{}': {}", topic, e),
                }
            }
            BrokerEvent::ConnectResult {
                success: false,
                reason_code,
            } => {
                error!(
                    "Error connecting to the MQTT broker (reason code {:?}).",
                    reason_code
                );
                state = ConnectionState::Disconnected;
                report.connect_failures += 1;
            }
            BrokerEvent::MessageReceived {
                topic: received_on,
                payload,
            } => {
                if received_on == topic {
                    info!("Message received: {}", String::from_utf8_lossy(&payload));
                    report.messages += 1;
                } else {
                    debug!("Ignoring message on '{}' while {:?}.", received_on, state);
                }
            }
        }
    }

    debug!("MQTT event stream closed.");
    report
}
