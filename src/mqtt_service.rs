use crate::config::Config;
use crate::models::BrokerEvent;
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Outgoing, Packet, QoS,
};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// How long `disconnect` waits for the network loop to flush the DISCONNECT packet.
const DRIVER_STOP_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_CAPACITY: usize = 10;

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("MQTT client error: {0}")]
    Client(#[from] ClientError),
    #[error("MQTT network loop failed: {0}")]
    Driver(String),
}

/// The operations publisher and subscriber need from a broker connection.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), MqttError>;
    async fn subscribe(&self, topic: &str) -> Result<(), MqttError>;
    /// Stops the background network loop and closes the session.
    async fn disconnect(&self) -> Result<(), MqttError>;
}

/// rumqttc-backed connection. The event loop runs on its own task and reports
/// through the channel returned by [`MqttConnection::connect`].
pub struct MqttConnection {
    client: AsyncClient,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl MqttConnection {
    /// Starts connecting in the background. Must be called inside a tokio runtime.
    pub fn connect(config: &Config, client_id: &str) -> (Self, UnboundedReceiver<BrokerEvent>) {
        debug!(
            "Configuring MQTT broker at {}:{}...",
            config.mqtt_host, config.mqtt_port
        );

        let mut mqtt_options = MqttOptions::new(client_id, &config.mqtt_host, config.mqtt_port);
        mqtt_options.set_keep_alive(config.keep_alive());
        mqtt_options.set_clean_session(true);

        if config.has_credentials() {
            mqtt_options.set_credentials(&config.mqtt_username, &config.mqtt_password);
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(eventloop, tx, config.retry_interval()));

        (
            Self {
                client,
                driver: Mutex::new(Some(driver)),
            },
            rx,
        )
    }
}

#[async_trait]
impl BrokerClient for MqttConnection {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), MqttError> {
        // never blocks on a full request queue while the broker is unreachable
        self.client.try_publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        self.client.try_subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        let requested = self.client.try_disconnect();
        if let Err(e) = &requested {
            warn!("Could not queue DISCONNECT: {}", e);
        }

        let Some(mut driver) = self.driver.lock().await.take() else {
            return requested.map_err(MqttError::from);
        };

        match timeout(DRIVER_STOP_TIMEOUT, &mut driver).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(MqttError::Driver(e.to_string())),
            Err(_) => {
                warn!("Network loop did not stop in {:?}, aborting it.", DRIVER_STOP_TIMEOUT);
                driver.abort();
            }
        }

        requested.map_err(MqttError::from)
    }
}

/// What the driver does with one rumqttc notification.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Forward(BrokerEvent),
    Ignore,
    Stop,
}

fn translate(event: Event) -> Step {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => {
            if ack.code == ConnectReturnCode::Success {
                Step::Forward(BrokerEvent::connected())
            } else {
                Step::Forward(BrokerEvent::connect_failed(Some(ack.code as u8)))
            }
        }
        Event::Incoming(Packet::Publish(publish)) => Step::Forward(BrokerEvent::MessageReceived {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
        }),
        Event::Outgoing(Outgoing::Disconnect) => Step::Stop,
        Event::Outgoing(_) => {
            debug!("Outgoing event.");
            Step::Ignore
        }
        other => {
            debug!("Unhandled event: {:?}", other);
            Step::Ignore
        }
    }
}

fn connection_failure(err: &ConnectionError) -> BrokerEvent {
    match err {
        ConnectionError::ConnectionRefused(code) => BrokerEvent::connect_failed(Some(*code as u8)),
        _ => BrokerEvent::connect_failed(None),
    }
}

async fn drive(mut eventloop: EventLoop, tx: UnboundedSender<BrokerEvent>, retry_interval: Duration) {
    loop {
        match eventloop.poll().await {
            Ok(event) => match translate(event) {
                Step::Forward(broker_event) => {
                    if tx.send(broker_event).is_err() {
                        debug!("Event receiver dropped, stopping MQTT network loop.");
                        break;
                    }
                }
                Step::Ignore => {}
                Step::Stop => {
                    debug!("DISCONNECT sent, stopping MQTT network loop.");
                    break;
                }
            },
            Err(e) => {
                // logged as an error by whoever consumes the ConnectResult
                debug!("Error in MQTT event loop: {:?}", e);
                if tx.send(connection_failure(&e)).is_err() {
                    break;
                }
                debug!("Retrying MQTT connection in {:?}...", retry_interval);
                sleep(retry_interval).await;
            }
        }
    }
}
