use rand::rngs::StdRng;
use rand::SeedableRng;
use sensor_relay::config::{Config, KITCHEN_TOPIC, PUBLISH_INTERVAL, ROOM_TOPIC};
use sensor_relay::mqtt_service::MqttConnection;
use sensor_relay::publisher::Publisher;
use sensor_relay::service_utils::{init_logging, new_client_id, shutdown_signal};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_logging(config.as_ref().map_or("info", |cfg| cfg.log_level.as_str()));

    let config = match config {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Error loading configuration: {:?}", e);
            return;
        }
    };

    info!(
        "Publishing to {}:{} every {:?}...",
        config.mqtt_host, config.mqtt_port, PUBLISH_INTERVAL
    );

    let (connection, mut events) = MqttConnection::connect(&config, &new_client_id("publisher"));
    let topics = [ROOM_TOPIC, KITCHEN_TOPIC];
    let mut rng = StdRng::from_entropy();

    let report = Publisher::new(&connection, &topics, PUBLISH_INTERVAL)
        .run(&mut events, &mut rng, shutdown_signal())
        .await;

    info!(
        "Publisher stopped after {} ticks ({} messages published).",
        report.ticks, report.published
    );
}
