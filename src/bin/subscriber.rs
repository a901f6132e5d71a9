use sensor_relay::config::{Config, ROOM_TOPIC};
use sensor_relay::mqtt_service::MqttConnection;
use sensor_relay::service_utils::{init_logging, new_client_id};
use sensor_relay::subscriber;
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

    let (connection, mut events) = MqttConnection::connect(&config, &new_client_id("subscriber"));

    // no orderly shutdown here; ctrl-c simply ends the process
    tokio::select! {
        report = subscriber::run(&connection, &mut events, ROOM_TOPIC) => {
            info!("Subscriber stopped after {} messages.", report.messages);
        }
        _ = tokio::signal::ctrl_c() => {}
    }
}
