use tracing::{error, info, Level};
use uuid::Uuid;

/// Install the stdout fmt subscriber. Unknown level names fall back to INFO;
/// a second call is a no-op.
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Broker client ids must be unique per connection.
pub fn new_client_id(role: &str) -> String {
    format!("sensor_relay_{}_{}", role, Uuid::new_v4())
}

/// Resolves on the first ctrl-c. If the handler cannot be installed this never
/// resolves, leaving the process to be killed externally.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, shutting down..."),
        Err(e) => {
            error!("Failed to handle termination signal: {:?}", e);
            std::future::pending::<()>().await;
        }
    }
}
