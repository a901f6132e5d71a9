use crate::mqtt_service::{BrokerClient, MqttError};
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::subscriber::DefaultGuard;
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Publish { topic: String, payload: String },
    Subscribe(String),
    Disconnect,
}

/// Records every call instead of talking to a broker.
#[derive(Default)]
pub struct FakeClient {
    calls: Mutex<Vec<Call>>,
    fail_publish: bool,
    fail_subscribe: bool,
    on_first_publish: Option<Arc<Notify>>,
}

impl FakeClient {
    pub fn failing_publishes(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    pub fn failing_subscribes(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn notify_on_first_publish(mut self, notify: Arc<Notify>) -> Self {
        self.on_first_publish = Some(notify);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Publish { topic, payload } => Some((topic, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Subscribe(topic) => Some(topic),
                _ => None,
            })
            .collect()
    }

    pub fn disconnects(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == Call::Disconnect)
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BrokerClient for FakeClient {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), MqttError> {
        let first = self.published().is_empty();
        self.record(Call::Publish {
            topic: topic.to_string(),
            payload,
        });
        if first {
            if let Some(notify) = &self.on_first_publish {
                notify.notify_one();
            }
        }
        if self.fail_publish {
            return Err(MqttError::Driver("network loop stopped".to_string()));
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        self.record(Call::Subscribe(topic.to_string()));
        if self.fail_subscribe {
            return Err(MqttError::Driver("network loop stopped".to_string()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        self.record(Call::Disconnect);
        Ok(())
    }
}

/// Collects fmt output for the current thread while the returned guard lives.
/// Works with `#[tokio::test]`, whose runtime stays on the test thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn at_level(&self, level: &str) -> Vec<String> {
        let tag = format!(" {} ", level);
        self.lines()
            .into_iter()
            .filter(|line| line.contains(&tag))
            .collect()
    }

    pub fn count_containing(&self, text: &str) -> usize {
        self.lines().iter().filter(|line| line.contains(text)).count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
