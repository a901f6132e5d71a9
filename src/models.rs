use rand::Rng;
use std::fmt;

pub const READING_MIN: f64 = 20.0;
pub const READING_MAX: f64 = 30.0;

/// A simulated temperature, already rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading(f64);

impl Reading {
    /// Samples uniformly from `[READING_MIN, READING_MAX]`.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        let raw = rng.gen_range(READING_MIN..=READING_MAX);
        Self((raw * 100.0).round() / 100.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Plain decimal text, always two fractional digits (`"24.30"`, not `"24.3"`).
    pub fn to_payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// What the network driver reports back to the publisher/subscriber logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// `reason_code` is the CONNACK return code; `None` when the transport failed
    /// before the broker could answer.
    ConnectResult {
        success: bool,
        reason_code: Option<u8>,
    },
    MessageReceived {
        topic: String,
        payload: Vec<u8>,
    },
}

impl BrokerEvent {
    pub fn connected() -> Self {
        BrokerEvent::ConnectResult {
            success: true,
            reason_code: Some(0),
        }
    }

    pub fn connect_failed(reason_code: Option<u8>) -> Self {
        BrokerEvent::ConnectResult {
            success: false,
            reason_code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Subscriber only, reachable from `Connected`.
    Subscribed,
}
