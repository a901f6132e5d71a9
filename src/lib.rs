pub mod config;
pub mod models;
pub mod mqtt_service;
pub mod publisher;
pub mod service_utils;
pub mod subscriber;

#[cfg(test)]
mod test_support;
