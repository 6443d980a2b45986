//! Publish/subscribe transport abstraction
//!
//! The mothership link is topic based: the robot subscribes to
//! `explorer/<group>` and, once a planet is assigned, to
//! `planet/<planet>/<group>`. Delivery is at-least-once and happens on the
//! transport's own dispatch thread.

use std::sync::Arc;

use crate::error::TransportError;

mod loopback;
pub use loopback::{LoopbackBus, LoopbackClient};

/// Callback invoked for every delivered message: `(topic, payload)`.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Transport trait for mothership communication
pub trait Transport: Send {
    /// Install the inbound handler. Replaces any previous handler.
    fn set_handler(&mut self, handler: MessageHandler);

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;
}

/// Topic carrying group-level traffic (`ready`, `planet`, `done`, ...).
pub fn explorer_topic(group: &str) -> String {
    format!("explorer/{group}")
}

/// Topic carrying path traffic for one planet.
pub fn planet_topic(planet: &str, group: &str) -> String {
    format!("planet/{planet}/{group}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(explorer_topic("101"), "explorer/101");
        assert_eq!(planet_topic("Hawkeye", "101"), "planet/Hawkeye/101");
    }
}
