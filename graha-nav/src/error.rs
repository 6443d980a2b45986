//! Error types for GrahaNav

use std::time::Duration;

use thiserror::Error;

use crate::protocol::PathStatus;

/// GrahaNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;

/// Publish/subscribe transport failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),

    #[error("failed to start dispatch thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Sensor and motor failures. Fatal to the run.
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("hardware unavailable: {0}")]
    Unavailable(String),

    #[error("no junction reached within {0} drive samples")]
    DriveLimit(usize),

    #[error("invalid motion: {0}")]
    InvalidMotion(String),
}

/// Request/acknowledge failures between the controller and the mothership.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("a {0} request is already pending")]
    Busy(&'static str),

    #[error("no acknowledgement for {request} after {waited:?}")]
    AckTimeout {
        request: &'static str,
        waited: Duration,
    },

    #[error("rejected by mothership: {0}")]
    Rejected(String),

    #[error("no planet assigned yet")]
    NotAssigned,

    #[error("inbound channel disconnected")]
    Disconnected,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Reasons an inbound message is rejected before it reaches the graph.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid path weight {0}")]
    InvalidWeight(i64),

    #[error("{0} payload has no pathWeight")]
    MissingWeight(String),

    #[error("path status {status:?} contradicts weight {weight}")]
    StatusMismatch { status: PathStatus, weight: i64 },

    #[error("unknown message type {0:?}")]
    UnknownKind(String),
}
