//! # Graha-Nav: exploration controller for a line-following planet explorer
//!
//! Drives the robot from junction to junction, reports every path to the
//! mothership and builds the planet graph from its confirmations.
//!
//! - [`explorer`]: the exploration loop
//! - [`protocol`]: wire messages and the request/acknowledge session
//! - [`transport`]: publish/subscribe abstraction and an in-process bus
//! - [`hardware`]: sensor and motor traits, line steering
//! - [`sim`]: simulated robot and mothership over a known planet
//! - [`config`]: TOML configuration

pub mod config;
pub mod error;
pub mod explorer;
pub mod hardware;
pub mod protocol;
pub mod sim;
pub mod transport;

pub use config::NavConfig;
pub use error::{NavError, Result};
pub use explorer::{Explorer, Outcome};
pub use protocol::Session;
