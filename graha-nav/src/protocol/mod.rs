//! Mothership protocol: wire messages, the request/acknowledge session and
//! the silence watchdog.

pub mod messages;
mod session;
mod watchdog;

pub use messages::{AckKind, Envelope, Inbound, Outbound, PathStatus, PathUpdate, Sender};
pub use session::{Ack, Session};
pub use watchdog::Watchdog;
