//! Simulation of the robot and the mothership
//!
//! Lets the controller run end to end without hardware or a broker: a
//! [`PlanetMap`] holds the true planet, [`SimRobot`] drives over it and the
//! [`Mothership`] answers over a [`LoopbackBus`](crate::transport::LoopbackBus).

mod mothership;
mod planet_map;
mod robot;

pub use mothership::{Finish, Mothership};
pub use planet_map::{PlanetMap, Target, TruePath};
pub use robot::SimRobot;
