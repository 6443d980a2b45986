//! Hardware abstraction for the explorer robot
//!
//! Real sensor and motor drivers live outside this crate. The controller
//! only talks to these traits; the simulation implements them over a known
//! planet.

use std::ops::{Deref, DerefMut};

use crate::error::HardwareError;

/// What the line sensor currently sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineSignal {
    /// On the line
    Line,
    /// Off the line
    Floor,
    /// On a junction marker
    Junction,
}

/// Sensor side of the robot
pub trait MotionSource {
    /// Encoder ticks since the previous read: `(right, left)`.
    fn read_wheel_deltas(&mut self) -> Result<(i32, i32), HardwareError>;

    /// True when an obstacle is in front of the robot.
    fn read_proximity(&mut self) -> Result<bool, HardwareError>;

    fn read_line_signal(&mut self) -> Result<LineSignal, HardwareError>;
}

/// Actuator side of the robot
pub trait MotionSink {
    /// Set wheel commands, each in `[-1.0, 1.0]`.
    fn drive_differential(&mut self, left: f32, right: f32) -> Result<(), HardwareError>;

    /// Stop both motors immediately
    fn stop(&mut self) -> Result<(), HardwareError>;

    /// Rotate in place by quarter turns, clockwise positive. Blocks until
    /// the turn is complete.
    fn turn_by(&mut self, increments: i32) -> Result<(), HardwareError>;
}

/// Turns a line signal into wheel commands: `(left, right)`.
pub trait Steering {
    fn command(&mut self, signal: LineSignal) -> (f32, f32);
}

/// Two-state line follower: full speed on the line, sweeping arcs of
/// alternating side while searching for it.
#[derive(Clone, Debug)]
pub struct BangBang {
    base_speed: f32,
    gain: f32,
    sweep_right: bool,
}

impl BangBang {
    pub fn new(base_speed: f32, gain: f32) -> Self {
        Self {
            base_speed: base_speed.clamp(0.0, 1.0),
            gain: gain.clamp(0.0, 1.0),
            sweep_right: true,
        }
    }
}

impl Steering for BangBang {
    fn command(&mut self, signal: LineSignal) -> (f32, f32) {
        match signal {
            LineSignal::Line => (self.base_speed, self.base_speed),
            LineSignal::Floor => {
                let inner = self.base_speed * (1.0 - self.gain);
                self.sweep_right = !self.sweep_right;
                if self.sweep_right {
                    (self.base_speed, inner)
                } else {
                    (inner, self.base_speed)
                }
            }
            LineSignal::Junction => (0.0, 0.0),
        }
    }
}

/// Stops the motors when dropped, on every exit path.
pub struct StopOnDrop<'a, M: MotionSink> {
    sink: &'a mut M,
}

impl<'a, M: MotionSink> StopOnDrop<'a, M> {
    pub fn new(sink: &'a mut M) -> Self {
        Self { sink }
    }
}

impl<M: MotionSink> Deref for StopOnDrop<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        self.sink
    }
}

impl<M: MotionSink> DerefMut for StopOnDrop<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        self.sink
    }
}

impl<M: MotionSink> Drop for StopOnDrop<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.sink.stop() {
            tracing::error!("Failed to stop motors: {}", e);
        }
    }
}
