//! Wheel encoder-based odometry for a differential drive robot.
//!
//! Integrates wheel tick deltas into a continuous pose between two
//! confirmed junctions. The pose is reset onto the mothership-confirmed
//! position at every node, so the estimate never drifts across more than
//! one path.
//!
//! # Frame
//!
//! Compass frame: `gamma` is the heading in radians, 0 = north, clockwise
//! positive. +y points north, +x points east. Lengths are centimetres.

use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::planet::{Node, Position};

/// Wheel geometry and grid spacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdometryConfig {
    /// Distance between the wheel contact points (cm)
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f32,

    /// Wheel diameter (cm)
    #[serde(default = "default_wheel_diameter")]
    pub wheel_diameter: f32,

    /// Encoder ticks per wheel revolution
    #[serde(default = "default_ticks_per_revolution")]
    pub ticks_per_revolution: f32,

    /// Distance between neighbouring grid nodes (cm)
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
}

fn default_wheel_base() -> f32 {
    7.5
}
fn default_wheel_diameter() -> f32 {
    5.6
}
fn default_ticks_per_revolution() -> f32 {
    360.0
}
fn default_cell_size() -> f32 {
    50.0
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            wheel_base: default_wheel_base(),
            wheel_diameter: default_wheel_diameter(),
            ticks_per_revolution: default_ticks_per_revolution(),
            cell_size: default_cell_size(),
        }
    }
}

impl OdometryConfig {
    /// Distance travelled by a wheel per encoder tick (cm).
    #[inline]
    pub fn cm_per_tick(&self) -> f32 {
        PI * self.wheel_diameter / self.ticks_per_revolution
    }

    /// Convert a distance in cm to the nearest whole number of ticks.
    #[inline]
    pub fn ticks_for(&self, cm: f32) -> i32 {
        (cm / self.cm_per_tick()).round() as i32
    }
}

/// Continuous pose estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// East (cm)
    pub x: f32,
    /// North (cm)
    pub y: f32,
    /// Compass heading in radians, `[0, 2π)`
    pub gamma: f32,
}

impl Pose {
    /// Heading in degrees, `[0, 360)`.
    pub fn gamma_degrees(&self) -> f32 {
        self.gamma.to_degrees()
    }
}

/// Dead-reckoning integrator.
#[derive(Clone, Debug)]
pub struct Odometry {
    config: OdometryConfig,
    pose: Pose,
}

impl Odometry {
    /// Create an odometry integrator at the origin, facing north.
    pub fn new(config: OdometryConfig) -> Self {
        Self {
            config,
            pose: Pose::default(),
        }
    }

    pub fn config(&self) -> &OdometryConfig {
        &self.config
    }

    /// Current pose estimate.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Integrate one sample of wheel tick deltas.
    ///
    /// Uses the chord of the driven arc: for a turn angle `alpha` the robot
    /// moves `((dR + dL) / alpha) * sin(alpha / 2)` along the mid-arc
    /// heading. Straight motion (`alpha == 0`) is handled separately.
    pub fn accumulate(&mut self, delta_right: i32, delta_left: i32) {
        if delta_right == 0 && delta_left == 0 {
            return;
        }

        let per_tick = self.config.cm_per_tick();
        let dist_right = delta_right as f32 * per_tick;
        let dist_left = delta_left as f32 * per_tick;

        let alpha = (dist_right - dist_left) / self.config.wheel_base;
        let straight = if alpha != 0.0 {
            ((dist_right + dist_left) / alpha) * (alpha / 2.0).sin()
        } else {
            dist_right
        };

        // Right wheel ahead turns the robot counter-clockwise (heading decreases)
        self.pose.gamma = normalize_heading(self.pose.gamma - alpha);
        let mid_heading = self.pose.gamma + alpha / 2.0;
        self.pose.x += mid_heading.sin() * straight;
        self.pose.y += mid_heading.cos() * straight;
    }

    /// Place the integrator on the centre of `position.node`, facing
    /// `position.direction`.
    pub fn reset_to(&mut self, position: Position) {
        self.pose = Pose {
            x: position.node.x as f32 * self.config.cell_size,
            y: position.node.y as f32 * self.config.cell_size,
            gamma: position.direction.radians(),
        };
    }

    /// Nearest grid node for the accumulated position.
    pub fn quantize_to_node(&self, cell_size: f32) -> Node {
        Node::new(
            (self.pose.x / cell_size).round() as i32,
            (self.pose.y / cell_size).round() as i32,
        )
    }

    /// Heading snapped to a cardinal direction.
    pub fn heading(&self) -> Direction {
        gamma_to_direction(self.pose.gamma_degrees())
    }

    /// Quantized node and heading.
    pub fn estimate(&self) -> Position {
        Position::new(self.quantize_to_node(self.config.cell_size), self.heading())
    }
}

/// Snap a heading in degrees to the nearest cardinal direction.
///
/// Each direction owns a 90° window centred on it. A heading exactly on a
/// window boundary belongs to the direction counter-clockwise of it
/// (45° → north, 135° → east, 225° → south, 315° → west). Non-finite input
/// maps to north.
pub fn gamma_to_direction(gamma_degrees: f32) -> Direction {
    if !gamma_degrees.is_finite() {
        return Direction::North;
    }
    let normalized = gamma_degrees.rem_euclid(360.0);
    if normalized >= 360.0 {
        // rem_euclid can round up to exactly 360 for tiny negative input
        return gamma_to_direction(normalized - 360.0);
    }
    match normalized {
        d if d <= 45.0 => Direction::North,
        d if d <= 135.0 => Direction::East,
        d if d <= 225.0 => Direction::South,
        d if d <= 315.0 => Direction::West,
        _ => Direction::North,
    }
}

/// Wrap a heading in radians into `[0, 2π)`.
#[inline]
fn normalize_heading(gamma: f32) -> f32 {
    let wrapped = gamma.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}
