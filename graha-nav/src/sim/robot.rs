//! Simulated line-following robot
//!
//! Drives over a [`PlanetMap`] and produces the wheel ticks a real robot
//! would: rotate onto the straight line to the far junction, drive it, then
//! rotate onto the arrival heading. Wheel commands only pace the motion;
//! the ticks come from the true path geometry.
//!
//! Blocked paths end in an obstacle a few samples down the line. The robot
//! has to turn around and follow the line back. Turns in place requested
//! through [`MotionSink::turn_by`] produce no ticks, since the controller
//! resets odometry after every turn.

use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use graha_map::{OdometryConfig, Position, Weight};

use super::PlanetMap;
use crate::error::HardwareError;
use crate::hardware::{LineSignal, MotionSink, MotionSource};

const DEFAULT_CHUNK_TICKS: i32 = 20;
const DEFAULT_OBSTACLE_AFTER: usize = 3;

#[derive(Clone, Debug)]
enum Motion {
    /// Standing on a junction
    Idle,
    Driving {
        plan: VecDeque<(i32, i32)>,
        arrival: Position,
    },
    /// On a blocked path, before the obstacle
    Approaching { remaining: usize, driven: usize },
    /// Turned around in front of the obstacle
    Returning { remaining: usize },
}

pub struct SimRobot {
    planet: Arc<PlanetMap>,
    config: OdometryConfig,
    chunk_ticks: i32,
    obstacle_after: usize,
    /// Junction and heading; the departure pose while on a path
    at: Position,
    motion: Motion,
    /// Ticks since the last read: `(right, left)`
    pending: (i32, i32),
    legs: usize,
    stops: usize,
}

impl SimRobot {
    /// Robot standing on the planet's start pose.
    pub fn new(planet: Arc<PlanetMap>, config: OdometryConfig) -> Self {
        let at = planet.start();
        Self {
            planet,
            config,
            chunk_ticks: DEFAULT_CHUNK_TICKS,
            obstacle_after: DEFAULT_OBSTACLE_AFTER,
            at,
            motion: Motion::Idle,
            pending: (0, 0),
            legs: 0,
            stops: 0,
        }
    }

    /// Largest wheel delta per sample.
    pub fn with_chunk_ticks(mut self, ticks: i32) -> Self {
        self.chunk_ticks = ticks.max(1);
        self
    }

    /// Samples driven on a blocked path before the obstacle shows up.
    pub fn with_obstacle_after(mut self, samples: usize) -> Self {
        self.obstacle_after = samples.max(1);
        self
    }

    /// True junction and heading. Only meaningful between paths.
    pub fn position(&self) -> Position {
        self.at
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.motion, Motion::Idle)
    }

    /// Paths started so far, blocked ones included.
    pub fn legs_driven(&self) -> usize {
        self.legs
    }

    pub fn stops(&self) -> usize {
        self.stops
    }

    fn start_leg(&mut self) -> Result<(), HardwareError> {
        let truth = self.planet.path_at(self.at).ok_or_else(|| {
            HardwareError::InvalidMotion(format!("no line leaving {}", self.at))
        })?;
        self.legs += 1;
        self.motion = match truth.weight {
            Weight::Blocked => Motion::Approaching {
                remaining: self.obstacle_after,
                driven: 0,
            },
            _ => Motion::Driving {
                plan: plan_path(&self.config, self.at, truth.end, self.chunk_ticks),
                arrival: Position::new(truth.end.node, truth.end.direction.opposite()),
            },
        };
        tracing::trace!("Sim robot leaving {} towards {}", self.at, truth.end);
        Ok(())
    }

    fn arrive(&mut self, at: Position) {
        tracing::trace!("Sim robot arrived at {}", at);
        self.at = at;
        self.motion = Motion::Idle;
    }

    fn add_ticks(&mut self, (right, left): (i32, i32)) {
        self.pending.0 += right;
        self.pending.1 += left;
    }
}

impl MotionSource for SimRobot {
    fn read_wheel_deltas(&mut self) -> Result<(i32, i32), HardwareError> {
        Ok(std::mem::take(&mut self.pending))
    }

    fn read_proximity(&mut self) -> Result<bool, HardwareError> {
        Ok(matches!(self.motion, Motion::Approaching { remaining: 0, .. }))
    }

    fn read_line_signal(&mut self) -> Result<LineSignal, HardwareError> {
        match &self.motion {
            Motion::Idle => Ok(if self.planet.path_at(self.at).is_some() {
                LineSignal::Line
            } else {
                LineSignal::Floor
            }),
            Motion::Driving { plan, arrival } if plan.is_empty() => {
                let arrival = *arrival;
                self.arrive(arrival);
                Ok(LineSignal::Junction)
            }
            Motion::Returning { remaining: 0 } => {
                let back = Position::new(self.at.node, self.at.direction.opposite());
                self.arrive(back);
                Ok(LineSignal::Junction)
            }
            _ => Ok(LineSignal::Line),
        }
    }
}

impl MotionSink for SimRobot {
    fn drive_differential(&mut self, left: f32, right: f32) -> Result<(), HardwareError> {
        if !(-1.0..=1.0).contains(&left) || !(-1.0..=1.0).contains(&right) {
            return Err(HardwareError::InvalidMotion(format!(
                "wheel command ({left}, {right}) out of range"
            )));
        }
        if self.is_idle() {
            self.start_leg()?;
        }

        let straight = (self.chunk_ticks, self.chunk_ticks);
        let step = match &mut self.motion {
            Motion::Driving { plan, .. } => plan.pop_front(),
            Motion::Approaching { remaining, driven } if *remaining > 0 => {
                *remaining -= 1;
                *driven += 1;
                Some(straight)
            }
            Motion::Returning { remaining } if *remaining > 0 => {
                *remaining -= 1;
                Some(straight)
            }
            // Pushing against the obstacle
            _ => None,
        };
        if let Some(ticks) = step {
            self.add_ticks(ticks);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        self.stops += 1;
        Ok(())
    }

    fn turn_by(&mut self, increments: i32) -> Result<(), HardwareError> {
        match self.motion {
            Motion::Idle => {
                self.at = Position::new(self.at.node, self.at.direction.rotate(increments));
                Ok(())
            }
            Motion::Approaching { driven, .. } if increments.rem_euclid(4) == 2 => {
                self.motion = Motion::Returning { remaining: driven };
                Ok(())
            }
            _ => Err(HardwareError::InvalidMotion(format!(
                "cannot turn by {increments} while on a path"
            ))),
        }
    }
}

/// Wheel tick samples that take the robot from `from` (junction and heading)
/// to the far end `end` of a path, arriving with the heading that faces away
/// from the end slot.
fn plan_path(config: &OdometryConfig, from: Position, end: Position, chunk: i32) -> VecDeque<(i32, i32)> {
    let dx = (end.node.x - from.node.x) as f32 * config.cell_size;
    let dy = (end.node.y - from.node.y) as f32 * config.cell_size;
    let arrival_heading = end.direction.opposite().radians();

    let mut plan = VecDeque::new();
    let mut heading = from.direction.radians();
    let length = dx.hypot(dy);
    if length > 0.0 {
        let bearing = dx.atan2(dy);
        push_rotation(&mut plan, config, signed_angle(heading, bearing), chunk);
        heading = bearing;
        let ticks = config.ticks_for(length);
        push_segment(&mut plan, ticks, ticks, chunk);
    }
    push_rotation(&mut plan, config, signed_angle(heading, arrival_heading), chunk);
    plan
}

/// Shortest signed angle from `from` to `to`, clockwise positive.
fn signed_angle(from: f32, to: f32) -> f32 {
    let delta = (to - from).rem_euclid(TAU);
    if delta > PI { delta - TAU } else { delta }
}

fn push_rotation(plan: &mut VecDeque<(i32, i32)>, config: &OdometryConfig, angle: f32, chunk: i32) {
    // Clockwise: left wheel forward, right wheel back
    let ticks = config.ticks_for(angle * config.wheel_base / 2.0);
    push_segment(plan, -ticks, ticks, chunk);
}

fn push_segment(plan: &mut VecDeque<(i32, i32)>, right: i32, left: i32, chunk: i32) {
    let samples = (right.abs().max(left.abs()) + chunk - 1) / chunk;
    let split = |total: i32, k: i32| (total as f32 * k as f32 / samples as f32).round() as i32;
    for k in 0..samples {
        plan.push_back((
            split(right, k + 1) - split(right, k),
            split(left, k + 1) - split(left, k),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graha_map::{Direction, Odometry};

    fn demo_robot() -> (Arc<PlanetMap>, SimRobot) {
        let planet = Arc::new(PlanetMap::demo().unwrap());
        let robot = SimRobot::new(Arc::clone(&planet), OdometryConfig::default());
        (planet, robot)
    }

    fn follow(robot: &mut SimRobot, odometry: &mut Odometry) -> LineSignal {
        for _ in 0..1000 {
            let signal = robot.read_line_signal().unwrap();
            if signal == LineSignal::Junction || robot.read_proximity().unwrap() {
                return signal;
            }
            robot.drive_differential(0.5, 0.5).unwrap();
            let (right, left) = robot.read_wheel_deltas().unwrap();
            odometry.accumulate(right, left);
        }
        panic!("robot never reached a junction");
    }

    #[test]
    fn test_every_free_path_lands_on_its_end() {
        let (planet, _) = demo_robot();
        let config = OdometryConfig::default();

        for (slot, truth) in planet.paths() {
            if truth.weight == Weight::Blocked {
                continue;
            }
            let mut odometry = Odometry::new(config.clone());
            odometry.reset_to(slot);
            for (right, left) in plan_path(&config, slot, truth.end, DEFAULT_CHUNK_TICKS) {
                odometry.accumulate(right, left);
            }
            assert_eq!(
                odometry.estimate(),
                Position::new(truth.end.node, truth.end.direction.opposite()),
                "path {} -> {}",
                slot,
                truth.end
            );
        }
    }

    #[test]
    fn test_samples_respect_chunk_size() {
        let config = OdometryConfig::default();
        let plan = plan_path(
            &config,
            Position::at(1, 2, Direction::East),
            Position::at(2, 1, Direction::West),
            DEFAULT_CHUNK_TICKS,
        );
        assert!(!plan.is_empty());
        assert!(
            plan.iter()
                .all(|(r, l)| r.abs() <= DEFAULT_CHUNK_TICKS && l.abs() <= DEFAULT_CHUNK_TICKS)
        );
    }

    #[test]
    fn test_scan_sees_true_lines() {
        let (_, mut robot) = demo_robot();
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(robot.read_line_signal().unwrap());
            robot.turn_by(1).unwrap();
        }
        // North, east, the arrival spur south, nothing west
        assert_eq!(
            seen,
            vec![LineSignal::Line, LineSignal::Line, LineSignal::Line, LineSignal::Floor]
        );
        assert_eq!(robot.position(), Position::at(0, 0, Direction::North));
    }

    #[test]
    fn test_drive_free_path() {
        let (_, mut robot) = demo_robot();
        let mut odometry = Odometry::new(OdometryConfig::default());
        odometry.reset_to(robot.position());

        assert_eq!(follow(&mut robot, &mut odometry), LineSignal::Junction);
        assert!(robot.is_idle());
        assert_eq!(robot.position(), Position::at(0, 1, Direction::North));
        assert_eq!(odometry.estimate(), robot.position());
        assert_eq!(robot.legs_driven(), 1);
    }

    #[test]
    fn test_blocked_path_turns_back() {
        let (_, mut robot) = demo_robot();
        robot.turn_by(2).unwrap();
        let mut odometry = Odometry::new(OdometryConfig::default());

        assert_eq!(follow(&mut robot, &mut odometry), LineSignal::Line);
        assert!(robot.read_proximity().unwrap());
        assert!(robot.turn_by(1).is_err());

        robot.turn_by(2).unwrap();
        assert!(!robot.read_proximity().unwrap());
        assert_eq!(follow(&mut robot, &mut odometry), LineSignal::Junction);
        assert_eq!(robot.position(), Position::at(0, 0, Direction::North));
    }

    #[test]
    fn test_no_line_rejected() {
        let (_, mut robot) = demo_robot();
        robot.turn_by(-1).unwrap();
        assert_eq!(robot.read_line_signal().unwrap(), LineSignal::Floor);
        assert!(matches!(
            robot.drive_differential(0.5, 0.5),
            Err(HardwareError::InvalidMotion(_))
        ));
        assert!(robot.drive_differential(1.5, 0.0).is_err());
    }
}
