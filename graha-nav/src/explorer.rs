//! Exploration controller
//!
//! Owns the planet graph, the odometry and the mothership session, and
//! drives the robot from junction to junction until the planet is mapped
//! or the announced target is reached:
//!
//! 1. Scan every node that still has unknown directions
//! 2. Apply queued mothership updates
//! 3. Pick the next direction (target route first, then frontier)
//! 4. Announce it, turn, follow the line to the next junction
//! 5. Report the path and continue from the confirmed position

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use graha_map::{Node, Odometry, OdometryConfig, PlanetGraph, Position};

use crate::config::DriveConfig;
use crate::error::{HardwareError, Result};
use crate::hardware::{BangBang, LineSignal, MotionSink, MotionSource, StopOnDrop, Steering};
use crate::protocol::{PathStatus, Session};
use crate::transport::Transport;

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing reachable left to explore
    Completed,
    TargetReached(Node),
    /// Shutdown requested
    Interrupted,
}

/// Result of following one path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Leg {
    Arrived,
    Blocked,
}

pub struct Explorer<R, T: Transport> {
    robot: R,
    session: Session<T>,
    graph: PlanetGraph,
    odometry: Odometry,
    steering: Box<dyn Steering + Send>,
    drive: DriveConfig,
    test_planet: Option<String>,
    shutdown: Arc<AtomicBool>,
    paths_driven: usize,
}

impl<R, T> Explorer<R, T>
where
    R: MotionSource + MotionSink,
    T: Transport,
{
    pub fn new(robot: R, session: Session<T>, odometry: OdometryConfig, drive: DriveConfig) -> Self {
        let steering = BangBang::new(drive.base_speed, drive.steering_gain);
        Self {
            robot,
            session,
            graph: PlanetGraph::new(),
            odometry: Odometry::new(odometry),
            steering: Box::new(steering),
            drive,
            test_planet: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            paths_driven: 0,
        }
    }

    /// Request a named test planet before announcing readiness.
    pub fn with_test_planet(mut self, name: Option<String>) -> Self {
        self.test_planet = name;
        self
    }

    /// Flag checked between steps; setting it ends the run.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_steering(mut self, steering: Box<dyn Steering + Send>) -> Self {
        self.steering = steering;
        self
    }

    pub fn graph(&self) -> &PlanetGraph {
        &self.graph
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn odometry(&self) -> &Odometry {
        &self.odometry
    }

    /// Paths driven and reported so far.
    pub fn paths_driven(&self) -> usize {
        self.paths_driven
    }

    /// Run until the planet is explored, the target is reached or a
    /// shutdown is requested.
    pub fn run(&mut self) -> Result<Outcome> {
        if let Some(name) = self.test_planet.clone() {
            tracing::info!("Requesting test planet {}", name);
            self.session.test_planet(&mut self.graph, &name)?;
        }

        let start = self.session.ready(&mut self.graph)?;
        self.odometry.reset_to(start);

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("Shutdown requested, stopping exploration");
                return Ok(Outcome::Interrupted);
            }

            let here = self.graph.start();
            if !self.graph.is_known_node(here.node) {
                self.scan(here)?;
            }

            self.session.poll(&mut self.graph);

            if self.graph.at_target() {
                let node = here.node;
                tracing::info!("Target {} reached", node);
                self.session
                    .target_reached(&mut self.graph, &format!("target {node} reached"))?;
                return Ok(Outcome::TargetReached(node));
            }

            let Some(planned) = self.graph.next_direction() else {
                tracing::info!(
                    "Exploration complete: {} nodes, {} paths driven",
                    self.graph.node_count(),
                    self.paths_driven
                );
                let stranded = self.graph.unreachable_frontier();
                let message = if stranded.is_empty() {
                    "planet explored".to_string()
                } else {
                    for entry in &stranded {
                        tracing::debug!("Unreachable: {} {}", entry.node, entry.direction);
                    }
                    tracing::warn!(
                        "{} frontier slots cannot be reached from {}",
                        stranded.len(),
                        here.node
                    );
                    format!("planet explored, {} slots unreachable", stranded.len())
                };
                self.session.exploration_completed(&mut self.graph, &message)?;
                return Ok(Outcome::Completed);
            };

            let direction = match self
                .session
                .select_path(&mut self.graph, Position::new(here.node, planned))?
            {
                Some(corrected) if corrected != planned => {
                    tracing::info!("Mothership chose {} instead of {}", corrected, planned);
                    corrected
                }
                _ => planned,
            };

            let turns = here.direction.turns_to(direction);
            if turns != 0 {
                self.robot.turn_by(turns)?;
            }
            let departure = Position::new(here.node, direction);
            self.odometry.reset_to(departure);

            let leg = drive_to_junction(
                &mut self.robot,
                &mut self.odometry,
                self.steering.as_mut(),
                self.drive.max_drive_samples,
            )?;

            let (end, status) = match leg {
                Leg::Arrived => {
                    let estimate = self.odometry.estimate();
                    // The end slot faces back along the arrival heading
                    (
                        Position::new(estimate.node, estimate.direction.opposite()),
                        PathStatus::Free,
                    )
                }
                Leg::Blocked => (departure, PathStatus::Blocked),
            };
            tracing::debug!("Drove {} -> {} ({:?})", departure, end, status);

            let confirmed = self
                .session
                .send_path(&mut self.graph, departure, end, status)?;
            self.paths_driven += 1;
            self.odometry.reset_to(confirmed);
        }
    }

    /// Rotate a full turn at `here`, recording which directions have a line.
    fn scan(&mut self, here: Position) -> Result<()> {
        let mut discovered = Vec::with_capacity(4);
        let mut facing = here.direction;
        for _ in 0..4 {
            if self.robot.read_line_signal()? == LineSignal::Line {
                discovered.push(facing);
            }
            self.robot.turn_by(1)?;
            facing = facing.clockwise();
        }
        tracing::debug!("Scanned {}: {:?}", here.node, discovered);
        self.graph.set_attached_paths(here.node, &discovered);
        Ok(())
    }
}

/// Follow the line to the next junction. On an obstacle, turn around and
/// follow the line back to the junction we left.
fn drive_to_junction<R>(
    robot: &mut R,
    odometry: &mut Odometry,
    steering: &mut dyn Steering,
    max_samples: usize,
) -> std::result::Result<Leg, HardwareError>
where
    R: MotionSource + MotionSink,
{
    let mut motors = StopOnDrop::new(robot);
    match follow_line(&mut *motors, odometry, steering, max_samples, true)? {
        Leg::Arrived => Ok(Leg::Arrived),
        Leg::Blocked => {
            tracing::info!("Obstacle ahead, returning");
            motors.stop()?;
            motors.turn_by(2)?;
            follow_line(&mut *motors, odometry, steering, max_samples, false)?;
            Ok(Leg::Blocked)
        }
    }
}

fn follow_line<R>(
    robot: &mut R,
    odometry: &mut Odometry,
    steering: &mut dyn Steering,
    max_samples: usize,
    watch_obstacles: bool,
) -> std::result::Result<Leg, HardwareError>
where
    R: MotionSource + MotionSink,
{
    for _ in 0..max_samples {
        if watch_obstacles && robot.read_proximity()? {
            return Ok(Leg::Blocked);
        }
        let signal = robot.read_line_signal()?;
        if signal == LineSignal::Junction {
            robot.stop()?;
            return Ok(Leg::Arrived);
        }
        let (left, right) = steering.command(signal);
        robot.drive_differential(left, right)?;
        let (delta_right, delta_left) = robot.read_wheel_deltas()?;
        odometry.accumulate(delta_right, delta_left);
    }
    Err(HardwareError::DriveLimit(max_samples))
}
