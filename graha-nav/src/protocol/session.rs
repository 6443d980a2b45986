//! Request/acknowledge session with the mothership.
//!
//! The transport delivers messages on its own thread. The handler installed
//! here only decodes and validates them, then forwards them over a channel;
//! the controller applies them to the graph it owns, either while waiting
//! for an acknowledgement or through [`Session::poll`].
//!
//! At most one request is outstanding. Each wait is bounded by the request
//! timeout. `pathSelect` is only answered when the mothership overrides the
//! chosen direction, so it completes without a correction once the link has
//! been quiet for the watchdog threshold.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use graha_map::{Direction, PlanetGraph, Position, Weight};
use parking_lot::Mutex;

use super::messages::{AckKind, Inbound, Outbound, PathStatus, PathUpdate};
use super::watchdog::Watchdog;
use crate::config::SessionConfig;
use crate::error::{SessionError, TransportError};
use crate::transport::{Transport, explorer_topic, planet_topic};

/// Acknowledgement received for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    /// Planet assigned, robot starts here
    Planet(Position),
    /// Path confirmed, robot now stands here
    Path(Position),
    PathSelect(Direction),
    Done,
}

impl Ack {
    pub fn kind(&self) -> AckKind {
        match self {
            Ack::Planet(_) => AckKind::Planet,
            Ack::Path(_) => AckKind::Path,
            Ack::PathSelect(_) => AckKind::PathSelect,
            Ack::Done => AckKind::Done,
        }
    }
}

enum Applied {
    Ack(Ack),
    Rejected(String),
    Update,
}

#[derive(Clone, Copy, Debug)]
enum RequestState {
    Idle,
    Pending {
        kind: AckKind,
        request: &'static str,
        sent_at: Instant,
        /// Departure slot of a reported path
        path_start: Option<Position>,
    },
}

/// Controller-side end of the mothership link.
pub struct Session<T: Transport> {
    transport: T,
    group: String,
    planet: Option<String>,
    subscriptions: Vec<String>,
    inbox: Receiver<Inbound>,
    watchdog: Arc<Mutex<Watchdog>>,
    rejected: Arc<AtomicUsize>,
    state: RequestState,
    request_timeout: Duration,
    poll_interval: Duration,
}

impl<T: Transport> Session<T> {
    /// Install the inbound handler and subscribe to the explorer topic.
    pub fn connect(mut transport: T, config: &SessionConfig, group: &str) -> Result<Self, SessionError> {
        let (sender, inbox) = mpsc::channel();
        let watchdog = Arc::new(Mutex::new(Watchdog::new(config.watchdog())));
        let rejected = Arc::new(AtomicUsize::new(0));

        {
            let watchdog = Arc::clone(&watchdog);
            let rejected = Arc::clone(&rejected);
            transport.set_handler(Arc::new(move |topic: &str, payload: &[u8]| {
                watchdog.lock().touch(Instant::now());
                match Inbound::decode(payload) {
                    Ok(Inbound::Echo(kind)) => {
                        tracing::trace!("Ignoring echo of {} on {}", kind, topic);
                    }
                    Ok(message) => {
                        tracing::debug!("<- {} on {}", message.kind(), topic);
                        if sender.send(message).is_err() {
                            tracing::trace!("Session closed, dropping message");
                        }
                    }
                    Err(e) => {
                        rejected.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("Rejected message on {}: {}", topic, e);
                    }
                }
            }));
        }

        let mut session = Self {
            transport,
            group: group.to_string(),
            planet: None,
            subscriptions: Vec::new(),
            inbox,
            watchdog,
            rejected,
            state: RequestState::Idle,
            request_timeout: config.request_timeout(),
            poll_interval: config.poll_interval(),
        };
        session.subscribe(explorer_topic(group))?;
        Ok(session)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Name of the assigned planet.
    pub fn planet(&self) -> Option<&str> {
        self.planet.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RequestState::Pending { .. })
    }

    /// Inbound messages dropped as malformed.
    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Watchdog alerts raised so far.
    pub fn alerts(&self) -> u64 {
        self.watchdog.lock().alerts()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Apply every queued inbound message. Returns how many were applied.
    pub fn poll(&mut self, graph: &mut PlanetGraph) -> usize {
        self.check_watchdog();
        let mut applied = 0;
        while let Ok(message) = self.inbox.try_recv() {
            match self.apply(graph, message) {
                Applied::Ack(ack) => tracing::debug!("Late acknowledgement {:?}", ack),
                Applied::Rejected(reason) => {
                    tracing::warn!("Mothership error outside a request: {}", reason)
                }
                Applied::Update => {}
            }
            applied += 1;
        }
        applied
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Publish `outbound` and mark the session pending when it expects an
    /// acknowledgement. Queued messages are applied first so stale
    /// duplicates cannot satisfy the new request.
    pub fn begin(&mut self, graph: &mut PlanetGraph, outbound: &Outbound) -> Result<(), SessionError> {
        if let RequestState::Pending { request, .. } = self.state {
            return Err(SessionError::Busy(request));
        }
        self.poll(graph);

        let topic = if outbound.on_planet_topic() {
            let planet = self.planet.as_deref().ok_or(SessionError::NotAssigned)?;
            planet_topic(planet, &self.group)
        } else {
            explorer_topic(&self.group)
        };
        let payload = outbound.encode()?;
        self.transport.publish(&topic, &payload)?;
        tracing::debug!("-> {} on {}", outbound.kind(), topic);

        if let Some(kind) = outbound.expected_ack() {
            let path_start = match outbound {
                Outbound::Path { start, .. } => Some(*start),
                _ => None,
            };
            self.state = RequestState::Pending {
                kind,
                request: outbound.kind(),
                sent_at: Instant::now(),
                path_start,
            };
        }
        Ok(())
    }

    /// Block until the pending request is acknowledged, rejected or times
    /// out. The session is idle again afterwards in every case.
    pub fn wait(&mut self, graph: &mut PlanetGraph) -> Result<Option<Ack>, SessionError> {
        let RequestState::Pending {
            kind,
            request,
            sent_at,
            ..
        } = self.state
        else {
            return Ok(None);
        };
        let result = self.await_ack(graph, kind, request, sent_at);
        self.state = RequestState::Idle;
        result
    }

    /// [`Session::begin`] followed by [`Session::wait`].
    pub fn request(&mut self, graph: &mut PlanetGraph, outbound: Outbound) -> Result<Option<Ack>, SessionError> {
        self.begin(graph, &outbound)?;
        self.wait(graph)
    }

    /// Select a test planet. Not acknowledged.
    pub fn test_planet(&mut self, graph: &mut PlanetGraph, name: &str) -> Result<(), SessionError> {
        self.request(graph, Outbound::TestPlanet(name.to_string()))?;
        Ok(())
    }

    /// Announce readiness and wait for the planet assignment.
    pub fn ready(&mut self, graph: &mut PlanetGraph) -> Result<Position, SessionError> {
        match self.request(graph, Outbound::Ready)? {
            Some(Ack::Planet(start)) => Ok(start),
            _ => Err(SessionError::NotAssigned),
        }
    }

    /// Announce the direction about to be taken. Returns the mothership's
    /// replacement direction, if it sent one.
    pub fn select_path(&mut self, graph: &mut PlanetGraph, start: Position) -> Result<Option<Direction>, SessionError> {
        match self.request(graph, Outbound::PathSelect(start))? {
            Some(Ack::PathSelect(direction)) => Ok(Some(direction)),
            _ => Ok(None),
        }
    }

    /// Report a driven path and wait for the confirmation. Returns the
    /// confirmed position the robot now stands at.
    pub fn send_path(
        &mut self,
        graph: &mut PlanetGraph,
        start: Position,
        end: Position,
        status: PathStatus,
    ) -> Result<Position, SessionError> {
        match self.request(graph, Outbound::Path { start, end, status })? {
            Some(Ack::Path(arrived)) => Ok(arrived),
            _ => Ok(graph.start()),
        }
    }

    pub fn target_reached(&mut self, graph: &mut PlanetGraph, message: &str) -> Result<(), SessionError> {
        self.request(graph, Outbound::TargetReached(message.to_string()))?;
        Ok(())
    }

    pub fn exploration_completed(&mut self, graph: &mut PlanetGraph, message: &str) -> Result<(), SessionError> {
        self.request(graph, Outbound::ExplorationCompleted(message.to_string()))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn await_ack(
        &mut self,
        graph: &mut PlanetGraph,
        kind: AckKind,
        request: &'static str,
        sent_at: Instant,
    ) -> Result<Option<Ack>, SessionError> {
        let deadline = sent_at + self.request_timeout;

        loop {
            let now = Instant::now();
            if kind == AckKind::PathSelect {
                let (last_message, threshold) = {
                    let watchdog = self.watchdog.lock();
                    (watchdog.last_message(), watchdog.threshold())
                };
                if now.saturating_duration_since(last_message.max(sent_at)) >= threshold {
                    tracing::debug!("No {} correction", request);
                    return Ok(None);
                }
            }
            self.check_watchdog();
            if now >= deadline {
                return Err(SessionError::AckTimeout {
                    request,
                    waited: now - sent_at,
                });
            }

            match self.inbox.recv_timeout(self.poll_interval.min(deadline - now)) {
                Ok(message) => match self.apply(graph, message) {
                    Applied::Ack(ack) if ack.kind() == kind => return Ok(Some(ack)),
                    Applied::Ack(ack) => {
                        tracing::debug!("Ignoring {:?} while waiting for {}", ack, request);
                    }
                    Applied::Rejected(reason) => return Err(SessionError::Rejected(reason)),
                    Applied::Update => {}
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(SessionError::Disconnected),
            }
        }
    }

    fn apply(&mut self, graph: &mut PlanetGraph, message: Inbound) -> Applied {
        match message {
            Inbound::Planet { name, start } => {
                if self.planet.as_deref() == Some(name.as_str()) {
                    tracing::debug!("Duplicate planet assignment ignored");
                    return Applied::Update;
                }
                if let Some(previous) = self.planet.take() {
                    let topic = planet_topic(&previous, &self.group);
                    self.unsubscribe(&topic);
                }
                if let Err(e) = self.subscribe(planet_topic(&name, &self.group)) {
                    tracing::warn!("Failed to subscribe to planet {}: {}", name, e);
                }
                tracing::info!("Assigned planet {} starting at {}", name, start);
                self.planet = Some(name);

                graph.set_start(start);
                // The path we arrived by, behind us
                let spur = Position::new(start.node, start.direction.opposite());
                graph.add_path(spur, Some(spur), Weight::Detected);
                Applied::Ack(Ack::Planet(start))
            }
            Inbound::Path(update) => {
                graph.add_path(update.start, Some(update.end), update.weight);
                // Only the answer to the path just reported moves the robot
                if !self.answers_pending_path(&update) {
                    tracing::debug!(
                        "Path {} -> {} confirmed outside its request",
                        update.start,
                        update.end
                    );
                    return Applied::Update;
                }
                // After a blocked path the robot has turned back to its departure node
                let back_at = match update.status {
                    PathStatus::Blocked => update.start,
                    PathStatus::Free => update.end,
                };
                let arrived = Position::new(back_at.node, back_at.direction.opposite());
                graph.set_start(arrived);
                tracing::info!(
                    "Path {} -> {} confirmed ({}), now at {}",
                    update.start,
                    update.end,
                    update.weight,
                    arrived
                );
                Applied::Ack(Ack::Path(arrived))
            }
            Inbound::PathSelect(direction) => Applied::Ack(Ack::PathSelect(direction)),
            Inbound::Target(node) => {
                tracing::info!("Target set to {}", node);
                graph.set_target(Some(node));
                Applied::Update
            }
            Inbound::PathUnveiled(update) => {
                tracing::debug!("Path {} -> {} unveiled ({})", update.start, update.end, update.weight);
                graph.add_path(update.start, Some(update.end), update.weight);
                Applied::Update
            }
            Inbound::Done(message) => {
                tracing::info!("Mothership: {}", message);
                Applied::Ack(Ack::Done)
            }
            Inbound::Error(message) => Applied::Rejected(message),
            Inbound::Notice { kind, message } => {
                tracing::debug!("Mothership {}: {}", kind, message);
                Applied::Update
            }
            Inbound::Echo(_) => Applied::Update,
        }
    }

    fn answers_pending_path(&self, update: &PathUpdate) -> bool {
        matches!(
            self.state,
            RequestState::Pending { path_start: Some(start), .. } if start == update.start
        )
    }

    fn check_watchdog(&self) {
        if let Some(quiet) = self.watchdog.lock().poll(Instant::now()) {
            tracing::warn!("No message from mothership for {:.1}s", quiet.as_secs_f32());
        }
    }

    fn subscribe(&mut self, topic: String) -> Result<(), TransportError> {
        self.transport.subscribe(&topic)?;
        if !self.subscriptions.contains(&topic) {
            self.subscriptions.push(topic);
        }
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) {
        if let Err(e) = self.transport.unsubscribe(topic) {
            tracing::debug!("Failed to unsubscribe {}: {}", topic, e);
        }
        self.subscriptions.retain(|t| t != topic);
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        for topic in std::mem::take(&mut self.subscriptions) {
            if let Err(e) = self.transport.unsubscribe(&topic) {
                tracing::debug!("Failed to unsubscribe {}: {}", topic, e);
            }
        }
    }
}
