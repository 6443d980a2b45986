//! Simulated mothership
//!
//! Answers the robot over a [`LoopbackBus`] from a known [`PlanetMap`]:
//! assigns the planet on `ready`, confirms every driven path with its true
//! end and weight, reveals unveiled paths with the first confirmation and
//! announces the target once enough distinct paths have been confirmed.
//! It never overrides a `pathSelect`.

use std::collections::HashSet;
use std::sync::Arc;

use graha_map::{Position, Weight};
use parking_lot::Mutex;

use super::PlanetMap;
use crate::error::TransportError;
use crate::protocol::messages::{
    MessagePayload, PathPayload, PlanetPayload, TargetPayload, TestPlanetPayload,
};
use crate::protocol::{Envelope, PathStatus, Sender};
use crate::transport::{LoopbackBus, LoopbackClient, Transport, explorer_topic, planet_topic};

/// How the robot said it finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Finish {
    TargetReached(String),
    ExplorationCompleted(String),
}

/// Replies computed under the lock, published after it is released.
type Replies = Vec<(String, Envelope)>;

struct Ledger {
    planet: Arc<PlanetMap>,
    group: String,
    requested_planet: Option<String>,
    confirmed: HashSet<Position>,
    unveiled_sent: bool,
    target_sent: bool,
    finish: Option<Finish>,
    errors: usize,
}

impl Ledger {
    fn explorer_topic(&self) -> String {
        explorer_topic(&self.group)
    }

    fn planet_topic(&self) -> String {
        planet_topic(self.planet.name(), &self.group)
    }

    fn handle(&mut self, envelope: &Envelope) -> Result<Replies, String> {
        let mut replies = Replies::new();
        match envelope.kind.as_str() {
            "testPlanet" => {
                let payload: TestPlanetPayload = envelope.payload().map_err(|e| e.to_string())?;
                if payload.planet_name != self.planet.name() {
                    tracing::warn!(
                        "Test planet {} requested, only {} is loaded",
                        payload.planet_name,
                        self.planet.name()
                    );
                }
                self.requested_planet = Some(payload.planet_name);
            }
            "ready" => {
                let start = self.planet.start();
                replies.push((
                    self.explorer_topic(),
                    server(
                        "planet",
                        PlanetPayload {
                            planet_name: self.planet.name().to_string(),
                            start_x: start.node.x,
                            start_y: start.node.y,
                            start_orientation: start.direction,
                        },
                    )?,
                ));
                self.announce_target(&mut replies)?;
            }
            "path" => {
                let payload: PathPayload = envelope.payload().map_err(|e| e.to_string())?;
                let start = payload.start();
                let truth = self
                    .planet
                    .path_at(start)
                    .ok_or_else(|| format!("no path leaves {start}"))?;

                let reply = if truth.weight == Weight::Blocked {
                    PathPayload::new(start, start, PathStatus::Blocked).with_weight(truth.weight)
                } else {
                    if truth.end != payload.end() {
                        tracing::debug!("Robot reported {}, correcting to {}", payload.end(), truth.end);
                    }
                    PathPayload::new(start, truth.end, PathStatus::Free).with_weight(truth.weight)
                };
                replies.push((self.planet_topic(), server("path", reply)?));
                self.confirmed.insert(start);

                if !self.unveiled_sent {
                    self.unveiled_sent = true;
                    for &(from, path) in self.planet.unveiled() {
                        let status = if path.weight == Weight::Blocked {
                            PathStatus::Blocked
                        } else {
                            PathStatus::Free
                        };
                        let payload = PathPayload::new(from, path.end, status).with_weight(path.weight);
                        replies.push((self.planet_topic(), server("pathUnveiled", payload)?));
                    }
                }
                self.announce_target(&mut replies)?;
            }
            "pathSelect" => {}
            "targetReached" | "explorationCompleted" => {
                let payload: MessagePayload = envelope.payload().unwrap_or_default();
                tracing::info!("Robot finished ({}): {}", envelope.kind, payload.message);
                let finish = if envelope.kind == "targetReached" {
                    Finish::TargetReached(payload.message.clone())
                } else {
                    Finish::ExplorationCompleted(payload.message.clone())
                };
                self.finish.get_or_insert(finish);
                replies.push((
                    self.explorer_topic(),
                    server("done", MessagePayload { message: payload.message })?,
                ));
            }
            other => return Err(format!("unknown message type {other:?}")),
        }
        Ok(replies)
    }

    fn announce_target(&mut self, replies: &mut Replies) -> Result<(), String> {
        let Some(target) = self.planet.target() else {
            return Ok(());
        };
        if self.target_sent || self.confirmed.len() < target.after_paths {
            return Ok(());
        }
        self.target_sent = true;
        tracing::info!("Announcing target {}", target.node);
        replies.push((
            self.planet_topic(),
            server(
                "target",
                TargetPayload {
                    target_x: target.node.x,
                    target_y: target.node.y,
                },
            )?,
        ));
        Ok(())
    }
}

fn server(kind: &str, payload: impl serde::Serialize) -> Result<Envelope, String> {
    Envelope::new(Sender::Server, kind, payload).map_err(|e| e.to_string())
}

fn debug_error(message: String) -> Envelope {
    Envelope {
        from: Sender::Debug,
        kind: "error".to_string(),
        payload: serde_json::json!({ "message": message }),
    }
}

/// Mothership endpoint on the bus. Detaches when dropped.
pub struct Mothership {
    ledger: Arc<Mutex<Ledger>>,
    _client: LoopbackClient,
}

impl Mothership {
    /// Attach to `bus` and serve `planet` to the robot of `group`.
    pub fn launch(bus: &LoopbackBus, planet: Arc<PlanetMap>, group: &str) -> Result<Self, TransportError> {
        let ledger = Arc::new(Mutex::new(Ledger {
            planet: Arc::clone(&planet),
            group: group.to_string(),
            requested_planet: None,
            confirmed: HashSet::new(),
            unveiled_sent: false,
            target_sent: false,
            finish: None,
            errors: 0,
        }));

        let mut client = bus.client("mothership")?;
        {
            let ledger = Arc::clone(&ledger);
            let bus = bus.clone();
            client.set_handler(Arc::new(move |topic: &str, payload: &[u8]| {
                let envelope = match Envelope::from_bytes(payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        ledger.lock().errors += 1;
                        tracing::warn!("Mothership dropped malformed message on {}: {}", topic, e);
                        return;
                    }
                };
                // Our own replies come back on the shared topics
                if envelope.from != Sender::Client {
                    return;
                }

                let replies = {
                    let mut ledger = ledger.lock();
                    match ledger.handle(&envelope) {
                        Ok(replies) => replies,
                        Err(reason) => {
                            ledger.errors += 1;
                            tracing::warn!("Mothership rejected {}: {}", envelope.kind, reason);
                            vec![(topic.to_string(), debug_error(reason))]
                        }
                    }
                };

                for (topic, reply) in replies {
                    let published = reply
                        .to_bytes()
                        .map_err(|e| e.to_string())
                        .and_then(|bytes| bus.publish(&topic, &bytes).map_err(|e| e.to_string()));
                    if let Err(e) = published {
                        tracing::error!("Mothership failed to publish {}: {}", reply.kind, e);
                    }
                }
            }));
        }

        client.subscribe(&explorer_topic(group))?;
        client.subscribe(&planet_topic(planet.name(), group))?;
        tracing::info!("Mothership serving planet {} to group {}", planet.name(), group);

        Ok(Self {
            ledger,
            _client: client,
        })
    }

    /// Distinct path starts confirmed so far.
    pub fn confirmed_paths(&self) -> usize {
        self.ledger.lock().confirmed.len()
    }

    pub fn finish(&self) -> Option<Finish> {
        self.ledger.lock().finish.clone()
    }

    /// Client messages that were malformed or rejected.
    pub fn errors(&self) -> usize {
        self.ledger.lock().errors
    }

    /// Planet name the robot asked for with `testPlanet`.
    pub fn requested_planet(&self) -> Option<String> {
        self.ledger.lock().requested_planet.clone()
    }
}
