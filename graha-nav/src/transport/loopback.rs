//! In-process publish/subscribe bus
//!
//! Each client owns a dispatch thread fed by a channel, so handlers run
//! concurrently with the publisher exactly as they would behind a network
//! broker. No bus lock is held while a handler runs, which lets handlers
//! publish replies.
//!
//! With duplicate delivery enabled every message is delivered twice in a
//! row, which exercises at-least-once handling.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use super::{MessageHandler, Transport};
use crate::error::TransportError;

struct Delivery {
    topic: String,
    payload: Vec<u8>,
}

struct ClientSlot {
    id: u64,
    topics: HashSet<String>,
    sender: Sender<Delivery>,
}

#[derive(Default)]
struct BusInner {
    clients: Vec<ClientSlot>,
    next_id: u64,
    duplicate: bool,
    published: u64,
}

/// Shared in-process bus. Cheap to clone.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    inner: Arc<Mutex<BusInner>>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus that delivers every message twice.
    pub fn with_duplicates(duplicate: bool) -> Self {
        let bus = Self::default();
        bus.inner.lock().duplicate = duplicate;
        bus
    }

    /// Attach a new client with its own dispatch thread.
    pub fn client(&self, name: &str) -> Result<LoopbackClient, TransportError> {
        let (sender, receiver) = mpsc::channel();
        let handler: Arc<Mutex<Option<MessageHandler>>> = Arc::new(Mutex::new(None));

        let worker = {
            let handler = Arc::clone(&handler);
            thread::Builder::new()
                .name(format!("bus-{name}"))
                .spawn(move || dispatch(receiver, handler))
                .map_err(TransportError::Spawn)?
        };

        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.clients.push(ClientSlot {
            id,
            topics: HashSet::new(),
            sender,
        });
        tracing::debug!("Bus client {} attached as #{}", name, id);

        Ok(LoopbackClient {
            bus: self.clone(),
            id,
            handler,
            worker: Some(worker),
        })
    }

    /// Deliver `payload` to every client subscribed to `topic`.
    pub fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        validate_topic(topic)?;
        let mut inner = self.inner.lock();
        inner.published += 1;
        let copies = if inner.duplicate { 2 } else { 1 };
        for slot in inner.clients.iter().filter(|c| c.topics.contains(topic)) {
            for _ in 0..copies {
                // A closed receiver means the client is detaching
                let _ = slot.sender.send(Delivery {
                    topic: topic.to_string(),
                    payload: payload.to_vec(),
                });
            }
        }
        Ok(())
    }

    /// Number of publish calls so far.
    pub fn published_count(&self) -> u64 {
        self.inner.lock().published
    }

    fn with_slot<R>(&self, id: u64, f: impl FnOnce(&mut ClientSlot) -> R) -> Result<R, TransportError> {
        let mut inner = self.inner.lock();
        inner
            .clients
            .iter_mut()
            .find(|c| c.id == id)
            .map(f)
            .ok_or(TransportError::Closed)
    }

    fn detach(&self, id: u64) {
        self.inner.lock().clients.retain(|c| c.id != id);
    }
}

fn dispatch(receiver: Receiver<Delivery>, handler: Arc<Mutex<Option<MessageHandler>>>) {
    for delivery in receiver {
        let current = handler.lock().clone();
        match current {
            Some(handler) => handler(&delivery.topic, &delivery.payload),
            None => tracing::trace!("No handler for {}, message dropped", delivery.topic),
        }
    }
}

fn validate_topic(topic: &str) -> Result<(), TransportError> {
    if topic.is_empty() || topic.split('/').any(str::is_empty) {
        return Err(TransportError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

/// One endpoint on a [`LoopbackBus`].
pub struct LoopbackClient {
    bus: LoopbackBus,
    id: u64,
    handler: Arc<Mutex<Option<MessageHandler>>>,
    worker: Option<JoinHandle<()>>,
}

impl LoopbackClient {
    /// The bus this client is attached to.
    pub fn bus(&self) -> &LoopbackBus {
        &self.bus
    }

    pub fn topics(&self) -> Vec<String> {
        self.bus
            .with_slot(self.id, |slot| slot.topics.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Transport for LoopbackClient {
    fn set_handler(&mut self, handler: MessageHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        validate_topic(topic)?;
        self.bus.with_slot(self.id, |slot| {
            slot.topics.insert(topic.to_string());
        })
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.bus.with_slot(self.id, |slot| {
            slot.topics.remove(topic);
        })
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.bus.publish(topic, payload)
    }
}

impl Drop for LoopbackClient {
    fn drop(&mut self) {
        // Dropping the slot closes the channel and ends the dispatch loop
        self.bus.detach(self.id);
        if let Some(worker) = self.worker.take()
            && worker.thread().id() != thread::current().id()
            && worker.join().is_err()
        {
            tracing::error!("Bus dispatch thread panicked");
        }
    }
}
