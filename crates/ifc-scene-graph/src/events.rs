// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity-keyed publish/subscribe between views
//!
//! Views never reference each other. Each one subscribes under a name,
//! publishes [`SceneEvent`]s tagged with its own [`ViewId`], and receives
//! every event published by the others.

use ifc_scene_model::GlobalId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Cross-view event, keyed by entity identity
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SceneEvent {
    Select(GlobalId),
    Deselect(GlobalId),
    /// Attributes of the entity changed
    Update(GlobalId),
}

impl SceneEvent {
    pub fn global_id(&self) -> &GlobalId {
        match self {
            SceneEvent::Select(id) | SceneEvent::Deselect(id) | SceneEvent::Update(id) => id,
        }
    }
}

impl fmt::Display for SceneEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneEvent::Select(id) => write!(f, "select({})", id),
            SceneEvent::Deselect(id) => write!(f, "deselect({})", id),
            SceneEvent::Update(id) => write!(f, "update({})", id),
        }
    }
}

/// Identity of a subscribed view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u32);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Event with its publishing view
#[derive(Clone, Debug)]
pub struct Envelope {
    pub from: ViewId,
    pub event: SceneEvent,
}

struct Subscriber {
    id: ViewId,
    name: String,
    sender: Sender<Envelope>,
}

#[derive(Default)]
struct BusInner {
    next_id: u32,
    subscribers: Vec<Subscriber>,
}

/// Shared event channel; clones refer to the same bus
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view and get its receiving end
    pub fn subscribe(&self, view_name: impl Into<String>) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let mut inner = self.inner.lock();
        let id = ViewId(inner.next_id);
        inner.next_id += 1;
        let name = view_name.into();
        log::debug!("View '{}' subscribed as {}", name, id);
        inner.subscribers.push(Subscriber {
            id,
            name: name.clone(),
            sender,
        });
        Subscription {
            id,
            name,
            receiver: Mutex::new(receiver),
        }
    }

    /// Deliver an event to every view except its origin
    ///
    /// Returns the number of views reached. Views whose subscription was
    /// dropped are forgotten.
    pub fn publish(&self, from: ViewId, event: SceneEvent) -> usize {
        let mut inner = self.inner.lock();
        let mut delivered = 0;
        inner.subscribers.retain(|s| {
            if s.id == from {
                return true;
            }
            let envelope = Envelope {
                from,
                event: event.clone(),
            };
            match s.sender.send(envelope) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    log::debug!("Dropping closed view '{}'", s.name);
                    false
                }
            }
        });
        delivered
    }

    pub fn publish_all(&self, from: ViewId, events: impl IntoIterator<Item = SceneEvent>) {
        for event in events {
            self.publish(from, event);
        }
    }

    /// Names of subscribed views
    pub fn views(&self) -> Vec<String> {
        self.inner
            .lock()
            .subscribers
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }
}

/// Receiving end of one view
pub struct Subscription {
    id: ViewId,
    name: String,
    receiver: Mutex<Receiver<Envelope>>,
}

impl Subscription {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take all pending envelopes without blocking
    pub fn drain_envelopes(&self) -> Vec<Envelope> {
        self.receiver.lock().try_iter().collect()
    }

    /// Take all pending events without blocking
    pub fn drain(&self) -> Vec<SceneEvent> {
        self.drain_envelopes().into_iter().map(|e| e.event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(id: &str) -> SceneEvent {
        SceneEvent::Select(GlobalId::from(id))
    }

    #[test]
    fn test_publish_skips_origin() {
        let bus = EventBus::new();
        let tree = bus.subscribe("tree");
        let view = bus.subscribe("3d");

        assert_eq!(bus.publish(view.id(), select("G1")), 1);
        assert!(view.drain().is_empty());
        assert_eq!(tree.drain(), vec![select("G1")]);
        assert!(tree.drain().is_empty());
    }

    #[test]
    fn test_fan_out_keeps_order() {
        let bus = EventBus::new();
        let a = bus.subscribe("a");
        let b = bus.subscribe("b");
        let c = bus.subscribe("c");
        bus.publish(a.id(), SceneEvent::Deselect("G1".into()));
        bus.publish(a.id(), select("G2"));

        let expected = vec![SceneEvent::Deselect("G1".into()), select("G2")];
        assert_eq!(b.drain(), expected);
        assert_eq!(c.drain(), expected);
    }

    #[test]
    fn test_envelope_carries_origin() {
        let bus = EventBus::new();
        let a = bus.subscribe("a");
        let b = bus.subscribe("b");
        bus.publish(a.id(), SceneEvent::Update("G9".into()));
        let envelopes = b.drain_envelopes();
        assert_eq!(envelopes[0].from, a.id());
        assert_eq!(envelopes[0].event.global_id().as_str(), "G9");
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let bus = EventBus::new();
        let a = bus.subscribe("a");
        let b = bus.subscribe("b");
        drop(b);
        assert_eq!(bus.publish(a.id(), select("G1")), 0);
        assert_eq!(bus.views(), vec!["a".to_string()]);
    }

    #[test]
    fn test_publish_from_worker_threads() {
        let bus = EventBus::new();
        let tree = bus.subscribe("tree");
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let bus = bus.clone();
                let from = bus.subscribe(&format!("worker-{}", t)).id();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        bus.publish(from, select(&format!("G{}-{}", t, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tree.drain().len(), 100);
    }
}
