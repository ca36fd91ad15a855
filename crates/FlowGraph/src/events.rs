//! # Graph Events
//!
//! A minimal synchronous signal mechanism. Listeners are invoked in
//! registration order and receive borrowed payloads valid only for the
//! duration of the callback.
//!
//! Listeners must not mutate the graph from inside a callback; they queue
//! follow-up commands instead. The graph is single-threaded (see the
//! concurrency notes on [`crate::graph::Graph`]), so signals are not `Sync`.

use glam::Vec2;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::id::NodeId;
use crate::model::{Edge, Node, Port};

struct Slot<T> {
    id: u64,
    callback: Box<dyn FnMut(&T)>,
}

struct SignalInner<T> {
    next_id: u64,
    slots: Vec<Slot<T>>,
}

/// A multicast hook carrying payloads of type `T`.
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. The returned handle owns the registration:
    /// dropping it unsubscribes.
    #[must_use = "dropping the subscription immediately unsubscribes the listener"]
    pub fn connect(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.slots.push(Slot {
                id,
                callback: Box::new(callback),
            });
            id
        };
        let weak = Rc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = Weak::upgrade(&weak) {
                    inner.borrow_mut().slots.retain(|slot| slot.id != id);
                }
            })),
        }
    }

    /// Invokes every listener in registration order.
    pub fn emit(&self, payload: &T) {
        let mut inner = self.inner.borrow_mut();
        for slot in inner.slots.iter_mut() {
            (slot.callback)(payload);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }
}

/// Owning handle for a signal registration. Unsubscribes on drop.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keeps the listener registered for the signal's whole lifetime.
    pub fn leak(mut self) {
        self.detach = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

/// Payload for the `node_moved` signal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeMoved {
    pub node: NodeId,
    pub old_position: Vec2,
    pub new_position: Vec2,
}

/// The graph's lifecycle signals.
///
/// `node_added` / `edge_added` / `port_added` fire after the entity and all
/// indices are in place; `node_removed` / `edge_removed` / `port_removed`
/// fire *before* structural removal so listeners can still resolve ids.
#[derive(Default)]
pub struct GraphEvents {
    pub node_added: Signal<Node>,
    pub node_removed: Signal<Node>,
    pub node_moved: Signal<NodeMoved>,
    pub edge_added: Signal<Edge>,
    pub edge_removed: Signal<Edge>,
    pub port_added: Signal<Port>,
    pub port_removed: Signal<Port>,
}
