//! Persistent event streams and one-shot completions
//!
//! The two shapes are deliberately separate types:
//! - [`Subscribers`] delivers every emitted event to each live handler until
//!   the handler is removed with [`Subscribers::unsubscribe`]. A handler can
//!   remove itself, which is how a one-shot listener on a stream is written.
//! - [`completion`] creates a single-use pair; the [`Completer`] is consumed
//!   when it delivers, so a result can only ever be reported once.

use std::cell::{Cell, RefCell};
use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Identifies one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Handler<E> = Box<dyn FnMut(&E)>;

/// Handlers for a persistent event stream (control thread only)
///
/// Handlers may subscribe, unsubscribe (themselves included) or emit again
/// while an event is being delivered. Handlers added during delivery first
/// see the next event. A nested emit reaches only handlers that are not
/// already running further up the stack.
pub struct Subscribers<E> {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(SubscriptionId, Handler<E>)>>,
    /// Handlers taken out by the emits in progress
    in_flight: RefCell<Vec<SubscriptionId>>,
    /// In-flight handlers unsubscribed before their delivery finished
    removed: RefCell<Vec<SubscriptionId>>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Subscribers {
            next_id: Cell::new(1),
            handlers: RefCell::new(Vec::new()),
            in_flight: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns whether it was registered.
    ///
    /// A handler removed while an event is being delivered receives nothing
    /// further, that event included.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        {
            let mut handlers = self.handlers.borrow_mut();
            if let Some(index) = handlers.iter().position(|(existing, _)| *existing == id) {
                handlers.remove(index);
                return true;
            }
        }

        let running = self.in_flight.borrow().contains(&id);
        let mut removed = self.removed.borrow_mut();
        if running && !removed.contains(&id) {
            removed.push(id);
            true
        } else {
            false
        }
    }

    /// Deliver `event` to every handler, in subscription order. Returns how
    /// many handlers received it.
    pub fn emit(&self, event: &E) -> usize {
        let mut delivering = self.handlers.take();
        let mark = self.in_flight.borrow().len();
        self.in_flight
            .borrow_mut()
            .extend(delivering.iter().map(|(id, _)| *id));

        let mut delivered = 0;
        for (id, handler) in &mut delivering {
            if self.removed.borrow().contains(id) {
                continue;
            }
            handler(event);
            delivered += 1;
        }

        self.in_flight.borrow_mut().truncate(mark);
        {
            let mut removed = self.removed.borrow_mut();
            delivering.retain(|(id, _)| !removed.contains(id));
            let in_flight = self.in_flight.borrow();
            removed.retain(|id| in_flight.contains(id));
        }

        let mut handlers = self.handlers.borrow_mut();
        delivering.append(&mut handlers);
        *handlers = delivering;
        delivered
    }

    pub fn len(&self) -> usize {
        let running = self.in_flight.borrow().len() - self.removed.borrow().len();
        self.handlers.borrow().len() + running
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("handlers", &self.len())
            .finish()
    }
}

/// Create a one-shot completion pair.
///
/// The completer is `Send` so background work can resolve it from any thread.
pub fn completion<T: Send>() -> (Completer<T>, Pending<T>) {
    let (sender, receiver) = bounded(1);
    (Completer { sender }, Pending { receiver })
}

/// Resolves a [`Pending`] exactly once
pub struct Completer<T> {
    sender: Sender<Result<T, String>>,
}

impl<T> Completer<T> {
    pub fn complete(self, value: T) -> bool {
        self.sender.send(Ok(value)).is_ok()
    }

    pub fn fail(self, reason: impl Into<String>) -> bool {
        self.sender.send(Err(reason.into())).is_ok()
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}

/// State of a [`Pending`] result when polled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    Ready(Result<T, String>),
    Waiting,
    /// The completer was dropped without reporting anything
    Abandoned,
}

/// Receiving side of a one-shot completion
pub struct Pending<T> {
    receiver: Receiver<Result<T, String>>,
}

impl<T> Pending<T> {
    /// Non-blocking check, meant to be polled from the control thread.
    pub fn poll(&self) -> Poll<T> {
        match self.receiver.try_recv() {
            Ok(result) => Poll::Ready(result),
            Err(TryRecvError::Empty) => Poll::Waiting,
            Err(TryRecvError::Disconnected) => Poll::Abandoned,
        }
    }

    /// Block until the result arrives or the completer is dropped.
    pub fn wait(self) -> Result<T, String> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err("completion abandoned".to_string()))
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> Poll<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Poll::Ready(result),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Poll::Waiting,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Poll::Abandoned,
        }
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}
