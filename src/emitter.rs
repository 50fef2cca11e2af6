use std::{
    collections::HashMap,
    fmt, mem,
    sync::{Arc, Weak},
};

use async_std::task::yield_now;
use futures::{
    future::{self, BoxFuture},
    stream::FuturesUnordered,
    FutureExt, StreamExt,
};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    listener::{AnyListener, EventName, Listener, ListenerError, ListenerId},
    listener_set::ListenerSet,
    once::Once,
};

/// Future returned by [emit_concurrent](Emitter::emit_concurrent) and [emit_serial](Emitter::emit_serial)
pub type Emission = BoxFuture<'static, Result<()>>;

struct Registry<T> {
    events: HashMap<EventName, ListenerSet<Listener<T>>>,
    any: ListenerSet<AnyListener<T>>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            events: HashMap::new(),
            any: ListenerSet::new(),
        }
    }
    fn listeners(&mut self, event: &str) -> &mut ListenerSet<Listener<T>> {
        self.events.entry(event.into()).or_default()
    }
    fn is_subscribed(&self, event: &str, id: ListenerId) -> bool {
        self.events
            .get(event)
            .map_or(false, |listeners| listeners.contains(id))
    }
    fn is_subscribed_any(&self, id: ListenerId) -> bool {
        self.any.contains(id)
    }
    fn count(&self, event: Option<&str>) -> usize {
        let named = match event {
            Some(event) => self.events.get(event).map_or(0, |l| l.len()),
            None => self.events.values().map(|l| l.len()).sum(),
        };
        self.any.len() + named
    }
}

type SharedRegistry<T> = Arc<Mutex<Registry<T>>>;

/// Snapshot of listeners taken at the moment an emission is requested
struct Delivery<T> {
    event: EventName,
    payload: Arc<T>,
    listeners: Vec<Listener<T>>,
    any: Vec<AnyListener<T>>,
    registry: SharedRegistry<T>,
}

impl<T: Send + Sync + 'static> Delivery<T> {
    async fn concurrent(self) -> Result<()> {
        yield_now().await;
        trace!(
            event = %self.event,
            listeners = self.listeners.len(),
            any = self.any.len(),
            "emitting concurrently"
        );
        let mut invocations = FuturesUnordered::new();
        for listener in self.listeners.iter().cloned() {
            invocations.push(self.invoke(listener));
        }
        for listener in self.any.iter().cloned() {
            invocations.push(self.invoke_any(listener));
        }
        let mut failure = None;
        while let Some(result) = invocations.next().await {
            if let Err(e) = result {
                failure.get_or_insert(e);
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn serial(self) -> Result<()> {
        yield_now().await;
        trace!(
            event = %self.event,
            listeners = self.listeners.len(),
            any = self.any.len(),
            "emitting serially"
        );
        for listener in self.listeners.iter().cloned() {
            self.invoke(listener).await?;
        }
        for listener in self.any.iter().cloned() {
            self.invoke_any(listener).await?;
        }
        Ok(())
    }

    fn invoke(&self, listener: Listener<T>) -> BoxFuture<'static, Result<()>> {
        let registry = self.registry.clone();
        let event = self.event.clone();
        let payload = self.payload.clone();
        async move {
            let subscribed = registry.lock().is_subscribed(&event, listener.id());
            if !subscribed {
                trace!(event = %event, listener = %listener.id(), "skipped, unsubscribed since snapshot");
                return Ok(());
            }
            listener
                .call(payload)
                .await
                .map_err(|source| listener_failed(&event, source))
        }
        .boxed()
    }
    fn invoke_any(&self, listener: AnyListener<T>) -> BoxFuture<'static, Result<()>> {
        let registry = self.registry.clone();
        let event = self.event.clone();
        let payload = self.payload.clone();
        async move {
            let subscribed = registry.lock().is_subscribed_any(listener.id());
            if !subscribed {
                trace!(event = %event, listener = %listener.id(), "skipped, wildcard unsubscribed since snapshot");
                return Ok(());
            }
            listener
                .call(event.clone(), payload)
                .await
                .map_err(|source| listener_failed(&event, source))
        }
        .boxed()
    }
}

fn listener_failed(event: &EventName, source: ListenerError) -> Error {
    debug!(event = %event, error = %source, "listener failed");
    Error::Listener {
        event: event.to_string(),
        source,
    }
}

/// Registry of named event listeners plus the wildcard listeners, and the operations
/// delivering events to them.
///
/// ```Emitter``` is a handle: clones refer to the same listeners. Storage is private and
/// released when the last clone is dropped.
///
/// All emissions follow the same protocol:
/// 1. listeners are snapshotted synchronously when ```emit_*``` is called;
/// 2. the returned future yields once to the executor before running anything;
/// 3. each snapshotted listener is invoked only if it is still subscribed at that moment.
///
/// Listeners subscribed after the call are not part of that emission. Listeners unsubscribed
/// after the call but before their turn are skipped. Invocations already started always
/// run to completion.
///
/// A listener holding a clone of its own emitter keeps the storage alive after every other
/// handle is gone, until the listener is removed. Listeners which emit or subscribe on their
/// emitter should capture [downgrade](Emitter::downgrade) instead.
pub struct Emitter<T> {
    registry: SharedRegistry<T>,
}

impl<T: Send + Sync + 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Handle which does not keep the listeners alive
    pub fn downgrade(&self) -> WeakEmitter<T> {
        WeakEmitter {
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Subscribe ```listener``` to ```event```. Subscribing the same listener (or its clone)
    /// twice to the same event is a no-op. Returned [Unsubscribe] removes exactly this pairing.
    pub fn subscribe(&self, event: &str, listener: &Listener<T>) -> Unsubscribe {
        let inserted = self.registry.lock().listeners(event).insert(listener.clone());
        trace!(event, listener = %listener.id(), inserted, "subscribed");
        let registry = Arc::downgrade(&self.registry);
        let event: EventName = event.into();
        let id = listener.id();
        Unsubscribe::new(move || {
            if let Some(registry) = registry.upgrade() {
                remove(&registry, &event, id);
            }
        })
    }

    /// Remove ```listener``` from ```event```. Does nothing if it is not subscribed.
    pub fn unsubscribe(&self, event: &str, listener: &Listener<T>) {
        remove(&self.registry, event, listener.id());
    }

    /// Future resolving with the payload of the next emission of ```event```.
    ///
    /// The subscription is made immediately, not on first poll, and removes itself on
    /// delivery. Resolves to ```None``` if the listener is dropped without being called,
    /// e.g. after [clear_listeners](Emitter::clear_listeners) or when the emitter is dropped.
    pub fn subscribe_once(&self, event: &str) -> Once<T> {
        let (once, sender) = Once::new();
        let off = Arc::new(Mutex::new(None::<Unsubscribe>));
        let listener = Listener::new({
            let off = off.clone();
            move |payload| {
                if let Some(off) = off.lock().take() {
                    off.call();
                }
                sender.send(payload);
                future::ready(Ok(()))
            }
        });
        *off.lock() = Some(self.subscribe(event, &listener));
        once
    }

    /// Deliver ```payload``` to listeners of ```event``` and to wildcard listeners, all at once.
    ///
    /// Every eligible listener is started in subscription order (per-event ones first)
    /// without waiting for the others. The future completes when all of them have completed.
    /// If some fail, the first failure is returned, but only after the rest have finished.
    pub fn emit_concurrent(&self, event: &str, payload: T) -> Emission {
        self.snapshot(event, Arc::new(payload)).concurrent().boxed()
    }

    /// Deliver ```payload``` to listeners of ```event``` one by one in subscription order,
    /// then to wildcard listeners the same way.
    ///
    /// The first failing listener stops the emission: nothing after it runs, including the
    /// wildcard listeners when the failure happened among per-event ones.
    pub fn emit_serial(&self, event: &str, payload: T) -> Emission {
        self.snapshot(event, Arc::new(payload)).serial().boxed()
    }

    /// Subscribe ```listener``` to every event of this emitter
    pub fn subscribe_any(&self, listener: &AnyListener<T>) -> Unsubscribe {
        let inserted = self.registry.lock().any.insert(listener.clone());
        trace!(listener = %listener.id(), inserted, "subscribed to any event");
        let registry = Arc::downgrade(&self.registry);
        let id = listener.id();
        Unsubscribe::new(move || {
            if let Some(registry) = registry.upgrade() {
                remove_any(&registry, id);
            }
        })
    }

    pub fn unsubscribe_any(&self, listener: &AnyListener<T>) {
        remove_any(&self.registry, listener.id());
    }

    /// With ```Some(event)``` remove all listeners of that event. With ```None``` remove
    /// everything, wildcard listeners included.
    pub fn clear_listeners(&self, event: Option<&str>) {
        let mut registry = self.registry.lock();
        let removed = match event {
            Some(event) => (registry.events.remove(event), None),
            None => (
                None,
                Some((
                    mem::take(&mut registry.events),
                    mem::take(&mut registry.any),
                )),
            ),
        };
        // listeners may own state which reaches back into the emitter when dropped
        drop(registry);
        drop(removed);
        trace!(event, "listeners cleared");
    }

    /// Number of wildcard listeners plus listeners of ```event```, or of all events for ```None```
    pub fn listener_count(&self, event: Option<&str>) -> usize {
        self.registry.lock().count(event)
    }

    fn snapshot(&self, event: &str, payload: Arc<T>) -> Delivery<T> {
        let mut registry = self.registry.lock();
        let listeners = registry.listeners(event).snapshot();
        let any = registry.any.snapshot();
        Delivery {
            event: event.into(),
            payload,
            listeners,
            any,
            registry: self.registry.clone(),
        }
    }
}

// The removed listener is dropped after the lock is released.
fn remove<T>(registry: &Mutex<Registry<T>>, event: &str, id: ListenerId) {
    let removed = registry
        .lock()
        .events
        .get_mut(event)
        .and_then(|listeners| listeners.remove(id));
    trace!(event, listener = %id, removed = removed.is_some(), "unsubscribed");
}

fn remove_any<T>(registry: &Mutex<Registry<T>>, id: ListenerId) {
    let removed = registry.lock().any.remove(id);
    trace!(listener = %id, removed = removed.is_some(), "unsubscribed from any event");
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("Emitter")
            .field("events", &registry.events.len())
            .field("listeners", &registry.count(None))
            .finish()
    }
}

/// Non-owning reference to an [Emitter], obtained by [Emitter::downgrade]
pub struct WeakEmitter<T> {
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> WeakEmitter<T> {
    /// ```None``` once every [Emitter] handle has been dropped
    pub fn upgrade(&self) -> Option<Emitter<T>> {
        self.registry.upgrade().map(|registry| Emitter { registry })
    }
}

impl<T> Clone for WeakEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T> fmt::Debug for WeakEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakEmitter")
    }
}

/// Handle removing one subscription. Calling it more than once does nothing.
/// Dropping it keeps the subscription. It does not keep the emitter alive.
#[derive(Clone)]
pub struct Unsubscribe(Arc<dyn Fn() + Send + Sync>);

impl Unsubscribe {
    fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe")
    }
}

/// Types carrying an [Emitter]. Implemented by ```#[derive(Emitter)]``` hosts.
pub trait HasEmitter {
    type Payload: Send + Sync + 'static;
    fn emitter(&self) -> &Emitter<Self::Payload>;
}

impl<T: Send + Sync + 'static> HasEmitter for Emitter<T> {
    type Payload = T;
    fn emitter(&self) -> &Emitter<T> {
        self
    }
}
