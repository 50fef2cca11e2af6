//!
//! Asynchronous emitter of named events for listeners living in the same process
//!
//! # Usage sample
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use futures::executor::block_on;
//! use async_event_emitter::{AnyListener, Emitter, EventName, Listener};
//!
//! let emitter = Emitter::<u32>::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let listener = Listener::new({
//!     let seen = seen.clone();
//!     move |n: Arc<u32>| {
//!         seen.lock().unwrap().push(format!("x={n}"));
//!         async { Ok(()) }
//!     }
//! });
//! let off = emitter.subscribe("x", &listener);
//! emitter.subscribe_any(&AnyListener::new({
//!     let seen = seen.clone();
//!     move |event: EventName, n: Arc<u32>| {
//!         seen.lock().unwrap().push(format!("any {event}={n}"));
//!         async { Ok(()) }
//!     }
//! }));
//! assert_eq!(emitter.listener_count(Some("x")), 2);
//!
//! block_on(async {
//!     emitter.emit_serial("x", 42).await.unwrap();
//!     off.call();
//!     emitter.emit_serial("x", 43).await.unwrap();
//! });
//! assert_eq!(*seen.lock().unwrap(), vec!["x=42", "any x=42", "any x=43"]);
//! ```
//!
//! # Listeners
//!
//! [Listener] receives the payload of one event name, [AnyListener] receives every event
//! of the emitter together with its name. A listener is identified by the object, not by
//! what it does: subscribing the same [Listener] (or its clone) twice to one event keeps one
//! subscription, while two listeners built from the same closure are two subscriptions.
//! Payloads are shared between listeners as ```Arc<T>```.
//!
//! # Delivery
//!
//! [emit_concurrent](Emitter::emit_concurrent) starts all listeners at once and completes
//! when every one of them has completed, [emit_serial](Emitter::emit_serial) runs them one by
//! one in subscription order, per-event listeners first, then wildcard listeners.
//!
//! The set of listeners is fixed when ```emit_*``` is called. The returned future then yields
//! to the executor once before any listener runs, so an emission never completes
//! synchronously inside the call. Right before each listener is invoked the emitter checks that
//! it is still subscribed: a listener removed in the meantime (by its sibling, by
//! [subscribe_once](Emitter::subscribe_once) delivery, or by anybody else) is skipped.
//! Listeners subscribed after the call wait for the next emission.
//!
//! # Errors
//!
//! A listener failure is returned from the emission future as [Error::Listener].
//! ```emit_concurrent``` reports the first failure after all listeners finished,
//! ```emit_serial``` stops at the first failure and does not run the wildcard listeners then.
//!
//! # Attaching emitter to other types
//!
//! The ```async_event_emitter_derive``` crate provides ```#[derive(Emitter)]``` which forwards
//! the emitter operations from a host structure to its [Emitter] field. For runtime binding
//! see [Emitter::bind_methods].
//!

mod emitter;
mod error;
mod listener;
mod listener_set;
pub mod methods;
mod once;

pub use emitter::{Emission, Emitter, HasEmitter, Unsubscribe, WeakEmitter};
pub use error::{Error, Result};
pub use listener::{
    AnyEventHandler, AnyListener, EventHandler, EventName, Listener, ListenerError, ListenerId,
    ListenerResult,
};
pub use methods::{BindTarget, BoundMethod, Method};
pub use once::Once;
