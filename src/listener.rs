use std::{
    fmt,
    future::Future,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use futures::{future::BoxFuture, FutureExt};

/// Name of an event. Wildcard listeners receive it together with the payload.
pub type EventName = Arc<str>;

/// Error type listeners may fail with. Anything convertible with `?` fits.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of one listener invocation
pub type ListenerResult = Result<(), ListenerError>;

type Callback<T> = dyn Fn(Arc<T>) -> BoxFuture<'static, ListenerResult> + Send + Sync;
type AnyCallback<T> = dyn Fn(EventName, Arc<T>) -> BoxFuture<'static, ListenerResult> + Send + Sync;

/// Identity of a listener. Assigned once on construction and shared by all clones,
/// so two listeners are "the same" only if one was cloned from the other.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object-style per-event listener. Wrap it with [Listener::from_handler].
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use async_event_emitter::{EventHandler, Listener, ListenerResult};
///
/// struct Printer;
///
/// #[async_trait]
/// impl EventHandler<String> for Printer {
///     async fn on_event(&self, payload: Arc<String>) -> ListenerResult {
///         println!("{payload}");
///         Ok(())
///     }
/// }
///
/// let listener = Listener::from_handler(Arc::new(Printer));
/// ```
#[async_trait]
pub trait EventHandler<T: Send + Sync + 'static>: Send + Sync {
    async fn on_event(&self, payload: Arc<T>) -> ListenerResult;
}

/// Object-style wildcard listener, see [AnyListener::from_handler]
#[async_trait]
pub trait AnyEventHandler<T: Send + Sync + 'static>: Send + Sync {
    async fn on_any_event(&self, event: EventName, payload: Arc<T>) -> ListenerResult;
}

/// Callback subscribed to a single event name. Cloning keeps the identity, so the clone
/// can be passed to [unsubscribe](crate::Emitter::unsubscribe) later.
pub struct Listener<T> {
    id: ListenerId,
    callback: Arc<Callback<T>>,
}

impl<T: Send + Sync + 'static> Listener<T> {
    /// Wrap an async closure. The closure itself runs only when the listener is
    /// actually invoked, i.e. after the emitter has confirmed it is still subscribed.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        Self {
            id: ListenerId::next(),
            callback: Arc::new(move |payload| f(payload).boxed()),
        }
    }

    pub fn from_handler<H: EventHandler<T> + 'static>(handler: Arc<H>) -> Self {
        Self::new(move |payload| {
            let handler = handler.clone();
            async move { handler.on_event(payload).await }
        })
    }

    pub(crate) fn call(&self, payload: Arc<T>) -> BoxFuture<'static, ListenerResult> {
        (self.callback)(payload)
    }
}

impl<T> Listener<T> {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

/// Callback receiving every event of an emitter together with its name
pub struct AnyListener<T> {
    id: ListenerId,
    callback: Arc<AnyCallback<T>>,
}

impl<T: Send + Sync + 'static> AnyListener<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(EventName, Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        Self {
            id: ListenerId::next(),
            callback: Arc::new(move |event, payload| f(event, payload).boxed()),
        }
    }

    pub fn from_handler<H: AnyEventHandler<T> + 'static>(handler: Arc<H>) -> Self {
        Self::new(move |event, payload| {
            let handler = handler.clone();
            async move { handler.on_any_event(event, payload).await }
        })
    }

    pub(crate) fn call(&self, event: EventName, payload: Arc<T>) -> BoxFuture<'static, ListenerResult> {
        (self.callback)(event, payload)
    }
}

impl<T> AnyListener<T> {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

macro_rules! identity_traits {
    ($name:ident) => {
        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    id: self.id,
                    callback: self.callback.clone(),
                }
            }
        }

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> Hash for $name<T> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state)
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.id).finish()
            }
        }
    };
}

identity_traits!(Listener);
identity_traits!(AnyListener);
