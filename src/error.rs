//! Errors reported by the emitter.
//!
//! - configuration errors ([`Error::UnknownMethod`], [`Error::MethodExists`]) are raised
//!   synchronously by the method allow-list and [bind_methods](crate::Emitter::bind_methods);
//! - [`Error::NotBound`] is returned by a bound operation called as a different one;
//! - [`Error::Listener`] carries the failure of a listener out of an emission.

use thiserror::Error;

use crate::listener::ListenerError;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// Allow-list contains a name which is not an emitter operation.
    #[error("`{name}` is not an emitter method")]
    UnknownMethod { name: String },

    /// Bind target already has a member with this name.
    #[error("the property `{name}` already exists on target")]
    MethodExists { name: String },

    /// Operation called through a [BoundMethod](crate::BoundMethod) bound as another one.
    #[error("`{called}` called on a binding of `{bound}`")]
    NotBound {
        bound: &'static str,
        called: &'static str,
    },

    /// A listener of `event` returned an error.
    #[error("listener of `{event}` failed: {source}")]
    Listener {
        event: String,
        #[source]
        source: ListenerError,
    },
}

impl Error {
    /// Short stable label (snake_case) for logs.
    ///
    /// ```
    /// use async_event_emitter::Error;
    ///
    /// let err = Error::UnknownMethod { name: "emit".into() };
    /// assert_eq!(err.as_label(), "unknown_method");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::UnknownMethod { .. } => "unknown_method",
            Error::MethodExists { .. } => "method_exists",
            Error::NotBound { .. } => "not_bound",
            Error::Listener { .. } => "listener_failed",
        }
    }

    /// Returns `true` for errors raised by a listener rather than by the emitter itself
    pub fn is_listener_failure(&self) -> bool {
        matches!(self, Error::Listener { .. })
    }
}
