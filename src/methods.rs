//! Names of the emitter operations and binding them onto other objects.
//!
//! The operation names form the allow-list accepted by [Emitter::bind_methods] and by the
//! ```#[emitter(method = ...)]``` attribute of the derive macro. An omitted allow-list means
//! every operation.

use std::{collections::HashMap, fmt, str::FromStr};

use tracing::trace;

use crate::{
    emitter::{Emission, Emitter, Unsubscribe},
    error::{Error, Result},
    listener::{AnyListener, Listener},
    once::Once,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Method {
    Subscribe,
    Unsubscribe,
    SubscribeOnce,
    EmitConcurrent,
    EmitSerial,
    SubscribeAny,
    UnsubscribeAny,
    ClearListeners,
    ListenerCount,
    BindMethods,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::Subscribe,
        Method::Unsubscribe,
        Method::SubscribeOnce,
        Method::EmitConcurrent,
        Method::EmitSerial,
        Method::SubscribeAny,
        Method::UnsubscribeAny,
        Method::ClearListeners,
        Method::ListenerCount,
        Method::BindMethods,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Subscribe => "subscribe",
            Method::Unsubscribe => "unsubscribe",
            Method::SubscribeOnce => "subscribe_once",
            Method::EmitConcurrent => "emit_concurrent",
            Method::EmitSerial => "emit_serial",
            Method::SubscribeAny => "subscribe_any",
            Method::UnsubscribeAny => "unsubscribe_any",
            Method::ClearListeners => "clear_listeners",
            Method::ListenerCount => "listener_count",
            Method::BindMethods => "bind_methods",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnknownMethod { name: s.to_string() })
    }
}

/// Turn an optional allow-list into operations. ```None``` selects all of them,
/// duplicates are collapsed keeping the first occurrence.
///
/// ```
/// use async_event_emitter::{methods::resolve, Method};
///
/// assert_eq!(resolve(None).unwrap(), Method::ALL.to_vec());
/// assert_eq!(
///     resolve(Some(&["emit_serial", "subscribe"])).unwrap(),
///     vec![Method::EmitSerial, Method::Subscribe]
/// );
/// assert!(resolve(Some(&["emit"])).is_err());
/// ```
pub fn resolve(names: Option<&[&str]>) -> Result<Vec<Method>> {
    let names = match names {
        Some(names) => names,
        None => return Ok(Method::ALL.to_vec()),
    };
    let mut methods = Vec::with_capacity(names.len());
    for name in names {
        let method: Method = name.parse()?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    Ok(methods)
}

/// Emitter operation bound to a particular emitter.
///
/// Only the operation it was bound as can be called through it, the others
/// return [Error::NotBound].
pub struct BoundMethod<T> {
    method: Method,
    emitter: Emitter<T>,
}

impl<T> BoundMethod<T> {
    pub fn method(&self) -> Method {
        self.method
    }
    fn bound_as(&self, called: Method) -> Result<&Emitter<T>> {
        if self.method == called {
            Ok(&self.emitter)
        } else {
            Err(Error::NotBound {
                bound: self.method.as_str(),
                called: called.as_str(),
            })
        }
    }
}

impl<T: Send + Sync + 'static> BoundMethod<T> {
    pub fn subscribe(&self, event: &str, listener: &Listener<T>) -> Result<Unsubscribe> {
        Ok(self.bound_as(Method::Subscribe)?.subscribe(event, listener))
    }
    pub fn unsubscribe(&self, event: &str, listener: &Listener<T>) -> Result<()> {
        self.bound_as(Method::Unsubscribe)?
            .unsubscribe(event, listener);
        Ok(())
    }
    pub fn subscribe_once(&self, event: &str) -> Result<Once<T>> {
        Ok(self.bound_as(Method::SubscribeOnce)?.subscribe_once(event))
    }
    pub fn emit_concurrent(&self, event: &str, payload: T) -> Result<Emission> {
        Ok(self
            .bound_as(Method::EmitConcurrent)?
            .emit_concurrent(event, payload))
    }
    pub fn emit_serial(&self, event: &str, payload: T) -> Result<Emission> {
        Ok(self.bound_as(Method::EmitSerial)?.emit_serial(event, payload))
    }
    pub fn subscribe_any(&self, listener: &AnyListener<T>) -> Result<Unsubscribe> {
        Ok(self.bound_as(Method::SubscribeAny)?.subscribe_any(listener))
    }
    pub fn unsubscribe_any(&self, listener: &AnyListener<T>) -> Result<()> {
        self.bound_as(Method::UnsubscribeAny)?
            .unsubscribe_any(listener);
        Ok(())
    }
    pub fn clear_listeners(&self, event: Option<&str>) -> Result<()> {
        self.bound_as(Method::ClearListeners)?
            .clear_listeners(event);
        Ok(())
    }
    pub fn listener_count(&self, event: Option<&str>) -> Result<usize> {
        Ok(self.bound_as(Method::ListenerCount)?.listener_count(event))
    }
    pub fn bind_methods<B: BindTarget<T>>(
        &self,
        target: &mut B,
        methods: Option<&[&str]>,
    ) -> Result<()> {
        self.bound_as(Method::BindMethods)?
            .bind_methods(target, methods)
    }
}

impl<T> Clone for BoundMethod<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            emitter: self.emitter.clone(),
        }
    }
}

impl<T> fmt::Debug for BoundMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("method", &self.method)
            .field("emitter", &self.emitter)
            .finish()
    }
}

/// Object which can receive bound emitter operations as named members
pub trait BindTarget<T> {
    fn has_member(&self, name: &str) -> bool;
    fn define(&mut self, bound: BoundMethod<T>);
}

impl<T> BindTarget<T> for HashMap<String, BoundMethod<T>> {
    fn has_member(&self, name: &str) -> bool {
        self.contains_key(name)
    }
    fn define(&mut self, bound: BoundMethod<T>) {
        self.insert(bound.method.as_str().to_string(), bound);
    }
}

impl<T: Send + Sync + 'static> Emitter<T> {
    /// Define the allowed operations (all when ```methods``` is ```None```) on ```target```,
    /// each bound to this emitter.
    ///
    /// Nothing is defined if any name is unknown or already present on the target.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use async_event_emitter::{BoundMethod, Emitter};
    ///
    /// let emitter = Emitter::<u32>::new();
    /// let mut target: HashMap<String, BoundMethod<u32>> = HashMap::new();
    /// emitter.bind_methods(&mut target, Some(&["listener_count"])).unwrap();
    /// assert_eq!(target["listener_count"].listener_count(None).unwrap(), 0);
    /// assert!(emitter.bind_methods(&mut target, None).is_err());
    /// ```
    pub fn bind_methods<B: BindTarget<T>>(
        &self,
        target: &mut B,
        methods: Option<&[&str]>,
    ) -> Result<()> {
        let methods = resolve(methods)?;
        if let Some(taken) = methods.iter().find(|m| target.has_member(m.as_str())) {
            return Err(Error::MethodExists {
                name: taken.as_str().to_string(),
            });
        }
        for method in methods {
            trace!(%method, "binding method");
            target.define(BoundMethod {
                method,
                emitter: self.clone(),
            });
        }
        Ok(())
    }
}
