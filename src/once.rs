use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::channel::oneshot;
use parking_lot::Mutex;

/// Future returned by [subscribe_once](crate::Emitter::subscribe_once).
///
/// Resolves to ```Some(payload)``` of the first emission after subscription, or ```None```
/// if the subscription was removed without delivery (cleared or emitter dropped).
#[must_use = "the payload is only observable by awaiting this future"]
pub struct Once<T> {
    receiver: oneshot::Receiver<Arc<T>>,
}

/// Sending half kept by the one-shot listener. ```send``` is effective only once.
pub(crate) struct OnceSender<T>(Mutex<Option<oneshot::Sender<Arc<T>>>>);

impl<T> Once<T> {
    pub(crate) fn new() -> (Self, OnceSender<T>) {
        let (sender, receiver) = oneshot::channel();
        (Self { receiver }, OnceSender(Mutex::new(Some(sender))))
    }
}

impl<T> OnceSender<T> {
    pub fn send(&self, payload: Arc<T>) {
        if let Some(sender) = self.0.lock().take() {
            // receiver may be gone already, nobody waits then
            let _ = sender.send(payload);
        }
    }
}

impl<T> Future for Once<T> {
    type Output = Option<Arc<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(Result::ok)
    }
}
