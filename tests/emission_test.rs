use std::sync::Arc;
use std::time::Duration;

use async_event_emitter::{AnyListener, Emitter, Error, Listener, ListenerError, Unsubscribe};
use async_std::{future::timeout, task::sleep};
use futures::{channel::oneshot, executor::block_on, poll, task::Poll};
use parking_lot::Mutex;

type Log = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Listener logging "<name> start" when invoked and "<name> end" after ```delay```
fn logging(log: &Log, name: &'static str, delay: Duration) -> Listener<usize> {
    let log = log.clone();
    Listener::new(move |_| {
        log.lock().push(format!("{name} start"));
        let log = log.clone();
        async move {
            sleep(delay).await;
            log.lock().push(format!("{name} end"));
            Ok(())
        }
    })
}

fn logging_any(log: &Log, name: &'static str) -> AnyListener<usize> {
    let log = log.clone();
    AnyListener::new(move |event, n| {
        log.lock().push(format!("{name} {event}={n}"));
        async { Ok(()) }
    })
}

fn failing(log: &Log, name: &'static str, delay: Duration) -> Listener<usize> {
    let log = log.clone();
    Listener::new(move |_| {
        log.lock().push(format!("{name} start"));
        async move {
            sleep(delay).await;
            Err(ListenerError::from(name))
        }
    })
}

fn listener_source(err: Error) -> String {
    match err {
        Error::Listener { source, .. } => source.to_string(),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_emit_concurrent_calls_every_listener_once() {
    init_tracing();
    let emitter = Emitter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for name in ["l1", "l2"] {
        let seen = seen.clone();
        emitter.subscribe(
            "x",
            &Listener::new(move |n: Arc<usize>| {
                seen.lock().push((name, *n));
                async { Ok(()) }
            }),
        );
    }
    block_on(emitter.emit_concurrent("x", 42)).unwrap();
    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec![("l1", 42), ("l2", 42)]);
}

#[test]
fn test_emission_yields_before_dispatch() {
    let emitter = Emitter::new();
    let log = Log::default();
    emitter.subscribe("x", &logging(&log, "l1", Duration::ZERO));
    block_on(async {
        let mut concurrent = emitter.emit_concurrent("x", 1);
        assert!(matches!(poll!(&mut concurrent), Poll::Pending));
        assert!(log.lock().is_empty());
        concurrent.await.unwrap();

        let mut serial = emitter.emit_serial("x", 1);
        assert!(matches!(poll!(&mut serial), Poll::Pending));
        serial.await.unwrap();
    });
    assert_eq!(log.lock().len(), 4);
}

#[test]
fn test_emit_concurrent_starts_listeners_together() {
    let emitter = Emitter::<usize>::new();
    let (tx, rx) = oneshot::channel::<()>();
    let rx = Mutex::new(Some(rx));
    let tx = Mutex::new(Some(tx));
    // first listener waits for the second one, which would hang a serial emission
    emitter.subscribe(
        "x",
        &Listener::new(move |_| {
            let rx = rx.lock().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok(())
            }
        }),
    );
    emitter.subscribe(
        "x",
        &Listener::new(move |_| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
            async { Ok(()) }
        }),
    );
    block_on(timeout(Duration::from_secs(5), emitter.emit_concurrent("x", 0)))
        .unwrap()
        .unwrap();
}

#[test]
fn test_emit_concurrent_start_order() {
    let emitter = Emitter::new();
    let log = Log::default();
    emitter.subscribe_any(&logging_any(&log, "any"));
    emitter.subscribe("x", &logging(&log, "l1", Duration::from_millis(30)));
    emitter.subscribe("x", &logging(&log, "l2", Duration::from_millis(5)));
    block_on(emitter.emit_concurrent("x", 1)).unwrap();
    let log = log.lock();
    assert_eq!(log[..3], ["l1 start", "l2 start", "any x=1"]);
    // l2 finished first because it waited less
    assert_eq!(log[3..], ["l2 end", "l1 end"]);
}

#[test]
fn test_emit_concurrent_failure_waits_for_siblings() {
    let emitter = Emitter::new();
    let log = Log::default();
    emitter.subscribe("x", &failing(&log, "boom", Duration::ZERO));
    emitter.subscribe("x", &logging(&log, "slow", Duration::from_millis(20)));
    emitter.subscribe_any(&logging_any(&log, "any"));
    let err = block_on(emitter.emit_concurrent("x", 1)).unwrap_err();
    assert!(err.is_listener_failure());
    assert_eq!(err.to_string(), "listener of `x` failed: boom");
    assert!(log.lock().contains(&"slow end".to_string()));
    assert!(log.lock().contains(&"any x=1".to_string()));
}

#[test]
fn test_emit_concurrent_first_failure_wins() {
    let emitter = Emitter::new();
    let log = Log::default();
    emitter.subscribe("x", &failing(&log, "late", Duration::from_millis(30)));
    emitter.subscribe("x", &failing(&log, "early", Duration::ZERO));
    let err = block_on(emitter.emit_concurrent("x", 1)).unwrap_err();
    assert_eq!(listener_source(err), "early");
}

#[test]
fn test_emit_serial_runs_in_order() {
    let emitter = Emitter::new();
    let log = Log::default();
    emitter.subscribe("x", &logging(&log, "l1", Duration::from_millis(20)));
    emitter.subscribe("x", &logging(&log, "l2", Duration::from_millis(5)));
    emitter.subscribe("x", &logging(&log, "l3", Duration::ZERO));
    emitter.subscribe_any(&logging_any(&log, "any"));
    block_on(emitter.emit_serial("x", 1)).unwrap();
    assert_eq!(
        *log.lock(),
        vec!["l1 start", "l1 end", "l2 start", "l2 end", "l3 start", "l3 end", "any x=1"]
    );
}

#[test]
fn test_emit_serial_stops_on_failure() {
    let emitter = Emitter::new();
    let log = Log::default();
    emitter.subscribe("x", &failing(&log, "boom", Duration::ZERO));
    emitter.subscribe("x", &logging(&log, "l2", Duration::ZERO));
    emitter.subscribe_any(&logging_any(&log, "any"));
    let err = block_on(emitter.emit_serial("x", 1)).unwrap_err();
    assert_eq!(listener_source(err), "boom");
    // neither the next listener nor the wildcard phase ran
    assert_eq!(*log.lock(), vec!["boom start"]);
}

#[test]
fn test_emit_serial_wildcard_failure() {
    let emitter = Emitter::new();
    let log = Log::default();
    emitter.subscribe("x", &logging(&log, "l1", Duration::ZERO));
    emitter.subscribe_any(&AnyListener::new(|_, _| async { Err(ListenerError::from("any failed")) }));
    emitter.subscribe_any(&logging_any(&log, "any"));
    let err = block_on(emitter.emit_serial("x", 1)).unwrap_err();
    assert_eq!(listener_source(err), "any failed");
    assert_eq!(*log.lock(), vec!["l1 start", "l1 end"]);
}

#[test]
fn test_self_unsubscribe_completes_invocation() {
    for serial in [false, true] {
        let emitter = Emitter::<usize>::new();
        let log = Log::default();
        let off: Arc<Mutex<Option<Unsubscribe>>> = Arc::default();
        let listener = Listener::new({
            let log = log.clone();
            let off = off.clone();
            move |n| {
                if let Some(off) = off.lock().as_ref() {
                    off.call();
                }
                let log = log.clone();
                async move {
                    sleep(Duration::from_millis(5)).await;
                    log.lock().push(format!("done {n}"));
                    Ok(())
                }
            }
        });
        *off.lock() = Some(emitter.subscribe("n", &listener));
        block_on(async {
            let emit = |n: usize| {
                if serial {
                    emitter.emit_serial("n", n)
                } else {
                    emitter.emit_concurrent("n", n)
                }
            };
            emit(1).await.unwrap();
            assert_eq!(emitter.listener_count(Some("n")), 0);
            emit(2).await.unwrap();
        });
        assert_eq!(*log.lock(), vec!["done 1"]);
    }
}

#[test]
fn test_listener_unsubscribing_sibling() {
    for serial in [false, true] {
        let emitter = Emitter::<usize>::new();
        let log = Log::default();
        let off_l2: Arc<Mutex<Option<Unsubscribe>>> = Arc::default();
        let l1 = Listener::new({
            let off_l2 = off_l2.clone();
            move |_| {
                if let Some(off) = off_l2.lock().as_ref() {
                    off.call();
                }
                async { Ok(()) }
            }
        });
        emitter.subscribe("n", &l1);
        *off_l2.lock() = Some(emitter.subscribe("n", &logging(&log, "l2", Duration::ZERO)));
        let emission = if serial {
            emitter.emit_serial("n", 1)
        } else {
            emitter.emit_concurrent("n", 1)
        };
        block_on(emission).unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(emitter.listener_count(Some("n")), 1);
    }
}

#[test]
fn test_subscribed_during_emission_waits_for_next() {
    let emitter = Emitter::<usize>::new();
    let log = Log::default();
    let late = logging(&log, "late", Duration::ZERO);
    let weak = emitter.downgrade();
    emitter.subscribe("n", &Listener::new(move |_| {
        if let Some(emitter) = weak.upgrade() {
            emitter.subscribe("n", &late);
        }
        async { Ok(()) }
    }));
    block_on(emitter.emit_concurrent("n", 1)).unwrap();
    assert!(log.lock().is_empty());
    block_on(emitter.emit_serial("n", 2)).unwrap();
    assert_eq!(*log.lock(), vec!["late start", "late end"]);
}

#[test]
fn test_reemitting_listener_does_not_keep_emitter_alive() {
    let emitter = Emitter::<usize>::new();
    let log = Log::default();
    emitter.subscribe("done", &logging(&log, "done", Duration::ZERO));
    let weak = emitter.downgrade();
    emitter.subscribe("n", &Listener::new({
        let weak = weak.clone();
        move |_| {
            let emitter = weak.upgrade();
            async move {
                match emitter {
                    Some(emitter) => emitter
                        .emit_serial("done", 0)
                        .await
                        .map_err(ListenerError::from),
                    None => Ok(()),
                }
            }
        }
    }));
    block_on(emitter.emit_serial("n", 1)).unwrap();
    assert_eq!(*log.lock(), vec!["done start", "done end"]);
    drop(emitter);
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_wildcard_unsubscribed_before_dispatch() {
    let emitter = Emitter::new();
    let log = Log::default();
    let any = logging_any(&log, "any");
    emitter.subscribe_any(&any);
    let emission = emitter.emit_concurrent("x", 1);
    emitter.unsubscribe_any(&any);
    block_on(emission).unwrap();
    assert!(log.lock().is_empty());
}
