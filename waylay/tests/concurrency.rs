//! Registry and dispatch behavior under concurrent use.
//!
//! The contract under test: a dispatch runs against the chain as of its
//! start, registry churn never tears an in-flight call, and instrumentation
//! install/teardown events stay strictly paired.

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use common::{GateHooker, engine, static_method};
use waylay::testing::{CountingHooker, Lifecycle};
use waylay::{
    AfterHookCallback, AfterHooker, BeforeHookCallback, BeforeHooker, BoxError, HookContext,
    MethodId, Value,
};

#[test]
fn in_flight_calls_keep_their_snapshot() {
    let (_bridge, registry, dispatcher) = engine();
    let method = static_method(1);

    let early = CountingHooker::new();
    let handle = registry
        .hook_with_priority(&method, 10, early.clone())
        .unwrap();

    let (entered_tx, entered_rx) = mpsc::sync_channel(0);
    let (release_tx, release_rx) = mpsc::channel();
    registry
        .hook_with_priority(
            &method,
            20,
            GateHooker {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
                armed: AtomicBool::new(true),
            },
        )
        .unwrap();

    let late = CountingHooker::new();

    thread::scope(|s| {
        let worker = s.spawn(|| dispatcher.dispatch(&method, Vec::new()));

        entered_rx.recv().unwrap();
        // The call is parked mid-chain: rewire the registry under it.
        handle.unhook();
        registry
            .hook_with_priority(&method, 90, late.clone())
            .unwrap();
        release_tx.send(()).unwrap();

        assert_eq!(worker.join().unwrap(), Ok(Value::Null));
    });

    // The parked call saw the chain as of its start: the removed hook ran
    // both phases, the added one ran neither.
    assert_eq!(early.befores(), 1);
    assert_eq!(early.afters(), 1);
    assert_eq!(late.befores(), 0);

    // A fresh call sees only the new chain.
    dispatcher.dispatch(&method, Vec::new()).unwrap();
    assert_eq!(early.befores(), 1);
    assert_eq!(late.befores(), 1);
    assert_eq!(late.afters(), 1);
}

#[test]
fn lifecycle_events_stay_paired_under_churn() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(2);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    let handle = registry.hook(&method, CountingHooker::new()).unwrap();
                    handle.unhook();
                }
            });
        }
        for _ in 0..2 {
            s.spawn(|| {
                for _ in 0..200 {
                    dispatcher.dispatch(&method, Vec::new()).unwrap();
                }
            });
        }
    });

    // Install fires only on the 0 -> 1 edge and teardown on 1 -> 0, so the
    // event stream must alternate no matter how the threads interleaved.
    let events = bridge.lifecycle(MethodId(2));
    assert!(!events.is_empty());
    assert_eq!(events.len() % 2, 0);
    for pair in events.chunks(2) {
        assert_eq!(pair, [Lifecycle::Installed, Lifecycle::Removed]);
    }
    assert_eq!(bridge.original_calls(MethodId(2)), 400);
}

// Echoes the first argument through a call-scoped extra so the after phase
// can detect frames bleeding between concurrent calls.
struct PairProbe {
    log: Arc<Mutex<Vec<(Value, Value)>>>,
}

impl BeforeHooker for PairProbe {
    fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        let first = call.arg(0).cloned().unwrap_or(Value::Null);
        call.set_extra("echo", first);
        Ok(None)
    }
}

impl AfterHooker for PairProbe {
    fn after(
        &self,
        call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        self.log.lock().unwrap().push((
            call.extra("echo").cloned().unwrap_or(Value::Null),
            call.arg(0).cloned().unwrap_or(Value::Null),
        ));
        Ok(())
    }
}

#[test]
fn parallel_calls_do_not_share_frames() {
    let (_bridge, registry, dispatcher) = engine();
    let method = static_method(3);
    let log = Arc::new(Mutex::new(Vec::new()));

    registry
        .hook(&method, PairProbe { log: log.clone() })
        .unwrap();

    thread::scope(|s| {
        let dispatcher = &dispatcher;
        let method = &method;
        for t in 0..4i32 {
            s.spawn(move || {
                for i in 0..50i32 {
                    dispatcher
                        .dispatch(method, vec![Value::Int(t * 1000 + i)])
                        .unwrap();
                }
            });
        }
    });

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 200);
    for (echoed, actual) in log.iter() {
        assert_eq!(echoed, actual);
    }
}

#[test]
fn concurrent_dispatches_each_run_the_full_chain_once() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(4);
    let counting = CountingHooker::new();

    registry.hook(&method, counting.clone()).unwrap();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    dispatcher.dispatch(&method, Vec::new()).unwrap();
                }
            });
        }
    });

    assert_eq!(counting.befores(), 400);
    assert_eq!(counting.afters(), 400);
    assert_eq!(bridge.original_calls(MethodId(4)), 400);
}
