//! Interop between the two hook generations on one chain.
//!
//! Handlers written against the older single-object API share the call frame
//! with phase-split hooks: same arguments, same outcome, same extras.

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use common::{AfterObserver, OnceExtraWriter, engine, instance_method, static_method, str_value};
use waylay::testing::{OrderHooker, OrderLegacyHooker};
use waylay::{
    BoxError, DispatchError, LegacyHooker, LegacyParam, MethodId, Throwable, Value,
};

struct LegacyEarlyReturn {
    value: Value,
}

impl LegacyHooker for LegacyEarlyReturn {
    fn before_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        param.set_result(self.value.clone());
        Ok(())
    }
}

struct LegacyThrow {
    class: &'static str,
}

impl LegacyHooker for LegacyThrow {
    fn before_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        param.set_throwable(Throwable::without_message(self.class));
        Ok(())
    }
}

struct LegacyArgTweak {
    index: usize,
    value: Value,
}

impl LegacyHooker for LegacyArgTweak {
    fn before_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        param.args[self.index] = self.value.clone();
        Ok(())
    }
}

// Records what the original produced, then overrides it.
struct LegacyRewriteAfter {
    value: Value,
    prior: Arc<Mutex<Vec<Option<Value>>>>,
}

impl LegacyHooker for LegacyRewriteAfter {
    fn after_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        self.prior.lock().unwrap().push(param.result().cloned());
        param.set_result(self.value.clone());
        Ok(())
    }
}

// Mutates an argument, claims an early return, and then fails.
struct FaultyLegacy;

impl LegacyHooker for FaultyLegacy {
    fn before_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        param.args[0] = Value::Int(-1);
        param.set_result(Value::Int(-2));
        Err("legacy handler fault".into())
    }
}

struct LegacyExtraReader {
    key: &'static str,
    got: Arc<Mutex<Vec<Option<Value>>>>,
}

impl LegacyHooker for LegacyExtraReader {
    fn after_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        self.got.lock().unwrap().push(param.extra(self.key).cloned());
        Ok(())
    }
}

struct LegacyCapture {
    seen: Arc<Mutex<Vec<(Option<Value>, Vec<Value>)>>>,
}

impl LegacyHooker for LegacyCapture {
    fn before_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        self.seen
            .lock()
            .unwrap()
            .push((param.this_object.clone(), param.args.clone()));
        Ok(())
    }
}

#[test]
fn legacy_handlers_run_after_modern_hooks_regardless_of_priority() {
    let (_bridge, registry, dispatcher) = engine();
    let method = static_method(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    // The legacy handler asks for the earlier slot but still trails the
    // modern group in the before phase and leads it in the after phase.
    registry
        .hook_legacy_with_priority(&method, 10, OrderLegacyHooker::new("legacy", order.clone()))
        .unwrap();
    registry
        .hook_with_priority(&method, 90, OrderHooker::new("modern", order.clone()))
        .unwrap();

    dispatcher.dispatch(&method, Vec::new()).unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "modern:before",
            "legacy:before",
            "legacy:after",
            "modern:after",
        ],
    );
}

#[test]
fn legacy_handlers_order_among_themselves_by_priority() {
    let (_bridge, registry, dispatcher) = engine();
    let method = static_method(2);
    let order = Arc::new(Mutex::new(Vec::new()));

    registry
        .hook_legacy_with_priority(&method, 50, OrderLegacyHooker::new("late", order.clone()))
        .unwrap();
    registry
        .hook_legacy_with_priority(&method, 10, OrderLegacyHooker::new("early", order.clone()))
        .unwrap();

    dispatcher.dispatch(&method, Vec::new()).unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "early:before",
            "late:before",
            "late:after",
            "early:after",
        ],
    );
}

#[test]
fn legacy_early_return_skips_the_original() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(3);
    let seen = Arc::new(Mutex::new(Vec::new()));

    registry
        .hook_after(&method, AfterObserver { seen: seen.clone() })
        .unwrap();
    registry
        .hook_legacy(
            &method,
            LegacyEarlyReturn {
                value: Value::Int(5),
            },
        )
        .unwrap();

    let result = dispatcher.dispatch(&method, Vec::new());

    assert_eq!(result, Ok(Value::Int(5)));
    assert_eq!(bridge.original_calls(MethodId(3)), 0);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].result, Some(Value::Int(5)));
    assert!(seen[0].skipped);
}

#[test]
fn legacy_null_result_still_returns_early() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(4);
    bridge.set_result(MethodId(4), Value::Int(7));

    registry
        .hook_legacy(&method, LegacyEarlyReturn { value: Value::Null })
        .unwrap();

    // Null is a real early return, not "leave the call alone".
    assert_eq!(dispatcher.dispatch(&method, Vec::new()), Ok(Value::Null));
    assert_eq!(bridge.original_calls(MethodId(4)), 0);
}

#[test]
fn legacy_early_throw_reaches_the_caller() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(5);

    registry
        .hook_legacy(
            &method,
            LegacyThrow {
                class: "java.lang.UnsupportedOperationException",
            },
        )
        .unwrap();

    match dispatcher.dispatch(&method, Vec::new()) {
        Err(DispatchError::Thrown(t)) => {
            assert_eq!(t.class(), "java.lang.UnsupportedOperationException");
        }
        other => panic!("expected a thrown outcome, got {other:?}"),
    }
    assert_eq!(bridge.original_calls(MethodId(5)), 0);
}

#[test]
fn legacy_argument_writes_reach_the_original() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(6);

    registry
        .hook_legacy(
            &method,
            LegacyArgTweak {
                index: 0,
                value: Value::Int(77),
            },
        )
        .unwrap();

    dispatcher.dispatch(&method, vec![Value::Int(0)]).unwrap();

    let call = bridge.last_original_call(MethodId(6)).unwrap();
    assert_eq!(call.args, vec![Value::Int(77)]);
}

#[test]
fn legacy_after_handler_overrides_the_result() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(7);
    bridge.set_result(MethodId(7), Value::Int(7));
    let prior = Arc::new(Mutex::new(Vec::new()));

    registry
        .hook_legacy(
            &method,
            LegacyRewriteAfter {
                value: Value::Int(1000),
                prior: prior.clone(),
            },
        )
        .unwrap();

    assert_eq!(
        dispatcher.dispatch(&method, Vec::new()),
        Ok(Value::Int(1000)),
    );
    // The handler saw the original's result before replacing it.
    assert_eq!(*prior.lock().unwrap(), vec![Some(Value::Int(7))]);
}

#[test]
fn faulting_legacy_handler_keeps_writes_but_decides_nothing() {
    let (bridge, registry, dispatcher) = engine();
    let method = static_method(8);

    registry.hook_legacy(&method, FaultyLegacy).unwrap();

    let result = dispatcher.dispatch(&method, vec![Value::Int(42)]);

    // Same containment as a phase-split hook: the argument write sticks,
    // while the attempted early return is discarded with the fault.
    assert_eq!(result, Ok(Value::Null));
    assert_eq!(bridge.original_calls(MethodId(8)), 1);
    let call = bridge.last_original_call(MethodId(8)).unwrap();
    assert_eq!(call.args, vec![Value::Int(-1)]);
}

#[test]
fn extras_flow_between_modern_and_legacy_hooks() {
    let (_bridge, registry, dispatcher) = engine();
    let method = static_method(9);
    let got = Arc::new(Mutex::new(Vec::new()));

    registry
        .hook_before(
            &method,
            OnceExtraWriter {
                key: "shared",
                value: Value::Long(123),
                armed: AtomicBool::new(true),
            },
        )
        .unwrap();
    registry
        .hook_legacy(
            &method,
            LegacyExtraReader {
                key: "shared",
                got: got.clone(),
            },
        )
        .unwrap();

    dispatcher.dispatch(&method, Vec::new()).unwrap();

    assert_eq!(*got.lock().unwrap(), vec![Some(Value::Long(123))]);
}

#[test]
fn legacy_param_carries_the_receiver() {
    let (_bridge, registry, dispatcher) = engine();
    let method = instance_method(10);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let receiver = str_value("receiver");

    registry
        .hook_legacy(&method, LegacyCapture { seen: seen.clone() })
        .unwrap();

    dispatcher
        .dispatch(&method, vec![receiver.clone(), Value::Int(1)])
        .unwrap();

    assert_eq!(
        seen.lock().unwrap()[0],
        (Some(receiver), vec![Value::Int(1)]),
    );
}
