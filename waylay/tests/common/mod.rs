#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
    mpsc::{Receiver, SyncSender},
};

use waylay::testing::TestBridge;
use waylay::{
    AfterHookCallback, AfterHooker, BeforeHookCallback, BeforeHooker, BoxError, Dispatcher,
    HookContext, HookRegistry, MethodDesc, MethodFlags, MethodId, ObjectRef, TypeDesc, Value,
};

// ============================================================================
// Engine and method fixtures
// ============================================================================

pub fn engine() -> (Arc<TestBridge>, HookRegistry, Dispatcher) {
    let bridge = Arc::new(TestBridge::new());
    let registry = HookRegistry::new(bridge.clone());
    let dispatcher = Dispatcher::new(registry.clone(), bridge.clone());
    (bridge, registry, dispatcher)
}

pub fn instance_method(id: u64) -> Arc<MethodDesc> {
    Arc::new(MethodDesc::new(MethodId(id), "com.example.Target", "greet"))
}

pub fn static_method(id: u64) -> Arc<MethodDesc> {
    Arc::new(
        MethodDesc::new(MethodId(id), "com.example.Target", "create").flags(MethodFlags::STATIC),
    )
}

pub fn constructor(id: u64) -> Arc<MethodDesc> {
    Arc::new(
        MethodDesc::new(MethodId(id), "com.example.Target", "<init>")
            .flags(MethodFlags::CONSTRUCTOR),
    )
}

pub fn string_method(id: u64) -> Arc<MethodDesc> {
    Arc::new(
        MethodDesc::new(MethodId(id), "com.example.Target", "describe")
            .returns(TypeDesc::reference("java.lang.String")),
    )
}

pub fn str_value(text: &str) -> Value {
    Value::Object(ObjectRef::new("java.lang.String", text.to_string()))
}

// ============================================================================
// Scenario hookers
// ============================================================================

pub struct SetArgHooker {
    pub index: usize,
    pub value: Value,
}

impl BeforeHooker for SetArgHooker {
    fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        call.set_arg(self.index, self.value.clone());
        Ok(None)
    }
}

// Mutates an argument, decides the call, then faults. Pins down what fault
// containment undoes (the decision) and what it keeps (the argument).
pub struct MutatingFaultyHooker {
    pub index: usize,
    pub value: Value,
}

impl BeforeHooker for MutatingFaultyHooker {
    fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        call.set_arg(self.index, self.value.clone());
        call.return_and_skip(Value::Int(-7));
        Err("fault after mutating".into())
    }
}

pub struct PanickingHooker {
    pub in_before: bool,
    pub in_after: bool,
}

impl BeforeHooker for PanickingHooker {
    fn before(&self, _call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        if self.in_before {
            panic!("before hook panicked on purpose");
        }
        Ok(None)
    }
}

impl AfterHooker for PanickingHooker {
    fn after(
        &self,
        _call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        if self.in_after {
            panic!("after hook panicked on purpose");
        }
        Ok(())
    }
}

pub struct ResultSettingHooker {
    pub value: Value,
}

impl AfterHooker for ResultSettingHooker {
    fn after(
        &self,
        call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        call.set_result(self.value.clone());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SeenAfter {
    pub result: Option<Value>,
    pub throwable: Option<String>,
    pub skipped: bool,
}

pub struct AfterObserver {
    pub seen: Arc<Mutex<Vec<SeenAfter>>>,
}

impl AfterHooker for AfterObserver {
    fn after(
        &self,
        call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        self.seen.lock().unwrap().push(SeenAfter {
            result: call.result().cloned(),
            throwable: call.throwable().map(|t| t.class().to_string()),
            skipped: call.is_skipped(),
        });
        Ok(())
    }
}

pub struct CaptureBeforeHooker {
    pub seen: Arc<Mutex<Vec<(Option<Value>, Vec<Value>)>>>,
}

impl BeforeHooker for CaptureBeforeHooker {
    fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        self.seen
            .lock()
            .unwrap()
            .push((call.this_object().cloned(), call.args().to_vec()));
        Ok(None)
    }
}

// Hands a number through the per-registration context channel and records
// what comes back on the other side.
pub struct ContextHooker {
    pub give: u64,
    pub got: Arc<Mutex<Vec<Option<u64>>>>,
}

impl BeforeHooker for ContextHooker {
    fn before(&self, _call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        Ok(Some(Box::new(self.give)))
    }
}

impl AfterHooker for ContextHooker {
    fn after(
        &self,
        _call: &mut AfterHookCallback<'_>,
        context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        let value = context
            .and_then(|ctx| ctx.downcast::<u64>().ok())
            .map(|boxed| *boxed);
        self.got.lock().unwrap().push(value);
        Ok(())
    }
}

// Writes a call-scoped extra on its first invocation only, so a second
// dispatch proves extras never leak between calls.
pub struct OnceExtraWriter {
    pub key: &'static str,
    pub value: Value,
    pub armed: AtomicBool,
}

impl BeforeHooker for OnceExtraWriter {
    fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            call.set_extra(self.key, self.value.clone());
        }
        Ok(None)
    }
}

pub struct ExtraReader {
    pub key: &'static str,
    pub got: Arc<Mutex<Vec<Option<Value>>>>,
}

impl AfterHooker for ExtraReader {
    fn after(
        &self,
        call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        self.got.lock().unwrap().push(call.extra(self.key).cloned());
        Ok(())
    }
}

// Rendezvous hooker: on its first run it reports in and then blocks until
// released, holding the dispatch mid-chain. Later runs pass through.
pub struct GateHooker {
    pub entered: Mutex<SyncSender<()>>,
    pub release: Mutex<Receiver<()>>,
    pub armed: AtomicBool,
}

impl BeforeHooker for GateHooker {
    fn before(&self, _call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        Ok(None)
    }
}

impl AfterHooker for GateHooker {
    fn after(
        &self,
        _call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}
