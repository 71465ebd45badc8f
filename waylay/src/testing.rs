//! Testing utilities for Waylay.
//!
//! This module provides the pieces needed to exercise hook chains without a
//! real interception backend.
//!
//! # Features
//!
//! - [`TestBridge`]: a programmable in-memory [`HookBridge`] that records
//!   instrumentation lifecycle and original-method invocations
//! - [`CountingHooker`]: counts how often each phase of a hook runs
//! - [`OrderHooker`] / [`OrderLegacyHooker`]: append phase markers to a
//!   shared log, for asserting chain order
//! - [`SkippingHooker`]: decides the call in the before phase
//! - [`FailingHooker`]: fails in a chosen phase, for isolation tests

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use waylay_core::{
    AfterHookCallback, AfterHooker, BeforeHookCallback, BeforeHooker, BoxError, HookContext,
    LegacyHooker, LegacyParam, MethodDesc, MethodId, Throwable, Value,
};

use crate::bridge::HookBridge;

// ============================================================================
// Test Bridge
// ============================================================================

/// One instrumentation lifecycle event seen by a [`TestBridge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// `hook_method` succeeded for the method.
    Installed,
    /// `unhook_method` was called for the method.
    Removed,
}

/// One recorded invocation of an original method body.
#[derive(Clone, Debug)]
pub struct OriginalCall {
    /// Which method was invoked.
    pub method: MethodId,
    /// The receiver the body saw, if any.
    pub this_object: Option<Value>,
    /// The arguments the body saw, receiver excluded.
    pub args: Vec<Value>,
}

/// A programmable in-memory interception backend.
///
/// Original-method outcomes default to `Ok(Value::Null)` and can be set per
/// method; instrumentation and invocations are recorded for assertions.
///
/// # Example
///
/// ```rust,ignore
/// let bridge = Arc::new(TestBridge::new());
/// bridge.set_result(method.id(), Value::Int(7));
///
/// let registry = HookRegistry::new(bridge.clone());
/// let dispatcher = Dispatcher::new(registry.clone(), bridge.clone());
/// // ... register hooks, dispatch ...
/// assert_eq!(bridge.original_calls(method.id()), 1);
/// ```
pub struct TestBridge {
    results: Mutex<HashMap<MethodId, Result<Value, Throwable>>>,
    invocations: Mutex<Vec<OriginalCall>>,
    lifecycle: Mutex<HashMap<MethodId, Vec<Lifecycle>>>,
    refuse_install: Mutex<HashSet<MethodId>>,
    refuse_deopt: Mutex<HashSet<MethodId>>,
    deoptimized: Mutex<Vec<MethodId>>,
    assignable: Mutex<HashSet<(String, String)>>,
}

impl TestBridge {
    /// An empty bridge: every original call returns `Value::Null`, every
    /// install is allowed.
    pub fn new() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
            lifecycle: Mutex::new(HashMap::new()),
            refuse_install: Mutex::new(HashSet::new()),
            refuse_deopt: Mutex::new(HashSet::new()),
            deoptimized: Mutex::new(Vec::new()),
            assignable: Mutex::new(HashSet::new()),
        }
    }

    /// Makes the original body of `method` return `value`.
    pub fn set_result(&self, method: MethodId, value: Value) {
        self.results.lock().unwrap().insert(method, Ok(value));
    }

    /// Makes the original body of `method` throw.
    pub fn set_throwable(&self, method: MethodId, throwable: Throwable) {
        self.results.lock().unwrap().insert(method, Err(throwable));
    }

    /// Makes `hook_method` refuse `method`.
    pub fn refuse_install(&self, method: MethodId) {
        self.refuse_install.lock().unwrap().insert(method);
    }

    /// Lifts a refusal set by [`refuse_install`](Self::refuse_install).
    pub fn allow_install(&self, method: MethodId) {
        self.refuse_install.lock().unwrap().remove(&method);
    }

    /// Makes `deoptimize` refuse `method`.
    pub fn refuse_deoptimize(&self, method: MethodId) {
        self.refuse_deopt.lock().unwrap().insert(method);
    }

    /// Declares values of class `from` assignable to class `to`. A class
    /// is always assignable to itself.
    pub fn allow_assign(&self, from: impl Into<String>, to: impl Into<String>) {
        self.assignable
            .lock()
            .unwrap()
            .insert((from.into(), to.into()));
    }

    /// Number of original-body invocations recorded for `method`.
    pub fn original_calls(&self, method: MethodId) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    /// The most recent original-body invocation of `method`.
    pub fn last_original_call(&self, method: MethodId) -> Option<OriginalCall> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|call| call.method == method)
            .cloned()
    }

    /// The instrumentation events recorded for `method`, in order.
    pub fn lifecycle(&self, method: MethodId) -> Vec<Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap()
            .get(&method)
            .cloned()
            .unwrap_or_default()
    }

    /// Methods passed to `deoptimize`, in call order.
    pub fn deoptimized_methods(&self) -> Vec<MethodId> {
        self.deoptimized.lock().unwrap().clone()
    }
}

impl Default for TestBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl HookBridge for TestBridge {
    fn hook_method(&self, method: &MethodDesc) -> bool {
        if self.refuse_install.lock().unwrap().contains(&method.id()) {
            return false;
        }
        self.lifecycle
            .lock()
            .unwrap()
            .entry(method.id())
            .or_default()
            .push(Lifecycle::Installed);
        true
    }

    fn unhook_method(&self, method: &MethodDesc) {
        self.lifecycle
            .lock()
            .unwrap()
            .entry(method.id())
            .or_default()
            .push(Lifecycle::Removed);
    }

    fn invoke_original(
        &self,
        method: &MethodDesc,
        this_object: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, Throwable> {
        self.invocations.lock().unwrap().push(OriginalCall {
            method: method.id(),
            this_object: this_object.cloned(),
            args: args.to_vec(),
        });
        self.results
            .lock()
            .unwrap()
            .get(&method.id())
            .cloned()
            .unwrap_or(Ok(Value::Null))
    }

    fn is_instance(&self, value: &Value, class_name: &str) -> bool {
        let actual = match value {
            Value::Object(obj) => obj.class().to_string(),
            other => other.kind_name().to_string(),
        };
        if actual == class_name {
            return true;
        }
        self.assignable
            .lock()
            .unwrap()
            .contains(&(actual, class_name.to_string()))
    }

    fn deoptimize(&self, method: &MethodDesc) -> bool {
        if self.refuse_deopt.lock().unwrap().contains(&method.id()) {
            return false;
        }
        self.deoptimized.lock().unwrap().push(method.id());
        true
    }
}

// ============================================================================
// Counting Hooker
// ============================================================================

/// A both-phase hooker that counts its invocations.
///
/// Clones share their counters, so a test can register one clone and
/// assert on another.
///
/// # Example
///
/// ```rust,ignore
/// let counter = CountingHooker::new();
/// registry.hook(&method, counter.clone())?;
///
/// dispatcher.dispatch(&method, vec![])?;
/// assert_eq!(counter.befores(), 1);
/// assert_eq!(counter.afters(), 1);
/// ```
pub struct CountingHooker {
    befores: Arc<AtomicUsize>,
    afters: Arc<AtomicUsize>,
}

impl CountingHooker {
    /// A hooker with both counters at zero.
    pub fn new() -> Self {
        Self {
            befores: Arc::new(AtomicUsize::new(0)),
            afters: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times the before phase ran.
    pub fn befores(&self) -> usize {
        self.befores.load(Ordering::SeqCst)
    }

    /// How many times the after phase ran.
    pub fn afters(&self) -> usize {
        self.afters.load(Ordering::SeqCst)
    }
}

impl Default for CountingHooker {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CountingHooker {
    fn clone(&self) -> Self {
        Self {
            befores: self.befores.clone(),
            afters: self.afters.clone(),
        }
    }
}

impl BeforeHooker for CountingHooker {
    fn before(&self, _call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        self.befores.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

impl AfterHooker for CountingHooker {
    fn after(
        &self,
        _call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        self.afters.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Order Hookers
// ============================================================================

/// A both-phase hooker that appends `"<label>:before"` / `"<label>:after"`
/// to a shared log.
///
/// # Example
///
/// ```rust,ignore
/// let order = Arc::new(Mutex::new(Vec::new()));
/// registry.hook_with_priority(&method, 10, OrderHooker::new("outer", order.clone()))?;
/// registry.hook_with_priority(&method, 90, OrderHooker::new("inner", order.clone()))?;
///
/// dispatcher.dispatch(&method, vec![])?;
/// assert_eq!(
///     *order.lock().unwrap(),
///     vec!["outer:before", "inner:before", "inner:after", "outer:after"],
/// );
/// ```
pub struct OrderHooker {
    label: String,
    order: Arc<Mutex<Vec<String>>>,
}

impl OrderHooker {
    /// A hooker writing under `label` into `order`.
    pub fn new(label: impl Into<String>, order: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label: label.into(),
            order,
        }
    }
}

impl BeforeHooker for OrderHooker {
    fn before(&self, _call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        self.order.lock().unwrap().push(format!("{}:before", self.label));
        Ok(None)
    }
}

impl AfterHooker for OrderHooker {
    fn after(
        &self,
        _call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        self.order.lock().unwrap().push(format!("{}:after", self.label));
        Ok(())
    }
}

/// The [`OrderHooker`] counterpart for the older single-object API.
pub struct OrderLegacyHooker {
    label: String,
    order: Arc<Mutex<Vec<String>>>,
}

impl OrderLegacyHooker {
    /// A handler writing under `label` into `order`.
    pub fn new(label: impl Into<String>, order: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label: label.into(),
            order,
        }
    }
}

impl LegacyHooker for OrderLegacyHooker {
    fn before_hooked_method(&self, _param: &mut LegacyParam) -> Result<(), BoxError> {
        self.order.lock().unwrap().push(format!("{}:before", self.label));
        Ok(())
    }

    fn after_hooked_method(&self, _param: &mut LegacyParam) -> Result<(), BoxError> {
        self.order.lock().unwrap().push(format!("{}:after", self.label));
        Ok(())
    }
}

/// A legacy handler that overrides nothing.
pub struct NoopLegacyHooker;

impl LegacyHooker for NoopLegacyHooker {}

// ============================================================================
// Skipping Hooker
// ============================================================================

/// A before-only hooker that decides the call and suppresses the original.
pub struct SkippingHooker {
    outcome: Result<Value, Throwable>,
}

impl SkippingHooker {
    /// Skips with a normal return of `value`.
    pub fn with_result(value: Value) -> Self {
        Self { outcome: Ok(value) }
    }

    /// Skips with a throw of `throwable`.
    pub fn with_throwable(throwable: Throwable) -> Self {
        Self {
            outcome: Err(throwable),
        }
    }
}

impl BeforeHooker for SkippingHooker {
    fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        match &self.outcome {
            Ok(value) => call.return_and_skip(value.clone()),
            Err(throwable) => call.throw_and_skip(throwable.clone()),
        }
        Ok(None)
    }
}

// ============================================================================
// Failing Hooker
// ============================================================================

/// A both-phase hooker that fails in the chosen phase, for isolation tests.
pub struct FailingHooker {
    message: String,
    fail_before: bool,
    fail_after: bool,
}

impl FailingHooker {
    /// Fails in the before phase, no-op after.
    pub fn in_before(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fail_before: true,
            fail_after: false,
        }
    }

    /// Fails in the after phase, no-op before.
    pub fn in_after(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fail_before: false,
            fail_after: true,
        }
    }
}

impl BeforeHooker for FailingHooker {
    fn before(&self, _call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
        if self.fail_before {
            return Err(self.message.clone().into());
        }
        Ok(None)
    }
}

impl AfterHooker for FailingHooker {
    fn after(
        &self,
        _call: &mut AfterHookCallback<'_>,
        _context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        if self.fail_after {
            return Err(self.message.clone().into());
        }
        Ok(())
    }
}
