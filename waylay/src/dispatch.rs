//! Chain execution for intercepted calls.
//!
//! The dispatcher is the single entry point the backend routes every
//! intercepted invocation to. One call runs entirely on the intercepting
//! thread, in three movements over a registry snapshot:
//!
//! 1. before-hooks in chain order, until one skips;
//! 2. the original method, unless skipped;
//! 3. after-hooks in exact reverse of the before-hooks that ran.
//!
//! Hook faults - error returns and panics alike - are contained per hook:
//! logged, their outcome changes undone, and the call carries on. Only the
//! dispatcher's own invariants abort a call.

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tracing::{debug, warn};
use waylay_core::{
    BoxError, DispatchError, HookCallback, HookContext, HookError, MethodDesc, Outcome, Throwable,
    TypeDesc, Value,
};

use crate::{
    bridge::HookBridge,
    compat,
    registry::{HookEntry, HookKind, HookRegistry},
};

/// Runs the before/original/after protocol for intercepted calls.
///
/// Constructed with its registry and backend; the embedder decides how many
/// dispatchers exist and what they are wired to. The dispatcher keeps no
/// per-call state, so one instance may serve any number of threads.
pub struct Dispatcher {
    registry: HookRegistry,
    bridge: Arc<dyn HookBridge>,
}

impl Dispatcher {
    /// A dispatcher over the given registry and backend.
    pub fn new(registry: HookRegistry, bridge: Arc<dyn HookBridge>) -> Self {
        Self { registry, bridge }
    }

    /// Runs one intercepted call to completion.
    ///
    /// `raw_args` is the backend's calling convention: the receiver at
    /// element 0 for instance methods, arguments only for static methods
    /// and constructors. `Ok` is the value the caller receives, `Err` what
    /// it sees thrown.
    ///
    /// The chain is captured before anything runs; registry mutations made
    /// while the call is in flight affect only later calls.
    ///
    /// # Panics
    ///
    /// Panics if `raw_args` violates the calling convention (a missing
    /// receiver), or if the engine's own chain bookkeeping is broken. Hook
    /// faults never panic the dispatcher.
    pub fn dispatch(
        &self,
        method: &Arc<MethodDesc>,
        raw_args: Vec<Value>,
    ) -> Result<Value, DispatchError> {
        let snapshot = self.registry.snapshot(method.id());
        let (this_object, args) = split_receiver(method, raw_args);

        // Unhooked or raced-to-empty: straight through to the original.
        if snapshot.is_empty() {
            return match self.bridge.invoke_original(method, this_object.as_ref(), &args) {
                Ok(value) => Ok(value),
                Err(thrown) => Err(DispatchError::Thrown(thrown)),
            };
        }

        let entries = snapshot.entries();
        debug!(method = %method, hooks = entries.len(), "dispatching hooked call");

        let mut call = HookCallback::new(Arc::clone(method), this_object, args);
        let mut contexts: Vec<Option<HookContext>> = Vec::with_capacity(entries.len());
        contexts.resize_with(entries.len(), || None);

        // Before phase. `ran` counts entries whose before step ran, the
        // skipping entry included; exactly those get an after step.
        let mut ran = 0;
        for (idx, entry) in entries.iter().enumerate() {
            ran += 1;
            if let Err(fault) = self.run_before(entry, &mut call, &mut contexts[idx]) {
                warn!(
                    method = %method,
                    entry = entry.id(),
                    error = %fault,
                    "before hook failed; continuing without it"
                );
                call.reset_to_pending();
                continue;
            }
            if call.is_skipped() {
                break;
            }
        }

        if !call.is_skipped() {
            match self
                .bridge
                .invoke_original(method, call.this_object(), call.args())
            {
                Ok(value) => call.set_outcome(Outcome::Return(value)),
                Err(thrown) => call.set_outcome(Outcome::Throw(thrown)),
            }
        }

        // After phase, reverse order. A faulting after hook has its outcome
        // changes rolled back; argument mutations are not tracked.
        for idx in (0..ran).rev() {
            let entry = &entries[idx];
            let prior = call.outcome().clone();
            if let Err(fault) = self.run_after(entry, &mut call, contexts[idx].take()) {
                warn!(
                    method = %method,
                    entry = entry.id(),
                    error = %fault,
                    "after hook failed; outcome restored"
                );
                call.set_outcome(prior);
            }
        }

        self.resolve(method, call)
    }

    /// Invokes the original, uninstrumented body directly, bypassing the
    /// hook chain. This is what a hook uses to call the method it is
    /// hooking without re-entering itself.
    pub fn invoke_original(
        &self,
        method: &MethodDesc,
        this_object: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, Throwable> {
        self.bridge.invoke_original(method, this_object, args)
    }

    /// Forces `method` out of optimized execution.
    pub fn deoptimize(&self, method: &MethodDesc) -> Result<(), HookError> {
        if method.is_abstract() {
            return Err(HookError::InvalidArgument(format!(
                "cannot deoptimize abstract method {method}"
            )));
        }
        if self.bridge.deoptimize(method) {
            debug!(method = %method, "deoptimized");
            Ok(())
        } else {
            Err(HookError::BackendRefused(method.to_string()))
        }
    }

    fn run_before(
        &self,
        entry: &HookEntry,
        call: &mut HookCallback,
        context: &mut Option<HookContext>,
    ) -> Result<(), BoxError> {
        match entry.kind() {
            HookKind::Modern {
                before: Some(hooker),
                ..
            } => {
                *context = catch_fault(|| hooker.before(&mut call.before_view()))?;
                Ok(())
            }
            HookKind::Modern { before: None, .. } => Ok(()),
            HookKind::Legacy { handler } => compat::run_legacy_before(handler, call),
        }
    }

    fn run_after(
        &self,
        entry: &HookEntry,
        call: &mut HookCallback,
        context: Option<HookContext>,
    ) -> Result<(), BoxError> {
        match entry.kind() {
            HookKind::Modern {
                after: Some(hooker),
                ..
            } => catch_fault(|| hooker.after(&mut call.after_view(), context)),
            HookKind::Modern { after: None, .. } => Ok(()),
            HookKind::Legacy { handler } => compat::run_legacy_after(handler, call),
        }
    }

    fn resolve(&self, method: &MethodDesc, call: HookCallback) -> Result<Value, DispatchError> {
        match call.into_outcome() {
            Outcome::Throw(throwable) => Err(DispatchError::Thrown(throwable)),
            Outcome::Return(value) => self.check_return_type(method, value),
            Outcome::Pending => unreachable!("dispatch finished without an outcome"),
        }
    }

    // The assignability check runs once, on the final value only. An
    // ill-typed intermediate result that a later after hook overwrites is
    // never seen here.
    fn check_return_type(
        &self,
        method: &MethodDesc,
        value: Value,
    ) -> Result<Value, DispatchError> {
        let Some(TypeDesc::Reference(expected)) = method.return_type() else {
            return Ok(value);
        };
        if value.is_null() || self.bridge.is_instance(&value, expected) {
            return Ok(value);
        }
        let actual = value_type_label(&value);
        warn!(
            method = %method,
            expected = %expected,
            actual = %actual,
            "hook chain produced an ill-typed result"
        );
        Err(DispatchError::TypeMismatch {
            method: method.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Runs hook code, converting an unwinding panic into an ordinary hook
/// fault so one misbehaving hook cannot take the call down.
pub(crate) fn catch_fault<T>(hook: impl FnOnce() -> Result<T, BoxError>) -> Result<T, BoxError> {
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(&*payload).into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("hook panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("hook panicked: {message}")
    } else {
        "hook panicked".to_string()
    }
}

fn split_receiver(method: &MethodDesc, mut raw_args: Vec<Value>) -> (Option<Value>, Vec<Value>) {
    if method.takes_receiver() {
        let receiver = raw_args.remove(0);
        (Some(receiver), raw_args)
    } else {
        (None, raw_args)
    }
}

fn value_type_label(value: &Value) -> String {
    match value {
        Value::Object(obj) => obj.class().to_string(),
        other => other.kind_name().to_string(),
    }
}
