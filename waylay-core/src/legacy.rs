//! The single-object hook API kept for older modules.
//!
//! Before the two-trait surface in [`hooker`](crate::hooker), modules
//! attached one handler object with two overridable methods and mutated a
//! shared param record. The engine still honors that shape: legacy handlers
//! join the same per-method chain as modern hooks, ordered after the modern
//! group, and the engine copies state between the call frame and a
//! [`LegacyParam`] around each handler invocation.
//!
//! The param keeps the old calling convention, public fields included. Its
//! one quirk is load-bearing: [`set_result`](LegacyParam::set_result) and
//! [`set_throwable`](LegacyParam::set_throwable) also raise the
//! early-return flag, which in the before phase doubles as the skip signal.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::BoxError,
    method::MethodDesc,
    value::{Throwable, Value},
};

/// The mutable param record of the older hook API.
pub struct LegacyParam {
    /// The hooked method.
    pub method: Arc<MethodDesc>,
    /// The receiver, absent for static methods and constructors.
    pub this_object: Option<Value>,
    /// The arguments, receiver excluded. Replacing elements changes what
    /// later hooks and the original method see.
    pub args: Vec<Value>,
    result: Option<Value>,
    throwable: Option<Throwable>,
    return_early: bool,
    extras: HashMap<String, Value>,
}

impl LegacyParam {
    /// A param for one dispatch step, with a clean outcome.
    pub fn new(method: Arc<MethodDesc>, this_object: Option<Value>, args: Vec<Value>) -> Self {
        Self {
            method,
            this_object,
            args,
            result: None,
            throwable: None,
            return_early: false,
            extras: HashMap::new(),
        }
    }

    /// Overwrites outcome state without raising the early-return flag.
    /// Engines use this to mirror the call frame into the param.
    pub fn load_outcome(
        &mut self,
        result: Option<Value>,
        throwable: Option<Throwable>,
        return_early: bool,
    ) {
        self.result = result;
        self.throwable = throwable;
        self.return_early = return_early;
    }

    /// Replaces the extras map wholesale.
    pub fn load_extras(&mut self, extras: HashMap<String, Value>) {
        self.extras = extras;
    }

    /// Takes the extras map back out.
    pub fn take_extras(&mut self) -> HashMap<String, Value> {
        std::mem::take(&mut self.extras)
    }

    /// The current result, if the call is completing normally.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The current throwable, if the call is completing abruptly.
    pub fn throwable(&self) -> Option<&Throwable> {
        self.throwable.as_ref()
    }

    /// The result, or the throwable as an error.
    pub fn result_or_throw(&self) -> Result<Option<&Value>, &Throwable> {
        match &self.throwable {
            Some(throwable) => Err(throwable),
            None => Ok(self.result.as_ref()),
        }
    }

    /// Sets the result, clears any throwable, and raises the early-return
    /// flag. In a before handler this suppresses the original invocation.
    pub fn set_result(&mut self, result: Value) {
        self.result = Some(result);
        self.throwable = None;
        self.return_early = true;
    }

    /// Sets the throwable, clears any result, and raises the early-return
    /// flag. In a before handler this suppresses the original invocation.
    pub fn set_throwable(&mut self, throwable: Throwable) {
        self.throwable = Some(throwable);
        self.result = None;
        self.return_early = true;
    }

    /// Whether the early-return flag is raised. In the after phase the
    /// engine pre-loads this with the call's skip state.
    pub fn returns_early(&self) -> bool {
        self.return_early
    }

    /// A call-scoped extra, shared with the modern hooks of the same call.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// Stores a call-scoped extra. Does not touch the early-return flag.
    pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
        self.extras.insert(key.into(), value);
    }
}

/// A handler in the older single-object hook API.
///
/// Both methods default to no-ops, so a handler overrides only the phase it
/// cares about. Faults are contained exactly as for modern hooks: an `Err`
/// (or a panic) is logged and the call proceeds. Receiver, argument, and
/// extra mutations made before the fault still land on the call; only the
/// faulting handler's result or throwable verdict is discarded.
pub trait LegacyHooker: Send + Sync + 'static {
    /// Called before the original invocation.
    fn before_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        let _ = param;
        Ok(())
    }

    /// Called once the call's outcome is known.
    fn after_hooked_method(&self, param: &mut LegacyParam) -> Result<(), BoxError> {
        let _ = param;
        Ok(())
    }
}
