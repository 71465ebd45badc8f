//! The per-invocation call frame shared by every hook of one dispatch.
//!
//! A [`HookCallback`] is created fresh for each intercepted call and lives
//! exactly as long as that call. It is confined to the intercepting thread
//! and is never reused. Hooks do not touch it directly: the engine hands
//! each hook a phase view ([`BeforeHookCallback`] or [`AfterHookCallback`])
//! exposing only the operations legal in that phase.
//!
//! The call's completion is the tri-state [`Outcome`]. Keeping it a sum type
//! rather than a result/throwable field pair makes "at most one of the two
//! is set" structural: deciding a return discards any pending throw, and
//! vice versa.

use std::{collections::HashMap, sync::Arc};

use crate::{
    method::MethodDesc,
    value::{Throwable, Value},
};

/// Tri-state completion of a hooked call.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Outcome {
    /// Nothing has decided the call yet; the original method is still due.
    #[default]
    Pending,
    /// The call completes by returning this value.
    Return(Value),
    /// The call completes by throwing.
    Throw(Throwable),
}

impl Outcome {
    /// Whether no result or throw has been decided.
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }
}

/// Mutable per-invocation record driven by the engine.
///
/// The accessors and mutators here are the engine's interface; hook authors
/// only ever see the frame through [`BeforeHookCallback`] and
/// [`AfterHookCallback`].
pub struct HookCallback {
    method: Arc<MethodDesc>,
    this_object: Option<Value>,
    args: Vec<Value>,
    outcome: Outcome,
    skipped: bool,
    extras: Option<HashMap<String, Value>>,
}

impl HookCallback {
    /// A fresh frame for one intercepted call.
    ///
    /// `this_object` is the receiver for instance methods and `None` for
    /// static methods and constructors; `args` excludes the receiver.
    pub fn new(method: Arc<MethodDesc>, this_object: Option<Value>, args: Vec<Value>) -> Self {
        Self {
            method,
            this_object,
            args,
            outcome: Outcome::Pending,
            skipped: false,
            extras: None,
        }
    }

    /// The hooked method.
    pub fn method(&self) -> &Arc<MethodDesc> {
        &self.method
    }

    /// The receiver, when the method has one.
    pub fn this_object(&self) -> Option<&Value> {
        self.this_object.as_ref()
    }

    /// Replaces the receiver.
    pub fn set_this_object(&mut self, this_object: Option<Value>) {
        self.this_object = this_object;
    }

    /// The current arguments, receiver excluded.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Mutable access to the arguments.
    pub fn args_mut(&mut self) -> &mut [Value] {
        &mut self.args
    }

    /// Replaces the whole argument vector.
    pub fn set_args(&mut self, args: Vec<Value>) {
        self.args = args;
    }

    /// The call's current completion state.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Overwrites the completion state.
    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    /// Whether a before-hook suppressed the original invocation.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Marks or clears the skip flag.
    pub fn set_skipped(&mut self, skipped: bool) {
        self.skipped = skipped;
    }

    /// Returns the frame to the state it had before any hook decided it:
    /// outcome pending, skip flag clear. Argument mutations are kept.
    pub fn reset_to_pending(&mut self) {
        self.outcome = Outcome::Pending;
        self.skipped = false;
    }

    /// A call-scoped extra, if one was stored under `key`.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.as_ref()?.get(key)
    }

    /// Stores a call-scoped extra visible to every hook of this call.
    pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
        self.extras
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
    }

    /// A copy of the extras map; empty when none were stored.
    pub fn extras_snapshot(&self) -> HashMap<String, Value> {
        self.extras.clone().unwrap_or_default()
    }

    /// Replaces the extras map wholesale.
    pub fn replace_extras(&mut self, extras: HashMap<String, Value>) {
        self.extras = if extras.is_empty() { None } else { Some(extras) };
    }

    /// The before-phase view of this frame.
    pub fn before_view(&mut self) -> BeforeHookCallback<'_> {
        BeforeHookCallback { call: self }
    }

    /// The after-phase view of this frame.
    pub fn after_view(&mut self) -> AfterHookCallback<'_> {
        AfterHookCallback { call: self }
    }

    /// Consumes the frame, yielding the final completion state.
    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }
}

/// What a hook may do before the original method runs.
///
/// Arguments and the receiver are readable and replaceable; the only way to
/// decide the call's outcome in this phase is to also suppress the original
/// invocation via [`return_and_skip`] or [`throw_and_skip`]. There is
/// deliberately no way to set a result without skipping.
///
/// [`return_and_skip`]: BeforeHookCallback::return_and_skip
/// [`throw_and_skip`]: BeforeHookCallback::throw_and_skip
pub struct BeforeHookCallback<'a> {
    call: &'a mut HookCallback,
}

impl BeforeHookCallback<'_> {
    /// The hooked method.
    pub fn method(&self) -> &MethodDesc {
        &self.call.method
    }

    /// The receiver, when the method has one.
    pub fn this_object(&self) -> Option<&Value> {
        self.call.this_object()
    }

    /// The arguments, receiver excluded.
    pub fn args(&self) -> &[Value] {
        self.call.args()
    }

    /// One argument by position.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.call.args.get(index)
    }

    /// Replaces one argument. The new value is what later hooks and the
    /// original method will see.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds. Inside a hook that panic is
    /// contained by the engine and counts as a hook fault.
    pub fn set_arg(&mut self, index: usize, value: Value) {
        self.call.args[index] = value;
    }

    /// Mutable access to the whole argument slice.
    pub fn args_mut(&mut self) -> &mut [Value] {
        self.call.args_mut()
    }

    /// Decides the call: the caller receives `value` and the original
    /// method, and every before-hook not yet run, are suppressed.
    pub fn return_and_skip(&mut self, value: Value) {
        self.call.set_outcome(Outcome::Return(value));
        self.call.set_skipped(true);
    }

    /// Decides the call: the caller sees `throwable` thrown and the
    /// original method, and every before-hook not yet run, are suppressed.
    pub fn throw_and_skip(&mut self, throwable: Throwable) {
        self.call.set_outcome(Outcome::Throw(throwable));
        self.call.set_skipped(true);
    }

    /// A call-scoped extra, if one was stored under `key`.
    ///
    /// Extras are visible to every hook of this one call, across both hook
    /// generations. For a value private to one registration, return a
    /// context from the before-hook instead.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.call.extra(key)
    }

    /// Stores a call-scoped extra.
    pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
        self.call.set_extra(key, value);
    }
}

/// What a hook may do after the call's outcome is known.
///
/// The outcome is readable and replaceable; the skip flag tells whether the
/// original method actually ran. Arguments remain readable for reference,
/// but mutating them at this point no longer influences the call.
pub struct AfterHookCallback<'a> {
    call: &'a mut HookCallback,
}

impl AfterHookCallback<'_> {
    /// The hooked method.
    pub fn method(&self) -> &MethodDesc {
        &self.call.method
    }

    /// The receiver, when the method has one.
    pub fn this_object(&self) -> Option<&Value> {
        self.call.this_object()
    }

    /// The arguments as the original method saw them.
    pub fn args(&self) -> &[Value] {
        self.call.args()
    }

    /// One argument by position.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.call.args.get(index)
    }

    /// The current result, when the call is completing normally.
    pub fn result(&self) -> Option<&Value> {
        match self.call.outcome() {
            Outcome::Return(value) => Some(value),
            _ => None,
        }
    }

    /// The current throwable, when the call is completing abruptly.
    pub fn throwable(&self) -> Option<&Throwable> {
        match self.call.outcome() {
            Outcome::Throw(throwable) => Some(throwable),
            _ => None,
        }
    }

    /// Whether a before-hook suppressed the original invocation.
    pub fn is_skipped(&self) -> bool {
        self.call.is_skipped()
    }

    /// Replaces the outcome with a normal return of `value`, discarding any
    /// pending throwable.
    pub fn set_result(&mut self, value: Value) {
        self.call.set_outcome(Outcome::Return(value));
    }

    /// Replaces the outcome with a throw of `throwable`, discarding any
    /// pending result.
    pub fn set_throwable(&mut self, throwable: Throwable) {
        self.call.set_outcome(Outcome::Throw(throwable));
    }

    /// A call-scoped extra, if one was stored under `key`.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.call.extra(key)
    }

    /// Stores a call-scoped extra.
    pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
        self.call.set_extra(key, value);
    }
}
