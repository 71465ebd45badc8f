//! Adapter running older single-object handlers inside the unified chain.
//!
//! A legacy entry takes one step in the same loop as modern hooks. Around
//! each handler invocation the shim mirrors the call frame into a
//! [`LegacyParam`], runs the handler under the same fault containment as a
//! modern hook, and copies the param back. Receiver, arguments, and extras
//! copy back whether or not the handler faulted, matching the containment
//! rule for modern hooks: state mutations stick, only the outcome mapping
//! is withheld from a faulting handler.

use std::sync::Arc;

use waylay_core::{BoxError, HookCallback, LegacyHooker, LegacyParam, Outcome, Value};

use crate::dispatch::catch_fault;

/// One before step for a legacy entry. An early return maps to the skip
/// signal: outcome decided, original suppressed.
pub(crate) fn run_legacy_before(
    handler: &Arc<dyn LegacyHooker>,
    call: &mut HookCallback,
) -> Result<(), BoxError> {
    let mut param = param_from_call(call);
    let ran = catch_fault(|| handler.before_hooked_method(&mut param));
    write_back_shared(call, &mut param);
    ran?;
    if param.returns_early() {
        let outcome = match param.throwable() {
            Some(throwable) => Outcome::Throw(throwable.clone()),
            None => Outcome::Return(param.result().cloned().unwrap_or(Value::Null)),
        };
        call.set_outcome(outcome);
        call.set_skipped(true);
    }
    Ok(())
}

/// One after step for a legacy entry. The handler sees the current outcome
/// through the param's result/throwable pair and may replace either.
pub(crate) fn run_legacy_after(
    handler: &Arc<dyn LegacyHooker>,
    call: &mut HookCallback,
) -> Result<(), BoxError> {
    let mut param = param_from_call(call);
    let ran = catch_fault(|| handler.after_hooked_method(&mut param));
    write_back_shared(call, &mut param);
    ran?;
    match (param.throwable(), param.result()) {
        (Some(throwable), _) => call.set_outcome(Outcome::Throw(throwable.clone())),
        (None, Some(result)) => call.set_outcome(Outcome::Return(result.clone())),
        (None, None) => {}
    }
    Ok(())
}

fn param_from_call(call: &HookCallback) -> LegacyParam {
    let mut param = LegacyParam::new(
        Arc::clone(call.method()),
        call.this_object().cloned(),
        call.args().to_vec(),
    );
    let (result, throwable) = match call.outcome() {
        Outcome::Pending => (None, None),
        Outcome::Return(value) => (Some(value.clone()), None),
        Outcome::Throw(throwable) => (None, Some(throwable.clone())),
    };
    param.load_outcome(result, throwable, call.is_skipped());
    param.load_extras(call.extras_snapshot());
    param
}

// Receiver, arguments, and extras copy back in both phases; outcome state
// is phase-specific and handled by the callers.
fn write_back_shared(call: &mut HookCallback, param: &mut LegacyParam) {
    call.set_this_object(param.this_object.take());
    call.set_args(std::mem::take(&mut param.args));
    call.replace_extras(param.take_extras());
}
