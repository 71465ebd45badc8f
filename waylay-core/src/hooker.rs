//! Hook-author traits.
//!
//! A hook is one or two trait objects attached to a method: a
//! [`BeforeHooker`] runs ahead of the original invocation, an
//! [`AfterHooker`] runs once the call's outcome is known. A type
//! implementing both is a [`Hooker`] and can be registered as a single
//! entry whose after-phase runs in exact reverse of its before-phase
//! position.
//!
//! Hooks report failure by returning an error (or by panicking); the engine
//! contains either, logs it, and continues the call as if the faulting hook
//! had not run. A fault in one hook never disturbs other hooks or the
//! intercepted caller.

use std::any::Any;

use crate::{
    callback::{AfterHookCallback, BeforeHookCallback},
    error::BoxError,
};

/// Runs ahead of every other priority; use sparingly.
pub const PRIORITY_EARLIEST: i32 = -10000;

/// The default hook priority. Lower values run earlier in the before phase.
pub const PRIORITY_DEFAULT: i32 = 50;

/// Runs after every other priority; use sparingly.
pub const PRIORITY_LATEST: i32 = 10000;

/// An opaque per-registration value produced by a before-hook and handed
/// back, same call, to the after-hook of the same registration. Other hooks
/// never see it.
pub type HookContext = Box<dyn Any + Send>;

/// A hook that runs before the original method.
///
/// The hook may inspect and replace arguments, decide the call outright via
/// the skip operations on the view, and return a [`HookContext`] for its
/// paired after-hook.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot run ahead of hooked calls",
    label = "missing `BeforeHooker` implementation",
    note = "implement `before` to observe and steer a call before the original method runs"
)]
pub trait BeforeHooker: Send + Sync + 'static {
    /// Called ahead of the original invocation.
    ///
    /// Returning `Ok(Some(context))` stashes a value for this
    /// registration's after-hook. Returning `Err` marks the hook faulty for
    /// this call: the engine logs it, undoes any outcome the hook decided,
    /// and moves on.
    fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError>;
}

/// A hook that runs once the call's outcome is known.
///
/// After-hooks run in exact reverse order of the before-hooks that ran,
/// each receiving the context its own before-hook produced.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot observe completed hooked calls",
    label = "missing `AfterHooker` implementation",
    note = "implement `after` to inspect or replace the outcome of a call"
)]
pub trait AfterHooker: Send + Sync + 'static {
    /// Called with the call's current outcome and this registration's
    /// context, if its before-hook produced one.
    ///
    /// Returning `Err` marks the hook faulty for this call: the engine logs
    /// it and rolls the outcome back to what it was before this hook ran.
    fn after(
        &self,
        call: &mut AfterHookCallback<'_>,
        context: Option<HookContext>,
    ) -> Result<(), BoxError>;
}

/// A hook participating in both phases.
///
/// Blanket-implemented for every type that is both a [`BeforeHooker`] and
/// an [`AfterHooker`].
pub trait Hooker: BeforeHooker + AfterHooker {}

impl<T: BeforeHooker + AfterHooker> Hooker for T {}
