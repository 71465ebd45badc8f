//! # waylay-core
//!
//! Data model and hook-author traits for the Waylay method-interception
//! framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! hook modules that don't need the full `waylay` engine: everything a hook
//! author touches lives here, everything that schedules and runs hooks
//! lives in `waylay`.
//!
//! # The model
//!
//! One intercepted call flows through three kinds of pieces:
//!
//! ## Descriptors ([`MethodDesc`], [`Value`], [`Throwable`])
//!
//! What the call is made of. A [`MethodDesc`] identifies the hooked method
//! and carries the declared shape the engine needs (receiver convention,
//! reference return type for the final assignability check). [`Value`] and
//! [`Throwable`] are the dynamically typed carriers for arguments, results,
//! and thrown exceptions; both are opaque data to the engine.
//!
//! ## The call frame ([`HookCallback`])
//!
//! One mutable record per intercepted call, owned by the engine and shown
//! to hooks through phase views: [`BeforeHookCallback`] ahead of the
//! original method, [`AfterHookCallback`] once the outcome is known. The
//! views are the contract: an operation missing from the view is illegal in
//! that phase, so ill-phased mutations don't typecheck.
//!
//! ## The hooks ([`BeforeHooker`], [`AfterHooker`], [`LegacyHooker`])
//!
//! What runs. Modern hooks implement one or both phase traits; older
//! modules keep their single-object [`LegacyHooker`] shape and are adapted
//! by the engine. Hooks report failure by returning [`BoxError`] and are
//! individually contained: one faulting hook never disturbs the call or
//! the other hooks.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod callback;
mod error;
mod hooker;
mod legacy;
mod method;
mod value;

// Re-exports
pub use callback::{AfterHookCallback, BeforeHookCallback, HookCallback, Outcome};
pub use error::{BoxError, DispatchError, HookError, WaylayError};
pub use hooker::{
    AfterHooker, BeforeHooker, HookContext, Hooker, PRIORITY_DEFAULT, PRIORITY_EARLIEST,
    PRIORITY_LATEST,
};
pub use legacy::{LegacyHooker, LegacyParam};
pub use method::{MethodDesc, MethodFlags, MethodId, PrimType, TypeDesc};
pub use value::{ObjectRef, Throwable, Value};
