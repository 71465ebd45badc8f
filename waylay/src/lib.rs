//! # waylay - Method Interception Hook Dispatch
//!
//! `waylay` is the hook-scheduling core of a method-interception framework:
//! the bookkeeping and call-flow machinery that sits between an
//! instrumentation backend (which plants trampolines and redirects calls)
//! and the hook modules that want to observe or steer those calls.
//!
//! The engine owns two collaborating pieces:
//!
//! - [`HookRegistry`] keeps the per-method hook chains, sorted and
//!   snapshot-readable, and drives the backend's instrumentation lifecycle.
//! - [`Dispatcher`] runs one intercepted call: before-hooks in chain order,
//!   the original method unless a hook skipped it, then after-hooks in
//!   exact reverse of the before-hooks that ran.
//!
//! Everything the engine cannot do itself is reached through the
//! [`HookBridge`] trait; nothing here touches a real runtime.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use waylay::prelude::*;
//!
//! struct Tracer;
//!
//! impl BeforeHooker for Tracer {
//!     fn before(&self, call: &mut BeforeHookCallback<'_>) -> Result<Option<HookContext>, BoxError> {
//!         println!("{} called with {:?}", call.method(), call.args());
//!         Ok(None)
//!     }
//! }
//!
//! let bridge: Arc<dyn HookBridge> = embedder_bridge();
//! let registry = HookRegistry::new(bridge.clone());
//! let dispatcher = Dispatcher::new(registry.clone(), bridge);
//!
//! let handle = registry.hook_before(&method, Tracer)?;
//! // ... the backend now routes calls of `method` into dispatcher.dispatch ...
//! handle.unhook();
//! ```
//!
//! ## Failure containment
//!
//! Hook code is never trusted with the call: an `Err` return or a panic in
//! any hook is logged and contained, the faulting hook's outcome writes are
//! undone, and the chain carries on. The intercepted caller only ever sees
//! its own method's behavior, a hook's *deliberate* outcome, or a
//! type-mismatch throw when the final result doesn't fit the method's
//! declared reference return type.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod bridge;
mod compat;
mod dispatch;
mod registry;
pub mod testing;

pub use waylay_core::{
    AfterHookCallback, AfterHooker, BeforeHookCallback, BeforeHooker, BoxError, DispatchError,
    HookCallback, HookContext, HookError, Hooker, LegacyHooker, LegacyParam, MethodDesc,
    MethodFlags, MethodId, ObjectRef, Outcome, PRIORITY_DEFAULT, PRIORITY_EARLIEST,
    PRIORITY_LATEST, PrimType, Throwable, TypeDesc, Value, WaylayError,
};

pub use bridge::HookBridge;
pub use dispatch::Dispatcher;
pub use registry::{CallSnapshot, HookEntry, HookHandle, HookRegistry};

/// Prelude module - common imports for Waylay.
///
/// # Usage
///
/// ```rust,ignore
/// use waylay::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AfterHookCallback, AfterHooker, BeforeHookCallback, BeforeHooker, BoxError, DispatchError,
        Dispatcher, HookBridge, HookContext, HookError, HookHandle, HookRegistry, Hooker,
        LegacyHooker, LegacyParam, MethodDesc, MethodFlags, MethodId, PRIORITY_DEFAULT, Throwable,
        TypeDesc, Value,
    };
}
