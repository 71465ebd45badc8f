//! The boundary to the interception backend.
//!
//! Everything Waylay does not do itself - planting trampolines, invoking
//! real method bodies, answering runtime type questions - it reaches
//! through [`HookBridge`]. The engine is written entirely against this
//! trait; production embeds it over the runtime's native layer, tests embed
//! [`TestBridge`](crate::testing::TestBridge).

use waylay_core::{MethodDesc, Throwable, Value};

/// Operations the interception backend provides to the engine.
///
/// # Contract
///
/// - [`hook_method`](Self::hook_method) and
///   [`unhook_method`](Self::unhook_method) are invoked only on the edges
///   of a method's registration count: install when the first hook
///   arrives, teardown when the last one leaves. Both are called with the
///   registry's internal lock held, so an implementation must not call
///   back into the registry from them.
/// - Once installed, the backend routes every invocation of the method to
///   [`Dispatcher::dispatch`](crate::Dispatcher::dispatch) exactly once,
///   passing the raw argument vector in calling convention order: the
///   receiver at element 0 for instance methods, no receiver for static
///   methods and constructors.
/// - [`invoke_original`](Self::invoke_original) runs the uninstrumented
///   body. A throw from the body is returned as `Err`, already unwrapped
///   from any reflective wrapper the runtime put around it.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an interception backend",
    label = "missing `HookBridge` implementation",
    note = "the engine needs a backend to plant trampolines and invoke original method bodies"
)]
pub trait HookBridge: Send + Sync + 'static {
    /// Instruments `method` so its invocations reach the dispatcher.
    /// Returns `false` to refuse, which aborts the registration that
    /// triggered the install.
    fn hook_method(&self, method: &MethodDesc) -> bool;

    /// Removes the instrumentation from `method`.
    fn unhook_method(&self, method: &MethodDesc);

    /// Invokes the original, uninstrumented body of `method`.
    ///
    /// `this_object` is the receiver for instance methods and `None`
    /// otherwise; `args` excludes the receiver.
    fn invoke_original(
        &self,
        method: &MethodDesc,
        this_object: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, Throwable>;

    /// Whether `value` is an instance of the class named `class_name`.
    ///
    /// Only ever asked about non-null values; the engine accepts the null
    /// reference for any reference type on its own.
    fn is_instance(&self, value: &Value, class_name: &str) -> bool;

    /// Forces `method` out of optimized execution so interception stays
    /// reliable. Returns `false` if the backend cannot.
    fn deoptimize(&self, method: &MethodDesc) -> bool;
}
