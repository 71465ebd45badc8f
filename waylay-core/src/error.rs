//! Error types for Waylay.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`WaylayError`] - Top-level error type for all Waylay operations
//! - [`HookError`] - Errors from hook registration and lifecycle operations
//! - [`DispatchError`] - Terminal outcomes of dispatching an intercepted call
//!
//! Faults raised *by hook code* never appear here: a hook reports failure by
//! returning a [`BoxError`] (or by panicking), and the engine isolates it,
//! logs it, and carries on. Only the registry's own refusals and the final
//! outcome of a dispatched call surface as typed errors.

use thiserror::Error;

use crate::value::Throwable;

/// A boxed error type for dynamic error handling.
///
/// This is the fault channel of hook code: before- and after-hooks return
/// `Result<_, BoxError>`, and any `Err` is contained by the engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Waylay operations.
#[derive(Error, Debug)]
pub enum WaylayError {
    /// A registration or lifecycle operation failed.
    #[error("hook error: {0}")]
    Hook(#[from] HookError),

    /// A dispatched call terminated abnormally.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors from hook registration and lifecycle operations.
///
/// Registry operations run no hook code, so every variant here is a refusal
/// decided by the engine or by the interception backend.
#[derive(Error, Debug, PartialEq)]
pub enum HookError {
    /// The registration request was malformed or named an unhookable method.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The interception backend declined to instrument the method.
    #[error("backend refused to instrument {0}")]
    BackendRefused(String),
}

/// Terminal outcomes of dispatching an intercepted call.
///
/// `Ok(value)` from dispatch means the caller receives `value`; either
/// variant here means the caller sees a throw instead.
#[derive(Error, Debug, PartialEq)]
pub enum DispatchError {
    /// The call completed by throwing, either from the original method or
    /// from a hook that decided the outcome.
    #[error("hooked call threw: {0}")]
    Thrown(Throwable),

    /// The final result is not assignable to the method's declared
    /// reference return type. The embedder surfaces this to the caller as
    /// its runtime's class-cast exception.
    #[error("return value for {method} does not match its declared type: {actual} is not a {expected}")]
    TypeMismatch {
        /// The method whose return was ill-typed.
        method: String,
        /// The declared reference return type.
        expected: String,
        /// A label for the actual final value.
        actual: String,
    },
}

impl DispatchError {
    /// The throwable, when the call ended in a throw.
    pub fn thrown(&self) -> Option<&Throwable> {
        match self {
            DispatchError::Thrown(throwable) => Some(throwable),
            _ => None,
        }
    }
}

// Convenience conversions
impl From<BoxError> for WaylayError {
    fn from(err: BoxError) -> Self {
        WaylayError::Custom(err)
    }
}
