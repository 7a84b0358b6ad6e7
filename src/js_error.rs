//! Error taxonomy.
//!
//! `JSError` is the host-facing error (parse/lex failures, internal
//! invariant violations); `EvalError` additionally carries an in-realm
//! thrown `Value`. Split and macro naming follow the teacher's
//! `error.rs`/`core/js_error.rs` pair.

use crate::value::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum JSError {
    #[error("syntax error: {message}")]
    SyntaxError { message: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("reference error: {message}")]
    ReferenceError { message: String },

    #[error("type error: {message}")]
    TypeError { message: String },

    #[error("range error: {message}")]
    RangeError { message: String },

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("maximum environment depth exceeded")]
    EnvironmentDepthExceeded,

    /// A `throw`n value that escaped the program uncaught, rendered to
    /// text at the host boundary (the arena is gone by the time
    /// `JsRuntime::evaluate` returns, so this can't carry the live `Value`).
    #[error("uncaught exception: {message}")]
    Uncaught { message: String },
}

impl JSError {
    /// `false` for the two conditions that represent the host giving up
    /// rather than the script doing something wrong — a `try/catch` inside
    /// the script must never intercept a cancellation or a recursion guard.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, JSError::Cancelled | JSError::EnvironmentDepthExceeded)
    }
}

/// Either a host-level `JSError`, or a thrown realm `Value` (the JS-visible
/// `throw` signal), exactly mirroring the teacher's `EvalError<'gc>` split in
/// `core/js_error.rs`.
pub enum EvalError<'gc> {
    Js(JSError),
    Throw(Value<'gc>),
}

impl<'gc> From<JSError> for EvalError<'gc> {
    fn from(err: JSError) -> Self {
        EvalError::Js(err)
    }
}

pub type JsResult<'gc, T> = Result<T, EvalError<'gc>>;

#[macro_export]
macro_rules! raise_type_error {
    ($($arg:tt)*) => {
        return Err($crate::js_error::EvalError::Js($crate::js_error::JSError::TypeError { message: format!($($arg)*) }))
    };
}

#[macro_export]
macro_rules! raise_range_error {
    ($($arg:tt)*) => {
        return Err($crate::js_error::EvalError::Js($crate::js_error::JSError::RangeError { message: format!($($arg)*) }))
    };
}

#[macro_export]
macro_rules! raise_reference_error {
    ($($arg:tt)*) => {
        return Err($crate::js_error::EvalError::Js($crate::js_error::JSError::ReferenceError { message: format!($($arg)*) }))
    };
}

#[macro_export]
macro_rules! raise_syntax_error {
    ($($arg:tt)*) => {
        return Err($crate::js_error::EvalError::Js($crate::js_error::JSError::SyntaxError { message: format!($($arg)*) }))
    };
}
