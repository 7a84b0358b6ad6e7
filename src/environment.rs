//! Lexical environments and the per-call evaluation context.

use gc_arena::{Collect, Gc, lock::RefLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::symbol::Symbol;
use crate::value::{ObjectPtr, Value};

pub const MAX_ENVIRONMENT_DEPTH: usize = 1000;

#[derive(Collect)]
#[collect(no_drop)]
pub struct Binding<'gc> {
    pub value: Value<'gc>,
    pub is_const: bool,
    /// `true` once a `let`/`const` binding has been assigned its initial
    /// value; reading it before that point is the Temporal Dead Zone error.
    pub initialized: bool,
}

#[derive(Collect)]
#[collect(no_drop)]
pub struct Environment<'gc> {
    #[collect(require_static)]
    pub bindings: HashMap<Symbol, Binding<'gc>>,
    pub enclosing: Option<Gc<'gc, RefLock<Environment<'gc>>>>,
    pub is_function_scope: bool,
    pub is_strict: bool,
    pub with_object: Option<ObjectPtr<'gc>>,
    pub depth: usize,
}

impl<'gc> Environment<'gc> {
    pub fn root() -> Self {
        Environment {
            bindings: HashMap::new(),
            enclosing: None,
            is_function_scope: true,
            is_strict: false,
            with_object: None,
            depth: 0,
        }
    }

    pub fn child(enclosing: Gc<'gc, RefLock<Environment<'gc>>>, is_function_scope: bool, depth: usize) -> Self {
        Environment {
            bindings: HashMap::new(),
            enclosing: Some(enclosing),
            is_function_scope,
            is_strict: false,
            with_object: None,
            depth,
        }
    }

    pub fn declare(&mut self, name: Symbol, value: Value<'gc>, is_const: bool, initialized: bool) {
        self.bindings.insert(name, Binding { value, is_const, initialized });
    }
}

/// The outcome of evaluating a node that affects control flow: a plain
/// expression value carries no signal, while `return`/`break`/`continue`/
/// `throw`/`yield` need to unwind through enclosing statement evaluation
/// without Rust-level exceptions.
#[derive(Collect)]
#[collect(no_drop)]
pub enum Signal<'gc> {
    None,
    Return(Value<'gc>),
    Break(Option<Symbol>),
    Continue(Option<Symbol>),
    /// Surfaced only inside the CPS-lowered generator driver; ordinary
    /// evaluation never produces this signal since `yield` is rewritten away
    /// by the time the evaluator sees generator bodies.
    Yield(Value<'gc>, usize),
}

#[derive(Collect)]
#[collect(no_drop)]
pub struct EvaluationContext<'gc> {
    pub signal: Signal<'gc>,
    #[collect(require_static)]
    pub label_stack: Vec<Symbol>,
    #[collect(require_static)]
    pub cancellation: Arc<AtomicBool>,
    /// Set only while re-executing a generator body from the top (the
    /// stepwise re-execution driver in `generator.rs`); `None` for ordinary
    /// function/program evaluation.
    pub generator: Option<crate::generator::GeneratorStepPtr<'gc>>,
    /// Counts `yield`/`yield*` expressions encountered so far in the current
    /// re-execution pass, in source evaluation order, so the driver can tell
    /// an already-resumed yield from the one it should pause at.
    pub yield_counter: usize,
}

impl<'gc> EvaluationContext<'gc> {
    pub fn new(cancellation: Arc<AtomicBool>) -> Self {
        EvaluationContext {
            signal: Signal::None,
            label_stack: Vec::new(),
            cancellation,
            generator: None,
            yield_counter: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.load(std::sync::atomic::Ordering::Relaxed)
    }
}
