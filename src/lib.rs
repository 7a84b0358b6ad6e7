//! A tree-walking JavaScript interpreter built on a cons-cell S-expression
//! AST. See `symbol::tags` for the full tag vocabulary the parser emits and
//! `eval::Evaluator` for the tree-walker itself.

pub mod cons;
pub mod cps;
pub mod descriptor;
pub mod environment;
pub mod eval;
pub mod gc;
pub mod generator;
pub mod host;
pub mod js_error;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod property_key;
pub mod realm;
pub mod symbol;
pub mod token;
pub mod value;

use gc_arena::{Gc, Mutation, lock::RefLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use environment::{EvaluationContext, Environment};
use gc::{JsArena, JsRoot};
use js_error::{EvalError, JSError};
use value::{CallableKind, HostCallableData, ObjectData, Value};

pub use js_error::JSError as Error;

/// An owned, lifetime-free mirror of `value::Value`, for crossing the arena
/// boundary. `Object`/`Function`/`HostCallable` can't be represented outside
/// a `Mutation` scope, so they collapse to opaque markers — this is a
/// one-way window for primitives and arrays of primitives, not a full
/// reflection API.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    BigInt(String),
    String(String),
    Symbol(Option<String>),
    Array(Vec<JsValue>),
    RegExp { source: String, flags: String },
    Object,
    Function,
}

fn to_js_value(v: &Value<'_>) -> JsValue {
    match v {
        Value::Undefined => JsValue::Undefined,
        Value::Null => JsValue::Null,
        Value::Boolean(b) => JsValue::Boolean(*b),
        Value::Number(n) => JsValue::Number(*n),
        Value::BigInt(b) => JsValue::BigInt(b.to_string()),
        Value::String(s) => JsValue::String(s.to_string()),
        Value::Symbol(s) => JsValue::Symbol(s.description.clone()),
        Value::RegExp(r) => JsValue::RegExp { source: r.source.clone(), flags: r.flags.clone() },
        Value::Array(a) => {
            let data = a.borrow();
            JsValue::Array(data.elements.iter().map(|e| to_js_value(&e.borrow())).collect())
        }
        Value::Object(_) => JsValue::Object,
        Value::Function(_) | Value::HostCallable(_) => JsValue::Function,
    }
}

fn from_js_value<'gc>(mc: &Mutation<'gc>, v: &JsValue) -> Value<'gc> {
    match v {
        JsValue::Undefined => Value::Undefined,
        JsValue::Null => Value::Null,
        JsValue::Boolean(b) => Value::Boolean(*b),
        JsValue::Number(n) => Value::Number(*n),
        JsValue::BigInt(s) => s.parse().map(|b| Value::BigInt(std::rc::Rc::new(b))).unwrap_or(Value::Undefined),
        JsValue::String(s) => Value::String(std::rc::Rc::from(s.as_str())),
        JsValue::Symbol(desc) => Value::Symbol(gc::new_symbol(mc, desc.as_deref())),
        JsValue::Array(items) => {
            let elements = items.iter().map(|i| Gc::new(mc, RefLock::new(from_js_value(mc, i)))).collect();
            Value::Array(Gc::new(mc, RefLock::new(ObjectData { elements, ..ObjectData::new_array() })))
        }
        // An invalid pattern coming from the host has nowhere to report the
        // parse failure (this conversion is infallible by design), so it
        // becomes `undefined` rather than panicking.
        JsValue::RegExp { source, flags } => regress::Regex::with_flags(source, regress::Flags::from(flags.as_str()))
            .map(|compiled| {
                Value::RegExp(std::rc::Rc::new(value::RegExpData {
                    source: source.clone(),
                    flags: flags.clone(),
                    compiled,
                }))
            })
            .unwrap_or(Value::Undefined),
        JsValue::Object | JsValue::Function => Value::Undefined,
    }
}

/// One running interpreter instance: a single `gc_arena` arena rooted at a
/// global environment that already has the realm's built-ins installed.
/// Mirrors the teacher's `JsArena::new(|mc| {...})` + `arena.mutate(...)`
/// two-phase construction (`core/mod.rs`).
pub struct JsRuntime {
    arena: JsArena,
}

impl JsRuntime {
    pub fn new() -> Self {
        let arena = JsArena::new(|mc| {
            let global_env = Gc::new(mc, RefLock::new(Environment::root()));
            realm::install(mc, global_env);
            JsRoot { global_env, well_known_symbols: HashMap::new() }
        });
        JsRuntime { arena }
    }

    /// Parses and evaluates `source` as a top-level program in this
    /// runtime's global scope, returning its completion value (or the last
    /// statement's value, matching a REPL's expectations) or the error that
    /// stopped it.
    pub fn evaluate(&mut self, source: &str) -> Result<JsValue, JSError> {
        let program = parser::parse(source)?;
        self.arena.mutate(|mc, root| {
            let evaluator = eval::Evaluator::new(root.global_env);
            let mut ctx = EvaluationContext::new(Arc::new(AtomicBool::new(false)));
            match evaluator.run_program(mc, &program, &mut ctx) {
                Ok(v) => Ok(to_js_value(&v)),
                Err(EvalError::Js(e)) => Err(e),
                Err(err @ EvalError::Throw(_)) => Err(JSError::Uncaught { message: realm::describe_uncaught(&err) }),
            }
        })
    }

    /// Declares a plain-data global binding, visible to subsequent
    /// `evaluate` calls.
    pub fn set_global(&mut self, name: &str, value: JsValue) {
        self.arena.mutate(|mc, root| {
            let v = from_js_value(mc, &value);
            root.global_env.borrow_mut(mc).declare(symbol::Symbol::intern(name), v, false, true);
        });
    }

    /// Declares a global function backed by a host Rust closure. The
    /// closure sees its arguments as owned `JsValue`s and returns one back;
    /// it can't observe or mutate the arena directly, matching the
    /// `Callable` host-interface boundary in `host.rs`.
    pub fn set_global_function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[JsValue]) -> JsValue + 'static,
    {
        self.arena.mutate(|mc, root| {
            let func = std::rc::Rc::new(move |mc: &Mutation<'_>, _this, args: &[Value<'_>]| {
                let owned: Vec<JsValue> = args.iter().map(to_js_value).collect();
                Ok(from_js_value(mc, &f(&owned)))
            });
            let host = Gc::new(mc, HostCallableData { name: name.to_string(), func });
            let obj = Gc::new(mc, RefLock::new(ObjectData { callable: Some(CallableKind::Native(host)), ..ObjectData::new() }));
            root.global_env.borrow_mut(mc).declare(symbol::Symbol::intern(name), Value::Function(obj), false, true);
        });
    }
}

impl Default for JsRuntime {
    fn default() -> Self {
        Self::new()
    }
}
