//! The runtime value universe.
//!
//! Restricted to the variant list: `Undefined, Null, Boolean, Number,
//! BigInt, String, Symbol, Object, Array, Function, HostCallable, RegExp`.
//! Objects/Arrays/Functions are `gc_arena`-managed (`Gc<'gc, RefLock<...>>`,
//! following the teacher's `JSObjectDataPtr<'gc>` pattern) since closures,
//! prototypes, and environments form reference cycles that only a tracing GC
//! can reclaim; the AST they close over is plain `Rc` and untraced (see
//! `cons.rs`).

use gc_arena::{Collect, Gc, Mutation, lock::RefLock};
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::cell::RefCell;
use std::rc::Rc;

use crate::cons::Cons;
use crate::descriptor::PropertyDescriptor;
use crate::environment::Environment;
use crate::property_key::PropertyKey;

pub type ObjectPtr<'gc> = Gc<'gc, RefLock<ObjectData<'gc>>>;
pub type EnvPtr<'gc> = Gc<'gc, RefLock<Environment<'gc>>>;

#[derive(Collect)]
#[collect(no_drop)]
pub enum Value<'gc> {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    #[collect(require_static)]
    BigInt(Rc<BigInt>),
    #[collect(require_static)]
    String(Rc<str>),
    Symbol(Gc<'gc, SymbolData>),
    Object(ObjectPtr<'gc>),
    Array(ObjectPtr<'gc>),
    Function(ObjectPtr<'gc>),
    HostCallable(Gc<'gc, HostCallableData<'gc>>),
    #[collect(require_static)]
    RegExp(Rc<RegExpData>),
}

impl<'gc> Clone for Value<'gc> {
    fn clone(&self) -> Self {
        match self {
            Value::Undefined => Value::Undefined,
            Value::Null => Value::Null,
            Value::Boolean(b) => Value::Boolean(*b),
            Value::Number(n) => Value::Number(*n),
            Value::BigInt(b) => Value::BigInt(b.clone()),
            Value::String(s) => Value::String(s.clone()),
            Value::Symbol(s) => Value::Symbol(*s),
            Value::Object(o) => Value::Object(*o),
            Value::Array(a) => Value::Array(*a),
            Value::Function(f) => Value::Function(*f),
            Value::HostCallable(h) => Value::HostCallable(*h),
            Value::RegExp(r) => Value::RegExp(r.clone()),
        }
    }
}

#[derive(Collect)]
#[collect(require_static)]
pub struct SymbolData {
    pub description: Option<String>,
}

pub struct RegExpData {
    pub source: String,
    pub flags: String,
    pub compiled: regress::Regex,
}

/// Non-JS-closure callables registered from the host side via
/// `set_global_function` (the `Callable` contract from `core::host`). Holds a
/// plain `Rc<dyn Fn>` — never itself GC'd cyclically, so tracing is a no-op,
/// mirroring how the teacher keeps native function pointers outside the
/// traced object graph.
pub struct HostCallableData<'gc> {
    pub name: String,
    #[allow(clippy::type_complexity)]
    pub func: Rc<dyn for<'a> Fn(&Mutation<'gc>, Value<'gc>, &[Value<'gc>]) -> crate::js_error::JsResult<'gc, Value<'gc>> + 'gc>,
}

unsafe impl<'gc> Collect for HostCallableData<'gc> {
    fn trace(&self, _cc: &gc_arena::Collection) {}
}

/// What a `Function`-tagged object's internal `[[Call]]` slot actually
/// holds: a user closure over cons-cell params/body, or a bound native.
#[derive(Collect)]
#[collect(no_drop)]
pub enum CallableKind<'gc> {
    Closure(ClosureData<'gc>),
    Native(Gc<'gc, HostCallableData<'gc>>),
}

#[derive(Collect)]
#[collect(no_drop)]
pub struct ClosureData<'gc> {
    #[collect(require_static)]
    pub params: Rc<Cons>,
    #[collect(require_static)]
    pub body: Rc<Cons>,
    pub env: EnvPtr<'gc>,
    pub home_object: Option<ObjectPtr<'gc>>,
    pub bound_this: Option<Value<'gc>>,
    pub is_arrow: bool,
    pub is_async: bool,
    pub is_generator: bool,
    #[collect(require_static)]
    pub name: String,
}

#[derive(Collect)]
#[collect(no_drop)]
pub struct ObjectData<'gc> {
    pub properties: IndexMap<PropertyKey<'gc>, PropertyDescriptor<'gc>>,
    pub prototype: Option<ObjectPtr<'gc>>,
    pub callable: Option<CallableKind<'gc>>,
    pub extensible: bool,
    /// Set by `Object.seal`: no new own properties, existing ones keep
    /// their writability but become non-configurable.
    pub sealed: bool,
    /// Set by `Object.freeze`: implies `sealed`, and every own data
    /// property is additionally non-writable.
    pub frozen: bool,
    /// Backing storage for `Array`-tagged objects; kept separate from
    /// `properties` so index access stays O(1) instead of walking an
    /// IndexMap of numeric-string keys, same tradeoff the teacher's
    /// `JSObjectData` makes for fast-path array elements.
    pub elements: Vec<Gc<'gc, RefLock<Value<'gc>>>>,
    pub is_array: bool,
}

impl<'gc> ObjectData<'gc> {
    pub fn new() -> Self {
        ObjectData {
            properties: IndexMap::new(),
            prototype: None,
            callable: None,
            extensible: true,
            sealed: false,
            frozen: false,
            elements: Vec::new(),
            is_array: false,
        }
    }

    pub fn new_array() -> Self {
        let mut o = Self::new();
        o.is_array = true;
        o
    }

    pub fn get_own(&self, key: &PropertyKey<'gc>) -> Option<&PropertyDescriptor<'gc>> {
        self.properties.get(key)
    }
}

impl<'gc> Default for ObjectData<'gc> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_truthy(v: &Value<'_>) -> bool {
    match v {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::BigInt(b) => !b.as_ref().eq(&BigInt::from(0)),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

pub fn type_of(v: &Value<'_>) -> &'static str {
    match v {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Boolean(_) => "boolean",
        Value::Number(_) => "number",
        Value::BigInt(_) => "bigint",
        Value::String(_) => "string",
        Value::Symbol(_) => "symbol",
        Value::Object(_) => "object",
        Value::Array(_) => "object",
        Value::Function(_) | Value::HostCallable(_) => "function",
        Value::RegExp(_) => "object",
    }
}

thread_local! {
    static STRING_CONV_GUARD: RefCell<()> = const { RefCell::new(()) };
}

/// `ToString` for the subset of coercions the kernel itself performs
/// (template literals, `+` concatenation, property-key coercion). Object
/// coercion via `toString`/`valueOf` is the evaluator's job since it needs
/// to invoke user code; this free function only handles primitives.
pub fn primitive_to_string(v: &Value<'_>) -> Option<String> {
    let _guard = STRING_CONV_GUARD.with(|g| g.borrow());
    Some(match v {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => crate::number::number_to_string(*n),
        Value::BigInt(b) => b.to_string(),
        Value::String(s) => s.to_string(),
        _ => return None,
    })
}
