//! Minimal realm bootstrap.
//!
//! Per the scope boundary recorded in `SPEC_FULL.md` §8, this is not a
//! standard library: it installs only the globals the evaluator's own
//! invariants and spec.md's eight scenarios need to be exercisable —
//! `Object`/`Array`/`Function` roots, the native `Error` family, a `Symbol`
//! factory with a couple of well-known symbols, a pass-through `Proxy`, a
//! settled-state `Promise`, and `console.log`. Everything else (`Math`,
//! `JSON`, `Date`, typed arrays, `Map`/`Set`, Intl) is left to a host
//! embedding this crate via `set_global`/`set_global_function`.

use gc_arena::{Gc, Mutation, lock::RefLock};
use std::rc::Rc;

use crate::descriptor::PropertyDescriptor;
use crate::environment::EnvPtr;
use crate::js_error::{EvalError, JsResult};
use crate::property_key::PropertyKey;
use crate::symbol::Symbol;
use crate::value::{CallableKind, HostCallableData, ObjectData, ObjectPtr, Value, primitive_to_string};

type NativeFn<'gc> = Rc<dyn for<'a> Fn(&Mutation<'gc>, Value<'gc>, &[Value<'gc>]) -> JsResult<'gc, Value<'gc>> + 'gc>;

pub fn install<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) {
    let object_proto = install_object(mc, env);
    install_function(mc, env);
    install_array(mc, env, object_proto);
    install_errors(mc, env, object_proto);
    install_symbol(mc, env);
    install_proxy(mc, env);
    install_promise(mc, env);
    install_console(mc, env);
    install_global_functions(mc, env);

    declare(mc, env, "undefined", Value::Undefined);
    declare(mc, env, "NaN", Value::Number(f64::NAN));
    declare(mc, env, "Infinity", Value::Number(f64::INFINITY));
}

fn declare<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>, name: &str, value: Value<'gc>) {
    env.borrow_mut(mc).declare(Symbol::intern(name), value, true, true);
}

fn new_object<'gc>(mc: &Mutation<'gc>) -> ObjectPtr<'gc> {
    Gc::new(mc, RefLock::new(ObjectData::new()))
}

fn set_data<'gc>(mc: &Mutation<'gc>, obj: ObjectPtr<'gc>, key: &str, value: Value<'gc>, enumerable: bool) {
    obj.borrow_mut(mc)
        .properties
        .insert(PropertyKey::String(key.to_string()), PropertyDescriptor::data(mc, value, true, enumerable, true));
}

fn native_fn<'gc>(mc: &Mutation<'gc>, name: &str, f: NativeFn<'gc>) -> ObjectPtr<'gc> {
    let host = Gc::new(mc, HostCallableData { name: name.to_string(), func: f });
    let obj = new_object(mc);
    obj.borrow_mut(mc).callable = Some(CallableKind::Native(host));
    obj
}

fn arg_message<'gc>(args: &[Value<'gc>]) -> String {
    args.first().and_then(primitive_to_string).unwrap_or_default()
}

// ---- Object / Function / Array ----

fn install_object<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) -> ObjectPtr<'gc> {
    let proto = new_object(mc);
    let ctor = native_fn(
        mc,
        "Object",
        Rc::new(|mc, this, args| match (&this, args.first()) {
            (Value::Object(o), _) => Ok(Value::Object(*o)),
            (_, Some(Value::Object(o))) => Ok(Value::Object(*o)),
            _ => Ok(Value::Object(new_object(mc))),
        }),
    );
    set_data(mc, ctor, "prototype", Value::Object(proto), false);
    set_data(mc, proto, "constructor", Value::Function(ctor), false);

    let freeze = native_fn(
        mc,
        "freeze",
        Rc::new(|mc, _this, args| {
            if let Some(Value::Object(o) | Value::Array(o) | Value::Function(o)) = args.first() {
                let mut data = o.borrow_mut(mc);
                data.extensible = false;
                data.sealed = true;
                data.frozen = true;
                for desc in data.properties.values_mut() {
                    if let PropertyDescriptor::Data(d) = desc {
                        d.configurable = false;
                        d.writable = false;
                    }
                }
            }
            Ok(args.first().cloned().unwrap_or(Value::Undefined))
        }),
    );
    let seal = native_fn(
        mc,
        "seal",
        Rc::new(|mc, _this, args| {
            if let Some(Value::Object(o) | Value::Array(o) | Value::Function(o)) = args.first() {
                let mut data = o.borrow_mut(mc);
                data.extensible = false;
                data.sealed = true;
                for desc in data.properties.values_mut() {
                    if let PropertyDescriptor::Data(d) = desc {
                        d.configurable = false;
                    }
                    if let PropertyDescriptor::Accessor(a) = desc {
                        a.configurable = false;
                    }
                }
            }
            Ok(args.first().cloned().unwrap_or(Value::Undefined))
        }),
    );
    let is_frozen = native_fn(
        mc,
        "isFrozen",
        Rc::new(|_mc, _this, args| {
            Ok(Value::Boolean(match args.first() {
                Some(Value::Object(o) | Value::Array(o) | Value::Function(o)) => o.borrow().frozen,
                _ => true,
            }))
        }),
    );
    let is_sealed = native_fn(
        mc,
        "isSealed",
        Rc::new(|_mc, _this, args| {
            Ok(Value::Boolean(match args.first() {
                Some(Value::Object(o) | Value::Array(o) | Value::Function(o)) => o.borrow().sealed,
                _ => true,
            }))
        }),
    );
    set_data(mc, ctor, "freeze", Value::Function(freeze), false);
    set_data(mc, ctor, "seal", Value::Function(seal), false);
    set_data(mc, ctor, "isFrozen", Value::Function(is_frozen), false);
    set_data(mc, ctor, "isSealed", Value::Function(is_sealed), false);
    declare(mc, env, "Object", Value::Function(ctor));
    proto
}

fn install_function<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) {
    let proto = new_object(mc);
    let ctor = native_fn(
        mc,
        "Function",
        Rc::new(|_mc, _this, _args| crate::raise_type_error!("dynamic Function construction is not supported")),
    );
    set_data(mc, ctor, "prototype", Value::Object(proto), false);
    declare(mc, env, "Function", Value::Function(ctor));
}

fn install_array<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>, object_proto: ObjectPtr<'gc>) {
    let proto = new_object(mc);
    proto.borrow_mut(mc).prototype = Some(object_proto);
    let ctor = native_fn(
        mc,
        "Array",
        Rc::new(|mc, _this, args| {
            let obj = Gc::new(mc, RefLock::new(ObjectData::new_array()));
            match args {
                [Value::Number(n)] => {
                    obj.borrow_mut(mc).elements = (0..*n as usize).map(|_| Gc::new(mc, RefLock::new(Value::Undefined))).collect();
                }
                _ => {
                    obj.borrow_mut(mc).elements = args.iter().map(|v| Gc::new(mc, RefLock::new(v.clone()))).collect();
                }
            }
            Ok(Value::Array(obj))
        }),
    );
    set_data(mc, ctor, "prototype", Value::Object(proto), false);
    declare(mc, env, "Array", Value::Function(ctor));
}

// ---- Error family ----
// Grounded on the teacher's `core/js_error.rs` `initialize_error_constructor`/
// `initialize_native_error` pair: a base `Error` constructor/prototype, then
// one native subclass per well-known error name sharing that prototype.

fn install_errors<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>, object_proto: ObjectPtr<'gc>) {
    let error_proto = new_object(mc);
    error_proto.borrow_mut(mc).prototype = Some(object_proto);
    set_data(mc, error_proto, "name", Value::String(Rc::from("Error")), false);
    set_data(mc, error_proto, "message", Value::String(Rc::from("")), false);

    let error_ctor = make_error_ctor(mc, "Error", error_proto);
    set_data(mc, error_proto, "constructor", Value::Function(error_ctor), false);
    declare(mc, env, "Error", Value::Function(error_ctor));

    for name in ["TypeError", "RangeError", "ReferenceError", "SyntaxError", "EvalError", "URIError"] {
        let proto = new_object(mc);
        proto.borrow_mut(mc).prototype = Some(error_proto);
        set_data(mc, proto, "name", Value::String(Rc::from(name)), false);
        set_data(mc, proto, "message", Value::String(Rc::from("")), false);
        let ctor = make_error_ctor(mc, name, proto);
        set_data(mc, proto, "constructor", Value::Function(ctor), false);
        declare(mc, env, name, Value::Function(ctor));
    }
}

fn make_error_ctor<'gc>(mc: &Mutation<'gc>, name: &str, proto: ObjectPtr<'gc>) -> ObjectPtr<'gc> {
    let ctor = native_fn(
        mc,
        name,
        Rc::new(move |mc, this, args| {
            let target = match this {
                Value::Object(o) => o,
                _ => {
                    let o = new_object(mc);
                    o.borrow_mut(mc).prototype = Some(proto);
                    o
                }
            };
            set_data(mc, target, "message", Value::String(Rc::from(arg_message(args).as_str())), false);
            Ok(Value::Object(target))
        }),
    );
    set_data(mc, ctor, "prototype", Value::Object(proto), false);
    ctor
}

/// Turns a host-level `JSError`/in-realm throw into the `{name, message}`
/// shape `String(error)`/uncaught reporting expects, without needing a live
/// `Evaluator` (used by the `evaluate()` facade after the arena is done).
pub fn describe_uncaught(err: &EvalError<'_>) -> String {
    match err {
        EvalError::Js(e) => e.to_string(),
        EvalError::Throw(v) => primitive_to_string(v).unwrap_or_else(|| format!("uncaught exception of type {}", crate::value::type_of(v))),
    }
}

// ---- Symbol ----

fn install_symbol<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) {
    let ctor = native_fn(
        mc,
        "Symbol",
        Rc::new(|mc, _this, args| {
            let desc = args.first().and_then(primitive_to_string);
            Ok(Value::Symbol(crate::gc::new_symbol(mc, desc.as_deref())))
        }),
    );
    set_data(mc, ctor, "iterator", Value::Symbol(crate::gc::new_symbol(mc, Some("Symbol.iterator"))), false);
    set_data(mc, ctor, "toPrimitive", Value::Symbol(crate::gc::new_symbol(mc, Some("Symbol.toPrimitive"))), false);
    declare(mc, env, "Symbol", Value::Function(ctor));
}

// ---- Proxy ----
// A thin pass-through: `new Proxy(target, handler)` returns `target` itself
// unmodified, which is enough for `instanceof`/property reads against a
// proxied value to see straight through it. Trap dispatch is out of scope.

fn install_proxy<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) {
    let ctor = native_fn(
        mc,
        "Proxy",
        Rc::new(|_mc, _this, args| match args.first() {
            Some(target @ (Value::Object(_) | Value::Array(_) | Value::Function(_))) => Ok(target.clone()),
            _ => crate::raise_type_error!("Cannot create proxy with a non-object as target"),
        }),
    );
    declare(mc, env, "Proxy", Value::Function(ctor));
}

// ---- Promise ----
// Grounded on `js_promise.rs`'s state machine, trimmed to exactly the
// executor/then surface the CPS lowering in `cps.rs` already produces for
// async functions — `new Promise(executor)` runs `executor` synchronously
// (no microtask queue to defer into) and settles into the very same
// `PromiseState`/`PromiseValue` shape `cps::make_settled_promise` builds, so
// `await` treats both origins identically.

fn raw_host_fn<'gc>(mc: &Mutation<'gc>, name: &str, f: NativeFn<'gc>) -> Gc<'gc, HostCallableData<'gc>> {
    Gc::new(mc, HostCallableData { name: name.to_string(), func: f })
}

fn install_promise<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) {
    let ctor = native_fn(
        mc,
        "Promise",
        Rc::new(move |mc, _this, args| {
            let Some(executor) = args.first().cloned() else {
                crate::raise_type_error!("Promise resolver is not a function");
            };
            let settled: Rc<std::cell::RefCell<Option<(bool, Value<'gc>)>>> = Rc::new(std::cell::RefCell::new(None));

            let settled_resolve = settled.clone();
            let resolve = raw_host_fn(
                mc,
                "resolve",
                Rc::new(move |_mc, _this, args| {
                    let mut slot = settled_resolve.borrow_mut();
                    if slot.is_none() {
                        *slot = Some((true, args.first().cloned().unwrap_or(Value::Undefined)));
                    }
                    Ok(Value::Undefined)
                }),
            );
            let settled_reject = settled.clone();
            let reject = raw_host_fn(
                mc,
                "reject",
                Rc::new(move |_mc, _this, args| {
                    let mut slot = settled_reject.borrow_mut();
                    if slot.is_none() {
                        *slot = Some((false, args.first().cloned().unwrap_or(Value::Undefined)));
                    }
                    Ok(Value::Undefined)
                }),
            );

            let evaluator = crate::eval::Evaluator::new(env);
            let mut ctx = crate::environment::EvaluationContext::new(std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)));
            let outcome = evaluator.call_value(mc, &executor, Value::Undefined, &[Value::HostCallable(resolve), Value::HostCallable(reject)], &mut ctx);
            let (ok, value) = match settled.borrow().clone() {
                Some(s) => s,
                None => match outcome {
                    Ok(_) => (true, Value::Undefined),
                    Err(EvalError::Throw(v)) => (false, v),
                    Err(e) => return Err(e),
                },
            };
            Ok(crate::cps::make_settled_promise(mc, ok, value))
        }),
    );
    let resolve_static = native_fn(
        mc,
        "resolve",
        Rc::new(|mc, _this, args| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            if matches!(&value, Value::Object(o) if o.borrow().get_own(&PropertyKey::String("then".to_string())).is_some()) {
                return Ok(value);
            }
            Ok(crate::cps::make_settled_promise(mc, true, value))
        }),
    );
    let reject_static = native_fn(
        mc,
        "reject",
        Rc::new(|mc, _this, args| Ok(crate::cps::make_settled_promise(mc, false, args.first().cloned().unwrap_or(Value::Undefined)))),
    );
    set_data(mc, ctor, "resolve", Value::Function(resolve_static), false);
    set_data(mc, ctor, "reject", Value::Function(reject_static), false);
    declare(mc, env, "Promise", Value::Function(ctor));
}

// ---- console ----

fn install_console<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) {
    let console = new_object(mc);
    for method in ["log", "error", "warn", "info", "debug"] {
        let f = native_fn(
            mc,
            method,
            Rc::new(|_mc, _this, args| {
                let line = args.iter().map(|v| primitive_to_string(v).unwrap_or_else(|| format!("[{}]", crate::value::type_of(v)))).collect::<Vec<_>>().join(" ");
                log::info!(target: "consjs::console", "{line}");
                Ok(Value::Undefined)
            }),
        );
        set_data(mc, console, method, Value::Function(f), true);
    }
    declare(mc, env, "console", Value::Object(console));
}

// ---- free global functions ----

fn install_global_functions<'gc>(mc: &Mutation<'gc>, env: EnvPtr<'gc>) {
    let parse_int = native_fn(
        mc,
        "parseInt",
        Rc::new(|_mc, _this, args| {
            let s = arg_message(args);
            let trimmed = s.trim();
            let radix = match args.get(1) {
                Some(Value::Number(n)) if *n as u32 != 0 => *n as u32,
                _ => 10,
            };
            Ok(match i64::from_str_radix(trimmed.trim_start_matches(['+', '-']), radix) {
                Ok(n) => Value::Number(if trimmed.starts_with('-') { -(n as f64) } else { n as f64 }),
                Err(_) => Value::Number(f64::NAN),
            })
        }),
    );
    declare(mc, env, "parseInt", Value::Function(parse_int));

    let parse_float = native_fn(
        mc,
        "parseFloat",
        Rc::new(|_mc, _this, args| Ok(Value::Number(arg_message(args).trim().parse::<f64>().unwrap_or(f64::NAN)))),
    );
    declare(mc, env, "parseFloat", Value::Function(parse_float));

    let is_nan = native_fn(mc, "isNaN", Rc::new(|_mc, _this, args| Ok(Value::Boolean(number_arg(args).is_nan()))));
    declare(mc, env, "isNaN", Value::Function(is_nan));

    let is_finite = native_fn(mc, "isFinite", Rc::new(|_mc, _this, args| Ok(Value::Boolean(number_arg(args).is_finite()))));
    declare(mc, env, "isFinite", Value::Function(is_finite));
}

fn number_arg(args: &[Value<'_>]) -> f64 {
    match args.first() {
        Some(Value::Number(n)) => *n,
        Some(v) => primitive_to_string(v).and_then(|s| s.trim().parse().ok()).unwrap_or(f64::NAN),
        None => f64::NAN,
    }
}
