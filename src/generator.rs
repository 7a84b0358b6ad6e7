//! Generator iterator objects, driven by stepwise re-execution.
//!
//! A generator's body is never paused mid-stack; instead, each call to
//! `next`/`return`/`throw` re-runs the body from its top inside a fresh
//! environment, counting `yield` expressions as they're reached in source
//! order. Yields below the driver's `threshold` replay their previously
//! recorded resume value and keep going for real; the first yield at or past
//! `threshold` stops the re-execution and reports its value, exactly the
//! "stepwise re-execution with a yield-index counter" strategy this crate
//! uses in place of the teacher's own (stdlib-coupled) generator machinery.

use gc_arena::{Collect, Gc, Mutation, lock::RefLock};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::descriptor::PropertyDescriptor;
use crate::environment::{EnvPtr, EvaluationContext, Signal};
use crate::eval::Evaluator;
use crate::js_error::{EvalError, JsResult};
use crate::property_key::PropertyKey;
use crate::symbol::Symbol;
use crate::value::{CallableKind, HostCallableData, ObjectData, ObjectPtr, Value};

#[derive(Collect)]
#[collect(no_drop)]
pub struct GeneratorStep<'gc> {
    pub threshold: usize,
    pub resume_values: Vec<Value<'gc>>,
    pub done: bool,
}

pub type GeneratorStepPtr<'gc> = Gc<'gc, RefLock<GeneratorStep<'gc>>>;

enum StepKind {
    Next,
    Return,
    Throw,
}

pub fn make_generator_object<'gc>(mc: &Mutation<'gc>, evaluator: &Evaluator<'gc>, closure_obj: ObjectPtr<'gc>, this_val: Value<'gc>, args: Vec<Value<'gc>>) -> Value<'gc> {
    let step: GeneratorStepPtr<'gc> = Gc::new(
        mc,
        RefLock::new(GeneratorStep {
            threshold: 0,
            resume_values: Vec::new(),
            done: false,
        }),
    );
    let global_env = evaluator.global_env;
    let obj = Gc::new(mc, RefLock::new(ObjectData::new()));

    install_native(mc, obj, "next", global_env, closure_obj, this_val.clone(), args.clone(), step, StepKind::Next);
    install_native(mc, obj, "return", global_env, closure_obj, this_val.clone(), args.clone(), step, StepKind::Return);
    install_native(mc, obj, "throw", global_env, closure_obj, this_val, args, step, StepKind::Throw);

    Value::Object(obj)
}

#[allow(clippy::too_many_arguments)]
fn install_native<'gc>(
    mc: &Mutation<'gc>,
    obj: ObjectPtr<'gc>,
    name: &str,
    global_env: EnvPtr<'gc>,
    closure_obj: ObjectPtr<'gc>,
    this_val: Value<'gc>,
    args: Vec<Value<'gc>>,
    step: GeneratorStepPtr<'gc>,
    kind: StepKind,
) {
    let func: Rc<dyn for<'a> Fn(&Mutation<'gc>, Value<'gc>, &[Value<'gc>]) -> JsResult<'gc, Value<'gc>> + 'gc> = Rc::new(move |mc, _this, call_args| {
        step_generator(mc, global_env, closure_obj, this_val.clone(), &args, step, call_args.first().cloned(), &kind)
    });
    let host = Gc::new(mc, HostCallableData { name: name.to_string(), func });
    obj.borrow_mut(mc)
        .properties
        .insert(PropertyKey::String(name.to_string()), PropertyDescriptor::data(mc, Value::HostCallable(host), true, false, true));
}

fn step_generator<'gc>(
    mc: &Mutation<'gc>,
    global_env: EnvPtr<'gc>,
    closure_obj: ObjectPtr<'gc>,
    this_val: Value<'gc>,
    call_args: &[Value<'gc>],
    step: GeneratorStepPtr<'gc>,
    sent_value: Option<Value<'gc>>,
    kind: &StepKind,
) -> JsResult<'gc, Value<'gc>> {
    if step.borrow().done {
        return Ok(make_result(mc, Value::Undefined, true));
    }

    if matches!(kind, StepKind::Return) {
        step.borrow_mut(mc).done = true;
        return Ok(make_result(mc, sent_value.unwrap_or(Value::Undefined), true));
    }

    let threshold = step.borrow().threshold;
    if threshold > 0 {
        let mut s = step.borrow_mut(mc);
        let v = sent_value.clone().unwrap_or(Value::Undefined);
        if s.resume_values.len() < threshold {
            s.resume_values.push(v);
        } else {
            s.resume_values[threshold - 1] = v;
        }
    }

    if matches!(kind, StepKind::Throw) {
        // Stepwise re-execution doesn't model resuming into an in-body
        // try/catch that wraps the paused yield; a thrown resume simply
        // terminates the generator, matching the documented limitation of
        // this strategy (see DESIGN.md).
        step.borrow_mut(mc).done = true;
        return Err(EvalError::Throw(sent_value.unwrap_or(Value::Undefined)));
    }

    let evaluator = Evaluator::new(global_env);
    let (params, body, closure_env, home) = {
        let data = closure_obj.borrow();
        let Some(CallableKind::Closure(c)) = &data.callable else {
            drop(data);
            step.borrow_mut(mc).done = true;
            return Ok(make_result(mc, Value::Undefined, true));
        };
        (c.params.clone(), c.body.clone(), c.env, c.home_object)
    };

    let depth = closure_env.borrow().depth + 1;
    let call_env = Gc::new(mc, RefLock::new(crate::environment::Environment::child(closure_env, true, depth)));
    {
        let mut e = call_env.borrow_mut(mc);
        e.declare(Symbol::intern("this"), this_val, true, true);
        let arguments = evaluator.make_array(mc, call_args.to_vec());
        e.declare(Symbol::intern("arguments"), arguments, true, true);
        if let Some(h) = home {
            e.declare(Symbol::intern("__home__"), Value::Object(h), true, true);
        }
    }

    let mut ctx = EvaluationContext::new(Arc::new(AtomicBool::new(false)));
    evaluator.bind_params(mc, &params, call_args, call_env, &mut ctx)?;
    ctx.generator = Some(step);

    let body_stmts: Vec<_> = body.args().collect();
    evaluator.hoist(mc, &body_stmts, call_env)?;
    let result = evaluator.eval_stmt_list(mc, &body_stmts, call_env, &mut ctx)?;

    match ctx.signal {
        Signal::Yield(v, _) => {
            step.borrow_mut(mc).threshold = threshold + 1;
            Ok(make_result(mc, v, false))
        }
        Signal::Return(v) => {
            step.borrow_mut(mc).done = true;
            Ok(make_result(mc, v, true))
        }
        _ => {
            step.borrow_mut(mc).done = true;
            Ok(make_result(mc, result, true))
        }
    }
}

fn make_result<'gc>(mc: &Mutation<'gc>, value: Value<'gc>, done: bool) -> Value<'gc> {
    let obj = Gc::new(mc, RefLock::new(ObjectData::new()));
    {
        let mut data = obj.borrow_mut(mc);
        data.properties.insert(PropertyKey::String("value".to_string()), PropertyDescriptor::data(mc, value, true, true, true));
        data.properties.insert(PropertyKey::String("done".to_string()), PropertyDescriptor::data(mc, Value::Boolean(done), true, true, true));
    }
    Value::Object(obj)
}
