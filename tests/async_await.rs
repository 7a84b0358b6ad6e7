use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod async_await {
    use super::*;

    #[test]
    fn async_function_returns_settled_promise_value_via_await() {
        let script = "
            async function addOne(n) { return n + 1; }
            async function run() { return await addOne(41); }
            let result;
            run().then(v => { result = v; });
            result
        ";
        assert_eq!(eval(script), JsValue::Number(42.0));
    }

    #[test]
    fn await_on_non_promise_resolves_to_itself() {
        let script = "
            async function run() { return await 7; }
            let result;
            run().then(v => { result = v; });
            result
        ";
        assert_eq!(eval(script), JsValue::Number(7.0));
    }

    #[test]
    fn thrown_error_inside_async_function_rejects() {
        let script = "
            async function fails() { throw 'nope'; }
            let result;
            fails().catch(e => { result = e; });
            result
        ";
        assert_eq!(eval(script), JsValue::String("nope".to_string()));
    }

    #[test]
    fn promise_executor_runs_synchronously() {
        let script = "
            let value;
            new Promise((resolve, reject) => resolve(99)).then(v => { value = v; });
            value
        ";
        assert_eq!(eval(script), JsValue::Number(99.0));
    }

    #[test]
    fn promise_resolve_static_is_awaitable() {
        let script = "
            async function f() { return (await Promise.resolve(2)) + (await Promise.resolve(3)); }
            let result;
            f().then(v => { result = v; });
            result
        ";
        assert_eq!(eval(script), JsValue::Number(5.0));
    }

    #[test]
    fn promise_reject_static_rejects() {
        let script = "
            let result;
            Promise.reject('boom').catch(e => { result = e; });
            result
        ";
        assert_eq!(eval(script), JsValue::String("boom".to_string()));
    }
}
