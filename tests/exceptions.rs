use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod exceptions {
    use super::*;

    #[test]
    fn throw_and_catch_value() {
        let script = "
            let caught;
            try { throw 'boom'; } catch (e) { caught = e; }
            caught
        ";
        assert_eq!(eval(script), JsValue::String("boom".to_string()));
    }

    #[test]
    fn finally_always_runs() {
        let script = "
            let log = '';
            function run() {
                try { log += 'a'; throw 'x'; }
                catch (e) { log += 'b'; }
                finally { log += 'c'; }
                return log;
            }
            run()
        ";
        assert_eq!(eval(script), JsValue::String("abc".to_string()));
    }

    #[test]
    fn host_raised_type_error_is_catchable() {
        let script = "
            let message = '';
            try {
                let f = undefined;
                f();
            } catch (e) {
                message = e.message;
            }
            message.length > 0
        ";
        assert_eq!(eval(script), JsValue::Boolean(true));
    }

    #[test]
    fn custom_error_subclass() {
        let script = "
            class NotFoundError extends Error {
                constructor(msg) { super(msg); this.name = 'NotFoundError'; }
            }
            try {
                throw new NotFoundError('missing');
            } catch (e) {
                e.name + ': ' + e.message
            }
        ";
        assert_eq!(eval(script), JsValue::String("NotFoundError: missing".to_string()));
    }

    #[test]
    fn uncaught_throw_surfaces_as_error() {
        let mut rt = JsRuntime::new();
        let result = rt.evaluate("throw new Error('fatal');");
        assert!(result.is_err());
    }
}
