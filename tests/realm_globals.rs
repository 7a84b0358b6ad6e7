use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod realm_globals {
    use super::*;

    #[test]
    fn parse_int_and_float() {
        assert_eq!(eval("parseInt('42')"), JsValue::Number(42.0));
        assert_eq!(eval("parseFloat('3.5')"), JsValue::Number(3.5));
    }

    #[test]
    fn is_nan_and_is_finite() {
        assert_eq!(eval("isNaN('not a number')"), JsValue::Boolean(true));
        assert_eq!(eval("isFinite(1)"), JsValue::Boolean(true));
    }

    #[test]
    fn console_log_does_not_throw() {
        assert_eq!(eval("console.log('hi'); 1"), JsValue::Number(1.0));
    }

    #[test]
    fn symbol_iterator_is_a_well_known_symbol() {
        assert_eq!(eval("typeof Symbol.iterator"), JsValue::String("symbol".to_string()));
    }

    #[test]
    fn object_and_array_constructors() {
        assert_eq!(eval("Array(3).length"), JsValue::Number(3.0));
        assert_eq!(eval("typeof Object()"), JsValue::String("object".to_string()));
    }

    #[test]
    fn new_type_error_has_name_and_message() {
        let script = "let e = new TypeError('bad'); e.name + ':' + e.message";
        assert_eq!(eval(script), JsValue::String("TypeError:bad".to_string()));
    }

    #[test]
    fn host_set_global_function_is_callable_from_script() {
        let mut rt = JsRuntime::new();
        rt.set_global_function("double", |args| match args.first() {
            Some(JsValue::Number(n)) => JsValue::Number(n * 2.0),
            _ => JsValue::Undefined,
        });
        assert_eq!(rt.evaluate("double(21)").unwrap(), JsValue::Number(42.0));
    }

    #[test]
    fn host_set_global_value_is_visible_from_script() {
        let mut rt = JsRuntime::new();
        rt.set_global("ANSWER", JsValue::Number(42.0));
        assert_eq!(rt.evaluate("ANSWER").unwrap(), JsValue::Number(42.0));
    }
}
