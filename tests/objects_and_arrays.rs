use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod objects_and_arrays {
    use super::*;

    #[test]
    fn object_literal_and_member_access() {
        let script = "let o = { a: 1, b: 2 }; o.a + o.b";
        assert_eq!(eval(script), JsValue::Number(3.0));
    }

    #[test]
    fn array_literal_and_index_access() {
        let script = "let a = [10, 20, 30]; a[0] + a[2]";
        assert_eq!(eval(script), JsValue::Number(40.0));
    }

    #[test]
    fn array_destructuring_with_default_and_rest() {
        let script = "let [a, b = 5, ...rest] = [1]; a + b + rest.length";
        assert_eq!(eval(script), JsValue::Number(6.0));
    }

    #[test]
    fn object_destructuring() {
        let script = "let { x, y } = { x: 3, y: 4 }; x * y";
        assert_eq!(eval(script), JsValue::Number(12.0));
    }

    #[test]
    fn array_destructuring_skips_elided_holes() {
        let script = "const [a,,b=9,...r]=[1,2,undefined,4,5]; [a,b,r]";
        assert_eq!(
            eval(script),
            JsValue::Array(vec![JsValue::Number(1.0), JsValue::Number(9.0), JsValue::Array(vec![JsValue::Number(4.0), JsValue::Number(5.0)])])
        );
    }

    #[test]
    fn object_rest_destructuring_collects_remaining_keys() {
        let script = "const { a, ...rest } = { a: 1, b: 2, c: 3 }; rest.b + rest.c";
        assert_eq!(eval(script), JsValue::Number(5.0));
    }

    #[test]
    fn object_freeze_prevents_writes() {
        let script = "
            let o = Object.freeze({ a: 1 });
            try {
                o.a = 2;
                'no error';
            } catch (e) {
                e.name;
            }
        ";
        assert_eq!(eval(script), JsValue::String("TypeError".to_string()));
    }

    #[test]
    fn spread_merges_objects_and_arrays() {
        let script = "
            let a = [1, 2];
            let b = [...a, 3];
            b.length
        ";
        assert_eq!(eval(script), JsValue::Number(3.0));
    }

    #[test]
    fn template_literal_interpolation() {
        let script = "let name = 'world'; `hello ${name}!`";
        assert_eq!(eval(script), JsValue::String("hello world!".to_string()));
    }

    #[test]
    fn computed_member_and_shorthand_method() {
        let script = "
            let key = 'greet';
            let obj = { [key]() { return 'hi'; } };
            obj.greet()
        ";
        assert_eq!(eval(script), JsValue::String("hi".to_string()));
    }
}
