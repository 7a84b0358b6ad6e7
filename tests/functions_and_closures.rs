use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod functions_and_closures {
    use super::*;

    #[test]
    fn function_declaration_is_hoisted() {
        let script = "
            let r = greet('world');
            function greet(name) { return 'hi ' + name; }
            r
        ";
        assert_eq!(eval(script), JsValue::String("hi world".to_string()));
    }

    #[test]
    fn closures_capture_by_reference() {
        let script = "
            function counter() {
                let n = 0;
                return function() { n = n + 1; return n; };
            }
            let c = counter();
            c(); c(); c()
        ";
        assert_eq!(eval(script), JsValue::Number(3.0));
    }

    #[test]
    fn arrow_functions_capture_lexical_this() {
        let script = "
            function Box(v) { this.v = v; this.get = () => this.v; }
            let b = new Box(42);
            b.get()
        ";
        assert_eq!(eval(script), JsValue::Number(42.0));
    }

    #[test]
    fn default_and_rest_parameters() {
        let script = "
            function sum(a, b = 10, ...rest) {
                let total = a + b;
                for (const n of rest) { total += n; }
                return total;
            }
            sum(1, undefined, 2, 3)
        ";
        assert_eq!(eval(script), JsValue::Number(16.0));
    }

    #[test]
    fn elided_call_argument_falls_back_to_default() {
        // a=1, the elided second argument defaults b to 10, rest = [2, 3].
        let script = "function f(a,b=10,...r){return a+b+r.length;} f(1,,2,3)";
        assert_eq!(eval(script), JsValue::Number(13.0));
    }

    #[test]
    fn recursive_function() {
        let script = "
            function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
            fib(10)
        ";
        assert_eq!(eval(script), JsValue::Number(55.0));
    }
}
