use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod generators {
    use super::*;

    #[test]
    fn yields_sequence_of_values() {
        let script = "
            function* counter() { yield 1; yield 2; yield 3; }
            let g = counter();
            let a = g.next().value;
            let b = g.next().value;
            let c = g.next().value;
            a + b + c
        ";
        assert_eq!(eval(script), JsValue::Number(6.0));
    }

    #[test]
    fn reports_done_after_exhaustion() {
        let script = "
            function* one() { yield 'x'; }
            let g = one();
            g.next();
            g.next().done
        ";
        assert_eq!(eval(script), JsValue::Boolean(true));
    }

    #[test]
    fn return_call_finishes_generator_early() {
        let script = "
            function* forever() { let i = 0; while (true) { yield i; i = i + 1; } }
            let g = forever();
            g.next();
            let r = g.return(100);
            r.value === 100 && r.done === true
        ";
        assert_eq!(eval(script), JsValue::Boolean(true));
    }

    #[test]
    fn for_of_drains_a_generator() {
        let script = "
            function* range(n) { for (let i = 0; i < n; i = i + 1) { yield i; } }
            let total = 0;
            for (const v of range(4)) { total += v; }
            total
        ";
        assert_eq!(eval(script), JsValue::Number(6.0));
    }
}
