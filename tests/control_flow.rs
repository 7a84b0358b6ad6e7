use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod control_flow {
    use super::*;

    #[test]
    fn if_else_branches() {
        assert_eq!(eval("let x = 5; if (x > 3) { 'big' } else { 'small' }"), JsValue::String("big".to_string()));
        assert_eq!(eval("let x = 1; if (x > 3) { 'big' } else { 'small' }"), JsValue::String("small".to_string()));
    }

    #[test]
    fn while_loop_accumulates() {
        let script = "let i = 0; let sum = 0; while (i < 5) { sum = sum + i; i = i + 1; } sum";
        assert_eq!(eval(script), JsValue::Number(10.0));
    }

    #[test]
    fn for_loop_with_break_and_continue() {
        let script = "
            let total = 0;
            for (let i = 0; i < 10; i = i + 1) {
                if (i % 2 === 0) { continue; }
                if (i > 7) { break; }
                total = total + i;
            }
            total
        ";
        assert_eq!(eval(script), JsValue::Number(1.0 + 3.0 + 5.0 + 7.0));
    }

    #[test]
    fn labeled_break_exits_outer_loop() {
        let script = "
            let found = -1;
            outer: for (let i = 0; i < 3; i = i + 1) {
                for (let j = 0; j < 3; j = j + 1) {
                    if (i === 1 && j === 1) { found = i * 10 + j; break outer; }
                }
            }
            found
        ";
        assert_eq!(eval(script), JsValue::Number(11.0));
    }

    #[test]
    fn switch_falls_through_without_break() {
        let script = "
            function classify(n) {
                let out = '';
                switch (n) {
                    case 1:
                        out += 'one';
                    case 2:
                        out += 'two';
                        break;
                    default:
                        out += 'other';
                }
                return out;
            }
            classify(1)
        ";
        assert_eq!(eval(script), JsValue::String("onetwo".to_string()));
    }

    #[test]
    fn for_of_over_array() {
        let script = "let total = 0; for (const n of [1, 2, 3]) { total += n; } total";
        assert_eq!(eval(script), JsValue::Number(6.0));
    }
}
