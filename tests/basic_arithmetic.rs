use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod arithmetic {
    use super::*;

    #[test]
    fn addition() {
        assert_eq!(eval("let x = 1; let y = 2; x + y"), JsValue::Number(3.0));
    }

    #[test]
    fn subtraction_and_multiplication() {
        assert_eq!(eval("10 - 3"), JsValue::Number(7.0));
        assert_eq!(eval("4 * 5"), JsValue::Number(20.0));
    }

    #[test]
    fn modulo() {
        assert_eq!(eval("7 % 3"), JsValue::Number(1.0));
    }

    #[test]
    fn string_concatenation_coerces_numbers() {
        assert_eq!(eval("54 + 76 + 'yyuiyu'"), JsValue::String("130yyuiyu".to_string()));
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(eval("2 + 3 * 4"), JsValue::Number(14.0));
        assert_eq!(eval("(2 + 3) * 4"), JsValue::Number(20.0));
    }

    #[test]
    fn bigint_arithmetic() {
        assert_eq!(eval("10n - 3n"), JsValue::BigInt("7".to_string()));
        assert_eq!(eval("3n * 4n"), JsValue::BigInt("12".to_string()));
        assert_eq!(eval("10n / 3n"), JsValue::BigInt("3".to_string()));
        assert_eq!(eval("10n % 3n"), JsValue::BigInt("1".to_string()));
        assert_eq!(eval("2n ** 10n"), JsValue::BigInt("1024".to_string()));
    }

    #[test]
    fn bigint_relational_comparisons() {
        assert_eq!(eval("10n > 3n"), JsValue::Boolean(true));
        assert_eq!(eval("3n < 10n"), JsValue::Boolean(true));
        assert_eq!(eval("5n >= 5n"), JsValue::Boolean(true));
        assert_eq!(eval("5n < 5.5"), JsValue::Boolean(true));
    }
}
