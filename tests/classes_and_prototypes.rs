use consjs::{JsRuntime, JsValue};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(source: &str) -> JsValue {
    JsRuntime::new().evaluate(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

#[cfg(test)]
mod classes_and_prototypes {
    use super::*;

    #[test]
    fn class_method_and_field() {
        let script = "
            class Point {
                constructor(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            let p = new Point(3, 4);
            p.sum()
        ";
        assert_eq!(eval(script), JsValue::Number(7.0));
    }

    #[test]
    fn subclass_calls_super_constructor_and_method() {
        let script = "
            class Animal {
                constructor(name) { this.name = name; }
                speak() { return this.name + ' makes a sound'; }
            }
            class Dog extends Animal {
                constructor(name) { super(name); }
                speak() { return super.speak() + ' (bark)'; }
            }
            new Dog('Rex').speak()
        ";
        assert_eq!(eval(script), JsValue::String("Rex makes a sound (bark)".to_string()));
    }

    #[test]
    fn instanceof_walks_prototype_chain() {
        let script = "
            class Animal {}
            class Dog extends Animal {}
            let d = new Dog();
            d instanceof Dog && d instanceof Animal
        ";
        assert_eq!(eval(script), JsValue::Boolean(true));
    }

    #[test]
    fn getters_and_setters() {
        let script = "
            class Temperature {
                constructor(celsius) { this._c = celsius; }
                get fahrenheit() { return this._c * 9 / 5 + 32; }
                set fahrenheit(f) { this._c = (f - 32) * 5 / 9; }
            }
            let t = new Temperature(0);
            t.fahrenheit = 212;
            t._c
        ";
        assert_eq!(eval(script), JsValue::Number(100.0));
    }

    #[test]
    fn constructor_returning_object_overrides_the_allocated_instance() {
        let script = "
            function Wrapped(v) {
                this.v = v;
                return { wrapped: v * 2 };
            }
            new Wrapped(21).wrapped
        ";
        assert_eq!(eval(script), JsValue::Number(42.0));
    }

    #[test]
    fn constructor_returning_primitive_keeps_the_allocated_instance() {
        let script = "
            function Point(x) { this.x = x; return 5; }
            new Point(7).x
        ";
        assert_eq!(eval(script), JsValue::Number(7.0));
    }

    #[test]
    fn manual_prototype_chain_without_classes() {
        let script = "
            function Shape(kind) { this.kind = kind; }
            Shape.prototype.describe = function() { return 'a ' + this.kind; };
            let s = new Shape('circle');
            s.describe()
        ";
        assert_eq!(eval(script), JsValue::String("a circle".to_string()));
    }
}
