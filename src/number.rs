//! Number-to-string formatting matching JS's `ToString(Number)` for the
//! common cases (integers print without a decimal point, NaN/Infinity print
//! their literal spellings). Grounded on the teacher's small `core/number.rs`
//! helper of the same shape.

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "0".to_string() } else { "0".to_string() };
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}
