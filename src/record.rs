use serde_json::{Map, Number, Value};

// One decoded input line. Field order follows the input.
pub type Record = Map<String, Value>;

// Generic string form of a value, used for keys, flattening and URL fields
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_to_string(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "<nil>".to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(stringify).collect();
            format!("[{}]", parts.join(" "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", k, stringify(v)))
                .collect();
            format!("map[{}]", parts.join(" "))
        }
    }
}

// integral floats print without a fraction, "2.0" -> "2"
fn number_to_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(stringify(&json!("plain")), "plain");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(-7)), "-7");
        assert_eq!(stringify(&json!(2.0)), "2");
        assert_eq!(stringify(&json!(1.5)), "1.5");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&Value::Null), "<nil>");
    }

    #[test]
    fn large_numbers_keep_their_digits() {
        assert_eq!(stringify(&json!(1000000)), "1000000");
        assert_eq!(stringify(&json!(1000000.0)), "1000000");
        assert_eq!(stringify(&json!(u64::MAX)), "18446744073709551615");
        assert_eq!(stringify(&json!(1e21)), "1e21");
    }

    #[test]
    fn nested_values_degrade_to_generic_form() {
        assert_eq!(stringify(&json!(["a", 1, null])), "[a 1 <nil>]");
        assert_eq!(stringify(&json!({"b": 1, "a": "x"})), "map[b:1 a:x]");
    }
}
