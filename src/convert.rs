//! JSON <-> Value conversion utilities

use crate::Value;

/// Parse JSON text into a [`Value`], keeping member order.
pub fn from_str(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str::<serde_json::Value>(text).map(Value::from)
}

/// Convert serde_json::Value to Value
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Integer(i),
                (None, Some(u)) => Value::UInteger(u),
                _ => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Convert Value to serde_json::Value
impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::UInteger(u) => serde_json::Value::Number((*u).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Into::into).collect()),
            Value::Object(obj) => {
                serde_json::Value::Object(obj.iter().map(|(k, v)| (k.clone(), v.into())).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        serde_json::Value::from(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_order_survives_round_trip() {
        let text = r#"{"source-table":1,"aggregation":[["count"]],"breakout":[]}"#;
        let value = from_str(text).unwrap();
        let back = serde_json::to_string(&serde_json::Value::from(value)).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn test_integer_float_distinction() {
        assert_eq!(Value::from(json!(1)), Value::Integer(1));
        assert!(matches!(Value::from(json!(1.5)), Value::Float(_)));
        let text = serde_json::to_string(&serde_json::Value::from(Value::Float(1.0))).unwrap();
        assert_eq!(text, "1.0");
    }

    #[test]
    fn test_integers_above_i64_keep_their_digits() {
        let value = Value::from(json!(18446744073709551615u64));
        assert_eq!(value, Value::UInteger(u64::MAX));
        assert_eq!(serde_json::Value::from(value), json!(18446744073709551615u64));
    }
}
