use std::rc::Rc;

/// A plain JSON value: the wire shape every node is parsed from and
/// projected back to.
///
/// Integers and floats are kept apart so a document re-emits `1` as `1`
/// and `1.0` as `1.0`. Object members keep their insertion order, which is
/// what makes `to_value()` reproduce the input byte-for-byte.
///
/// Arrays and objects are reference counted: cloning a container is O(1)
/// and the clone shares its elements with the original. Trees built from
/// one document share every subtree they did not edit.
///
/// # Examples
///
/// ```
/// use mbql_tree::Value;
///
/// let clause = Value::array(vec![
///     Value::String("field-id".to_string()),
///     Value::Integer(1),
/// ]);
/// assert_eq!(clause.tag(), Some("field-id"));
///
/// let object = Value::object(vec![("source-table".to_string(), Value::Integer(1))]);
/// assert_eq!(object.get("source-table"), Some(&Value::Integer(1)));
/// assert!(object.clone().ptr_eq(&object));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Integer above `i64::MAX`
    UInteger(u64),

    /// UTF-8 string
    String(String),

    /// Ordered sequence of values
    Array(Rc<Vec<Value>>),

    /// Object members in wire order
    Object(Rc<Vec<(String, Value)>>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }

    pub fn object(members: Vec<(String, Value)>) -> Self {
        Value::Object(Rc::new(members))
    }

    /// True when both values are containers sharing one allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Literal identity: true only when both values serialize to the same
    /// text. `1` and `1.0` differ here, and so do objects whose members are
    /// in a different order.
    pub fn same(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (UInteger(a), UInteger(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => {
                Rc::ptr_eq(a, b) || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same(y)))
            }
            (Object(a), Object(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|((k, v), (l, w))| k == l && v.same(w)))
            }
            _ => false,
        }
    }

    /// True for arrays and objects, the only values the engine wraps in nodes.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// The leading string of an array, which is how clauses are tagged.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }

    /// Object member lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::UInteger(n) => i64::try_from(*n).ok(),
            Value::Float(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::UInteger(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Human-readable rendering of a scalar used inside display names.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::UInteger(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => serde_json::Value::from(self).to_string(),
        }
    }

    /// Number of elements (arrays) or members (objects); zero for scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            Value::Object(members) => members.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::UInteger(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Deep equality. Numbers compare by value and objects compare as maps, so
/// member order does not matter here even though it is preserved for
/// output. See [`Value::same`] for the literal comparison.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (UInteger(a), UInteger(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Integer(a), UInteger(b)) | (UInteger(b), Integer(a)) => u64::try_from(*a).is_ok_and(|a| a == *b),
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => (*a as f64) == *b,
            (UInteger(a), Float(b)) | (Float(b), UInteger(a)) => (*a as f64) == *b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => Rc::ptr_eq(a, b) || a == b,
            (Object(a), Object(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().all(|(k, v)| other_member(b, k).is_some_and(|w| v == w)))
            }
            _ => false,
        }
    }
}

fn other_member<'a>(members: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    members.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::UInteger(n),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_equality_ignores_member_order() {
        let a = Value::object(vec![
            ("a".to_string(), Value::Integer(1)),
            ("b".to_string(), Value::Integer(2)),
        ]);
        let b = Value::object(vec![
            ("b".to_string(), Value::Integer(2)),
            ("a".to_string(), Value::Integer(1)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_array_equality_is_ordered() {
        let a = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::array(vec![Value::Integer(2), Value::Integer(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tag() {
        let clause = Value::array(vec!["sum".into(), Value::array(vec!["field-id".into(), Value::Integer(1)])]);
        assert_eq!(clause.tag(), Some("sum"));
        assert_eq!(Value::array(vec![Value::Integer(1)]).tag(), None);
        assert_eq!(Value::String("sum".into()).tag(), None);
    }

    #[test]
    fn test_same_is_literal() {
        assert_eq!(Value::Integer(1), Value::Float(1.0));
        assert!(!Value::Integer(1).same(&Value::Float(1.0)));
        assert!(Value::Float(1.0).same(&Value::Float(1.0)));

        let ab = Value::object(vec![
            ("a".to_string(), Value::Integer(1)),
            ("b".to_string(), Value::Integer(2)),
        ]);
        let ba = Value::object(vec![
            ("b".to_string(), Value::Integer(2)),
            ("a".to_string(), Value::Integer(1)),
        ]);
        assert_eq!(ab, ba);
        assert!(!ab.same(&ba));
        assert!(ab.same(&ab.clone()));
    }

    #[test]
    fn test_unsigned_integers() {
        assert_eq!(Value::from(u64::MAX), Value::UInteger(u64::MAX));
        assert_eq!(Value::from(7u64), Value::Integer(7));
        assert_eq!(Value::UInteger(u64::MAX).as_int(), None);
        assert_eq!(Value::UInteger(u64::MAX).as_string(), "18446744073709551615");
        assert_eq!(Value::UInteger(u64::MAX).type_name(), "integer");
        assert_ne!(Value::UInteger(u64::MAX), Value::Integer(-1));
    }

    #[test]
    fn test_clone_shares_containers() {
        let items = Value::array(vec![Value::Integer(1), Value::array(vec![Value::Integer(2)])]);
        let copy = items.clone();
        assert!(copy.ptr_eq(&items));
        assert!(!Value::array(vec![Value::Integer(1)]).ptr_eq(&Value::array(vec![Value::Integer(1)])));
    }

    #[test]
    fn test_as_string_scalars() {
        assert_eq!(Value::Integer(42).as_string(), "42");
        assert_eq!(Value::String("month".into()).as_string(), "month");
        assert_eq!(Value::Null.as_string(), "null");
    }
}
