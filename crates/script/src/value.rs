//! Runtime values
//!
//! Primitives are stored inline; arrays, objects and functions are shared
//! references so that aliasing behaves the way script authors expect.

use crate::ast::FunctionDef;
use crate::error::{ErrorKind, ScriptError};
use crate::interpreter::{Interpreter, Scope};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Signature of a builtin function.
///
/// The second argument is the receiver the function was read from
/// (`"abc"` in `"abc".toUpperCase()`), or `undefined` for free functions.
pub type NativeFn = fn(&mut Interpreter, &Value, Vec<Value>) -> Result<Value, ScriptError>;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Function>),
}

/// What kind of object an [`Object`] is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Plain,
    Error(ErrorKind),
}

/// A property bag that keeps insertion order
#[derive(Debug, Clone)]
pub struct Object {
    pub class: ObjectClass,
    properties: Vec<(String, Value)>,
}

impl Object {
    pub fn new(class: ObjectClass) -> Self {
        Object {
            class,
            properties: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((key, value)),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// A callable value
pub enum Function {
    /// Defined in script source; closes over its defining scope
    Script { def: Rc<FunctionDef>, env: Rc<Scope> },
    /// Provided by the interpreter
    Native {
        name: &'static str,
        receiver: Value,
        call: NativeFn,
    },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Script { def, .. } => def.name.as_deref().unwrap_or(""),
            Function::Native { name, .. } => name,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name())
    }
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn native(name: &'static str, call: NativeFn) -> Self {
        Value::Function(Rc::new(Function::Native {
            name,
            receiver: Value::Undefined,
            call,
        }))
    }

    /// A builtin bound to the value it was read from
    pub fn method(name: &'static str, receiver: Value, call: NativeFn) -> Self {
        Value::Function(Rc::new(Function::Native {
            name,
            receiver,
            call,
        }))
    }

    /// Build an error object of the given class
    pub fn error(kind: ErrorKind, message: impl AsRef<str>) -> Self {
        let mut object = Object::new(ObjectClass::Error(kind));
        object.set("name", Value::string(kind.name()));
        object.set("message", Value::string(message));
        Value::object(object)
    }

    /// Name and message of an error object, if this is one
    pub fn error_parts(&self) -> Option<(String, String)> {
        let Value::Object(object) = self else {
            return None;
        };
        let object = object.borrow();
        let ObjectClass::Error(kind) = object.class else {
            return None;
        };
        let name = object
            .get("name")
            .map(Value::to_js_string)
            .unwrap_or_else(|| kind.name().to_string());
        let message = object
            .get("message")
            .map(Value::to_js_string)
            .unwrap_or_default();
        Some((name, message))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Numeric conversion (`Number(value)`)
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// String conversion (`String(value)`)
    pub fn to_js_string(&self) -> String {
        let mut seen = Vec::new();
        self.stringify_into(&mut seen)
    }

    fn stringify_into(&self, seen: &mut Vec<*const RefCell<Vec<Value>>>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items);
                // Cyclic arrays join as empty
                if seen.contains(&ptr) {
                    return String::new();
                }
                seen.push(ptr);
                let joined = items
                    .borrow()
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.stringify_into(seen)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                seen.pop();
                joined
            }
            Value::Object(_) => match self.error_parts() {
                Some((name, message)) if message.is_empty() => name,
                Some((name, message)) => format!("{}: {}", name, message),
                None => "[object Object]".to_string(),
            },
            Value::Function(func) => match func.as_ref() {
                Function::Native { name, .. } => {
                    format!("function {}() {{ [native code] }}", name)
                }
                Function::Script { def, .. } => format!(
                    "function {}({}) {{ ... }}",
                    def.name.as_deref().unwrap_or(""),
                    def.params.join(", ")
                ),
            },
        }
    }

    /// Property key form of a value (`obj[value]`)
    pub fn to_property_key(&self) -> String {
        self.to_js_string()
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::Str(_)) => {
                Value::string(self.to_js_string()).loose_equals(other)
            }
            (Value::Number(_) | Value::Str(_), Value::Array(_) | Value::Object(_)) => {
                self.loose_equals(&Value::string(other.to_js_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Convert to a JSON tree; `None` for values JSON cannot represent
    pub fn to_json(&self) -> Option<serde_json::Value> {
        let mut seen = Vec::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(&self, seen: &mut Vec<usize>) -> Option<serde_json::Value> {
        use serde_json::Value as Json;

        match self {
            Value::Undefined | Value::Function(_) => None,
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Number(n) => Some(json_number(*n)),
            Value::Str(s) => Some(Json::String(s.to_string())),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items) as usize;
                if seen.contains(&ptr) {
                    return Some(Json::Null);
                }
                seen.push(ptr);
                let out = items
                    .borrow()
                    .iter()
                    .map(|item| item.to_json_inner(seen).unwrap_or(Json::Null))
                    .collect();
                seen.pop();
                Some(Json::Array(out))
            }
            Value::Object(object) => {
                let ptr = Rc::as_ptr(object) as usize;
                if seen.contains(&ptr) {
                    return Some(Json::Null);
                }
                seen.push(ptr);
                let object = object.borrow();
                let mut map = serde_json::Map::new();
                // Error name/message are not enumerable
                if object.class == ObjectClass::Plain {
                    for (key, value) in object.entries() {
                        if let Some(json) = value.to_json_inner(seen) {
                            map.insert(key.to_string(), json);
                        }
                    }
                }
                seen.pop();
                Some(Json::Object(map))
            }
        }
    }
}

fn json_number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Parse a string the way `Number(string)` does
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => {
            // Rust accepts "inf"/"nan" spellings that scripts must not
            let valid = trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
            if valid {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            } else {
                f64::NAN
            }
        }
    }
}

/// Format a number the way `String(number)` does.
///
/// Uses the shortest round-trip digits, switching to exponent form below
/// 1e-6 and at or above 1e21.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }

    // "{:e}" yields the shortest digits as d[.ddd]e<exp>
    let formatted = format!("{:e}", n);
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 >= 0 { '+' } else { '-' };
        let exp = (point - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, sign, exp)
        } else {
            let (first, rest) = digits.split_at(1);
            format!("{}.{}e{}{}", first, rest, sign, exp)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(items) => match items.try_borrow() {
                Ok(items) => f.debug_list().entries(items.iter()).finish(),
                Err(_) => f.write_str("[...]"),
            },
            Value::Function(func) => write!(f, "{:?}", func),
            other => f.write_str(&other.to_js_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_integers_and_fractions() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(123.456), "123.456");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_format_exponent_boundaries() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(2.5e25), "2.5e+25");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_array_joins_like_array_join() {
        let arr = Value::array(vec![
            Value::Number(1.0),
            Value::Null,
            Value::string("x"),
            Value::Undefined,
        ]);
        assert_eq!(arr.to_js_string(), "1,,x,");
    }

    #[test]
    fn test_cyclic_array_does_not_recurse_forever() {
        let arr = Value::array(vec![Value::Number(1.0)]);
        if let Value::Array(items) = &arr {
            items.borrow_mut().push(arr.clone());
        }
        assert_eq!(arr.to_js_string(), "1,");
    }

    #[test]
    fn test_error_object_string_form() {
        let err = Value::error(ErrorKind::TypeError, "bad");
        assert_eq!(err.to_js_string(), "TypeError: bad");
        assert_eq!(
            err.error_parts(),
            Some(("TypeError".to_string(), "bad".to_string()))
        );
        assert_eq!(Value::error(ErrorKind::Error, "").to_js_string(), "Error");
    }

    #[test]
    fn test_plain_object_string_form() {
        let obj = Value::object(Object::new(ObjectClass::Plain));
        assert_eq!(obj.to_js_string(), "[object Object]");
        assert!(obj.error_parts().is_none());
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_equality() {
        assert!(Value::Number(1.0).loose_equals(&Value::string("1")));
        assert!(!Value::Number(1.0).strict_equals(&Value::string("1")));
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
        assert!(Value::Bool(true).loose_equals(&Value::Number(1.0)));

        let a = Value::array(vec![]);
        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&Value::array(vec![])));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("0").is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_json_skips_undefined_and_keeps_order() {
        let mut obj = Object::new(ObjectClass::Plain);
        obj.set("b", Value::Number(1.0));
        obj.set("a", Value::Undefined);
        obj.set("c", Value::array(vec![Value::Undefined, Value::Number(0.5)]));
        let json = Value::object(obj).to_json().unwrap();
        assert_eq!(json.to_string(), r#"{"b":1,"c":[null,0.5]}"#);
    }
}
