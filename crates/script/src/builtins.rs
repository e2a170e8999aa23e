//! Global objects and primitive methods
//!
//! Globals are installed fresh into every interpreter. Methods on strings,
//! arrays and numbers are looked up by name on property access and returned
//! bound to their receiver.

use crate::console;
use crate::error::{ErrorKind, ScriptError};
use crate::interpreter::{Interpreter, Scope};
use crate::value::{Function, NativeFn, Object, ObjectClass, Value, format_number};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Longest string (in bytes) a script may build
pub(crate) const MAX_STRING_LENGTH: usize = 1 << 26;

type NativeResult = Result<Value, ScriptError>;

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Fail with a `RangeError` when a string of `len` bytes would be too long
pub(crate) fn check_string_length(len: usize) -> Result<(), ScriptError> {
    if len > MAX_STRING_LENGTH {
        return Err(ScriptError::range_error("Invalid string length"));
    }
    Ok(())
}

/// Join values the way `Array.prototype.join` does
pub fn join_values(values: &[Value], separator: &str) -> Result<String, ScriptError> {
    let parts: Vec<String> = values
        .iter()
        .map(|v| {
            if v.is_nullish() {
                String::new()
            } else {
                v.to_js_string()
            }
        })
        .collect();
    let separators = separator.len().saturating_mul(parts.len().saturating_sub(1));
    let total = parts
        .iter()
        .fold(separators, |total, part| total.saturating_add(part.len()));
    check_string_length(total)?;
    Ok(parts.join(separator))
}

fn namespace(entries: &[(&'static str, NativeFn)]) -> Object {
    let mut object = Object::new(ObjectClass::Plain);
    for (name, call) in entries {
        object.set(*name, Value::native(*name, *call));
    }
    object
}

pub(crate) fn install_globals(scope: &Rc<Scope>) {
    scope.define("undefined", Value::Undefined, false);
    scope.define("NaN", Value::Number(f64::NAN), false);
    scope.define("Infinity", Value::Number(f64::INFINITY), false);

    let console = namespace(&[
        ("log", console_log),
        ("info", console_info),
        ("warn", console_warn),
        ("error", console_error),
    ]);
    scope.define("console", Value::object(console), true);

    let functions: [(&'static str, NativeFn); 11] = [
        ("Error", error_ctor),
        ("TypeError", type_error_ctor),
        ("RangeError", range_error_ctor),
        ("ReferenceError", reference_error_ctor),
        ("SyntaxError", syntax_error_ctor),
        ("String", string_fn),
        ("Number", number_fn),
        ("Boolean", boolean_fn),
        ("parseInt", parse_int),
        ("parseFloat", parse_float),
        ("isNaN", is_nan),
    ];
    for (name, call) in functions {
        scope.define(name, Value::native(name, call), true);
    }

    let mut math = namespace(&[
        ("abs", math_abs),
        ("floor", math_floor),
        ("ceil", math_ceil),
        ("round", math_round),
        ("trunc", math_trunc),
        ("sign", math_sign),
        ("sqrt", math_sqrt),
        ("cbrt", math_cbrt),
        ("pow", math_pow),
        ("min", math_min),
        ("max", math_max),
        ("log", math_log),
        ("log2", math_log2),
        ("log10", math_log10),
        ("exp", math_exp),
        ("sin", math_sin),
        ("cos", math_cos),
        ("tan", math_tan),
        ("atan", math_atan),
        ("atan2", math_atan2),
        ("hypot", math_hypot),
    ]);
    for (name, value) in [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ] {
        math.set(name, Value::Number(value));
    }
    scope.define("Math", Value::object(math), true);

    scope.define(
        "JSON",
        Value::object(namespace(&[("stringify", json_stringify)])),
        true,
    );
    scope.define(
        "Array",
        Value::object(namespace(&[("isArray", array_is_array)])),
        true,
    );
}

// console

fn console_log(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    console::emit(&join_values(&args, " ")?);
    Ok(Value::Undefined)
}

fn console_info(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let line = join_values(&args, " ")?;
    tracing::info!(target: "padscript::console", "{}", line);
    Ok(Value::Undefined)
}

fn console_warn(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let line = join_values(&args, " ")?;
    tracing::warn!(target: "padscript::console", "{}", line);
    Ok(Value::Undefined)
}

fn console_error(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let line = join_values(&args, " ")?;
    tracing::error!(target: "padscript::console", "{}", line);
    Ok(Value::Undefined)
}

// Error constructors

fn make_error(kind: ErrorKind, args: &[Value]) -> Value {
    let message = match arg(args, 0) {
        Value::Undefined => String::new(),
        other => other.to_js_string(),
    };
    Value::error(kind, message)
}

fn error_ctor(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(make_error(ErrorKind::Error, &args))
}

fn type_error_ctor(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(make_error(ErrorKind::TypeError, &args))
}

fn range_error_ctor(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(make_error(ErrorKind::RangeError, &args))
}

fn reference_error_ctor(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(make_error(ErrorKind::ReferenceError, &args))
}

fn syntax_error_ctor(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(make_error(ErrorKind::SyntaxError, &args))
}

// Conversions

fn string_fn(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(match args.first() {
        Some(value) => Value::from(value.to_js_string()),
        None => Value::string(""),
    })
}

fn number_fn(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
}

fn boolean_fn(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::Bool(arg(&args, 0).is_truthy()))
}

fn is_nan(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::Bool(arg(&args, 0).to_number().is_nan()))
}

fn parse_int(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let text = arg(&args, 0).to_js_string();
    let mut s = text.trim_start();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    let mut radix = match arg(&args, 1) {
        Value::Undefined => 0,
        other => other.to_number() as u32,
    };
    if (radix == 0 || radix == 16)
        && let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
    {
        s = rest;
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }

    let mut result: Option<f64> = None;
    for c in s.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        result = Some(result.unwrap_or(0.0) * radix as f64 + digit as f64);
    }
    Ok(Value::Number(result.map_or(f64::NAN, |n| sign * n)))
}

fn parse_float(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let text = arg(&args, 0).to_js_string();
    let s = text.trim_start();

    for (prefix, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if s.starts_with(prefix) {
            return Ok(Value::Number(value));
        }
    }

    // Longest prefix that forms a decimal literal
    let chars: Vec<char> = s.chars().collect();
    let mut end = 0;
    if matches!(chars.first(), Some('+') | Some('-')) {
        end = 1;
    }
    let mut seen_digit = false;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
        seen_digit = true;
    }
    if end < chars.len() && chars[end] == '.' {
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return Ok(Value::Number(f64::NAN));
    }
    if end < chars.len() && matches!(chars[end], 'e' | 'E') {
        let mut exp_end = end + 1;
        if exp_end < chars.len() && matches!(chars[exp_end], '+' | '-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < chars.len() && chars[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    let literal: String = chars[..end].iter().collect();
    Ok(Value::Number(literal.parse().unwrap_or(f64::NAN)))
}

// Math

fn num_arg(args: &[Value], index: usize) -> f64 {
    arg(args, index).to_number()
}

macro_rules! math_unary {
    ($($name:ident => $op:expr),* $(,)?) => {
        $(
            fn $name(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
                let f: fn(f64) -> f64 = $op;
                Ok(Value::Number(f(num_arg(&args, 0))))
            }
        )*
    };
}

math_unary! {
    math_abs => f64::abs,
    math_floor => f64::floor,
    math_ceil => f64::ceil,
    // Halves round toward +Infinity
    math_round => |x| (x + 0.5).floor(),
    math_trunc => f64::trunc,
    math_sign => |x| if x.is_nan() || x == 0.0 { x } else { x.signum() },
    math_sqrt => f64::sqrt,
    math_cbrt => f64::cbrt,
    math_log => f64::ln,
    math_log2 => f64::log2,
    math_log10 => f64::log10,
    math_exp => f64::exp,
    math_sin => f64::sin,
    math_cos => f64::cos,
    math_tan => f64::tan,
    math_atan => f64::atan,
}

fn math_pow(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let (base, exp) = (num_arg(&args, 0), num_arg(&args, 1));
    Ok(Value::Number(if exp.is_nan() {
        f64::NAN
    } else {
        base.powf(exp)
    }))
}

fn math_atan2(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::Number(num_arg(&args, 0).atan2(num_arg(&args, 1))))
}

fn math_hypot(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let sum: f64 = args.iter().map(|v| v.to_number().powi(2)).sum();
    Ok(Value::Number(sum.sqrt()))
}

fn math_min(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let mut result = f64::INFINITY;
    for n in args.iter().map(Value::to_number) {
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.min(n);
    }
    Ok(Value::Number(result))
}

fn math_max(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    let mut result = f64::NEG_INFINITY;
    for n in args.iter().map(Value::to_number) {
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.max(n);
    }
    Ok(Value::Number(result))
}

// JSON

fn json_stringify(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    use serde::Serialize;

    let Some(json) = arg(&args, 0).to_json() else {
        return Ok(Value::Undefined);
    };

    let indent = match arg(&args, 2) {
        Value::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Value::Str(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    let text = if indent.is_empty() {
        json.to_string()
    } else {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        json.serialize(&mut serializer)
            .map_err(|e| ScriptError::type_error(e.to_string()))?;
        String::from_utf8(out).map_err(|e| ScriptError::type_error(e.to_string()))?
    };
    Ok(Value::from(text))
}

fn array_is_array(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::Bool(matches!(arg(&args, 0), Value::Array(_))))
}

// Property access

fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse().ok()
}

/// Read `object[key]`
pub fn get_property(object: &Value, key: &str) -> Result<Value, ScriptError> {
    match object {
        Value::Undefined | Value::Null => Err(ScriptError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            object.to_js_string(),
            key
        ))),
        Value::Str(s) => {
            if key == "length" {
                return Ok(Value::Number(s.chars().count() as f64));
            }
            if let Some(index) = array_index(key) {
                return Ok(s
                    .chars()
                    .nth(index)
                    .map_or(Value::Undefined, |c| Value::string(c.to_string())));
            }
            Ok(lookup_method(STRING_METHODS, key, object))
        }
        Value::Array(items) => {
            if key == "length" {
                return Ok(Value::Number(items.borrow().len() as f64));
            }
            if let Some(index) = array_index(key) {
                return Ok(items.borrow().get(index).cloned().unwrap_or(Value::Undefined));
            }
            Ok(lookup_method(ARRAY_METHODS, key, object))
        }
        Value::Object(obj) => Ok(obj.borrow().get(key).cloned().unwrap_or(Value::Undefined)),
        Value::Number(_) => Ok(lookup_method(NUMBER_METHODS, key, object)),
        Value::Bool(_) => Ok(lookup_method(BOOL_METHODS, key, object)),
        Value::Function(func) => Ok(match key {
            "name" => Value::string(func.name()),
            "length" => Value::Number(match func.as_ref() {
                Function::Script { def, .. } => def.params.len() as f64,
                Function::Native { .. } => 0.0,
            }),
            _ => Value::Undefined,
        }),
    }
}

/// Write `object[key] = value`
pub fn set_property(object: &Value, key: &str, value: Value) -> Result<(), ScriptError> {
    match object {
        Value::Undefined | Value::Null => Err(ScriptError::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            object.to_js_string(),
            key
        ))),
        Value::Array(items) => {
            if key == "length" {
                let len = value.to_number();
                if len < 0.0 || len.fract() != 0.0 || len > MAX_STRING_LENGTH as f64 {
                    return Err(ScriptError::range_error("Invalid array length"));
                }
                items.borrow_mut().resize(len as usize, Value::Undefined);
                return Ok(());
            }
            if let Some(index) = array_index(key) {
                if index > MAX_STRING_LENGTH {
                    return Err(ScriptError::range_error("Invalid array length"));
                }
                let mut items = items.borrow_mut();
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
            }
            Ok(())
        }
        Value::Object(obj) => {
            obj.borrow_mut().set(key, value);
            Ok(())
        }
        // Writes to primitives and functions are ignored
        _ => Ok(()),
    }
}

fn lookup_method(table: &[(&'static str, NativeFn)], key: &str, receiver: &Value) -> Value {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map_or(Value::Undefined, |(name, call)| {
            Value::method(*name, receiver.clone(), *call)
        })
}

// Number methods

const NUMBER_METHODS: &[(&str, NativeFn)] = &[("toFixed", number_to_fixed), ("toString", to_string)];

const BOOL_METHODS: &[(&str, NativeFn)] = &[("toString", to_string)];

fn to_string(_: &mut Interpreter, this: &Value, _: Vec<Value>) -> NativeResult {
    Ok(Value::from(this.to_js_string()))
}

fn number_to_fixed(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let n = this.to_number();
    let digits = match arg(&args, 0) {
        Value::Undefined => 0.0,
        other => other.to_number().trunc(),
    };
    if !(0.0..=100.0).contains(&digits) {
        return Err(ScriptError::range_error(
            "toFixed() digits argument must be between 0 and 100",
        ));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(Value::from(format_number(n)));
    }

    let digits = digits as usize;
    // Ties round away from zero
    let magnitude = if digits <= 15 {
        let scale = 10f64.powi(digits as i32);
        (n.abs() * scale).round() / scale
    } else {
        n.abs()
    };
    let text = format!("{:.*}", digits, magnitude);
    Ok(Value::from(if n < 0.0 { format!("-{}", text) } else { text }))
}

// String methods

const STRING_METHODS: &[(&str, NativeFn)] = &[
    ("toUpperCase", string_to_upper_case),
    ("toLowerCase", string_to_lower_case),
    ("trim", string_trim),
    ("split", string_split),
    ("includes", string_includes),
    ("indexOf", string_index_of),
    ("slice", string_slice),
    ("startsWith", string_starts_with),
    ("endsWith", string_ends_with),
    ("repeat", string_repeat),
    ("padStart", string_pad_start),
    ("padEnd", string_pad_end),
    ("charAt", string_char_at),
    ("replace", string_replace),
    ("toString", to_string),
];

fn this_string(this: &Value) -> String {
    this.to_js_string()
}

/// Resolve a possibly negative relative index against `len`
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

/// Char index of `needle` in `haystack` at or after char `from`
fn char_index_of(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_from = haystack
        .char_indices()
        .nth(from)
        .map_or(haystack.len(), |(i, _)| i);
    if byte_from > haystack.len() {
        return None;
    }
    haystack[byte_from..]
        .find(needle)
        .map(|byte| haystack[..byte_from + byte].chars().count())
}

fn string_to_upper_case(_: &mut Interpreter, this: &Value, _: Vec<Value>) -> NativeResult {
    Ok(Value::from(this_string(this).to_uppercase()))
}

fn string_to_lower_case(_: &mut Interpreter, this: &Value, _: Vec<Value>) -> NativeResult {
    Ok(Value::from(this_string(this).to_lowercase()))
}

fn string_trim(_: &mut Interpreter, this: &Value, _: Vec<Value>) -> NativeResult {
    Ok(Value::string(this_string(this).trim()))
}

fn string_split(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let parts: Vec<Value> = match arg(&args, 0) {
        Value::Undefined => vec![Value::from(s)],
        sep => {
            let sep = sep.to_js_string();
            if sep.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::string).collect()
            }
        }
    };
    Ok(Value::array(parts))
}

fn string_includes(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let needle = arg(&args, 0).to_js_string();
    let from = relative_index(&arg(&args, 1), s.chars().count(), 0);
    Ok(Value::Bool(char_index_of(&s, &needle, from).is_some()))
}

fn string_index_of(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let needle = arg(&args, 0).to_js_string();
    let from = relative_index(&arg(&args, 1), s.chars().count(), 0);
    Ok(Value::Number(
        char_index_of(&s, &needle, from).map_or(-1.0, |i| i as f64),
    ))
}

fn string_slice(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let chars: Vec<char> = this_string(this).chars().collect();
    let start = relative_index(&arg(&args, 0), chars.len(), 0);
    let end = relative_index(&arg(&args, 1), chars.len(), chars.len());
    let slice: String = if start < end {
        chars[start..end].iter().collect()
    } else {
        String::new()
    };
    Ok(Value::from(slice))
}

fn string_starts_with(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    Ok(Value::Bool(s.starts_with(&arg(&args, 0).to_js_string())))
}

fn string_ends_with(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    Ok(Value::Bool(s.ends_with(&arg(&args, 0).to_js_string())))
}

fn string_repeat(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let count = arg(&args, 0).to_number();
    let count = if count.is_nan() { 0.0 } else { count.trunc() };
    if count < 0.0 || count.is_infinite() {
        return Err(ScriptError::range_error(format!(
            "Invalid count value: {}",
            format_number(count)
        )));
    }
    if s.len() as f64 * count > MAX_STRING_LENGTH as f64 {
        return Err(ScriptError::range_error("Invalid string length"));
    }
    Ok(Value::from(s.repeat(count as usize)))
}

fn padding(s: &str, args: &[Value]) -> Result<String, ScriptError> {
    let target = arg(args, 0).to_number();
    let target = if target.is_nan() { 0.0 } else { target };
    if target > MAX_STRING_LENGTH as f64 {
        return Err(ScriptError::range_error("Invalid string length"));
    }
    let fill = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        other => other.to_js_string(),
    };
    let current = s.chars().count();
    let needed = (target as usize).saturating_sub(current);
    if needed == 0 || fill.is_empty() {
        return Ok(String::new());
    }
    Ok(fill.chars().cycle().take(needed).collect())
}

fn string_pad_start(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let pad = padding(&s, &args)?;
    Ok(Value::from(pad + &s))
}

fn string_pad_end(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let pad = padding(&s, &args)?;
    Ok(Value::from(s + &pad))
}

fn string_char_at(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let index = arg(&args, 0).to_number();
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    if index < 0.0 {
        return Ok(Value::string(""));
    }
    Ok(s.chars()
        .nth(index as usize)
        .map_or(Value::string(""), |c| Value::string(c.to_string())))
}

/// Replace the first occurrence; the replacement may be a function
fn string_replace(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let s = this_string(this);
    let pattern = arg(&args, 0).to_js_string();
    let Some(byte) = s.find(&pattern) else {
        return Ok(Value::from(s));
    };

    let replacement = match arg(&args, 1) {
        func @ Value::Function(_) => {
            let offset = s[..byte].chars().count() as f64;
            interp
                .call_value(
                    &func,
                    vec![
                        Value::string(&pattern),
                        Value::Number(offset),
                        Value::string(&s),
                    ],
                )?
                .to_js_string()
        }
        other => other.to_js_string(),
    };

    let mut out = String::with_capacity(s.len() + replacement.len());
    out.push_str(&s[..byte]);
    out.push_str(&replacement);
    out.push_str(&s[byte + pattern.len()..]);
    Ok(Value::from(out))
}

// Array methods

const ARRAY_METHODS: &[(&str, NativeFn)] = &[
    ("push", array_push),
    ("pop", array_pop),
    ("shift", array_shift),
    ("unshift", array_unshift),
    ("join", array_join),
    ("map", array_map),
    ("filter", array_filter),
    ("forEach", array_for_each),
    ("reduce", array_reduce),
    ("find", array_find),
    ("findIndex", array_find_index),
    ("some", array_some),
    ("every", array_every),
    ("includes", array_includes),
    ("indexOf", array_index_of),
    ("slice", array_slice),
    ("concat", array_concat),
    ("reverse", array_reverse),
    ("sort", array_sort),
    ("toString", to_string),
];

type ArrayRef = Rc<RefCell<Vec<Value>>>;

fn this_array(this: &Value) -> Result<ArrayRef, ScriptError> {
    match this {
        Value::Array(items) => Ok(Rc::clone(items)),
        other => Err(ScriptError::type_error(format!(
            "{} is not an array",
            other.to_js_string()
        ))),
    }
}

fn callback(args: &[Value]) -> Result<Value, ScriptError> {
    match arg(args, 0) {
        func @ Value::Function(_) => Ok(func),
        other => Err(ScriptError::type_error(format!(
            "{} is not a function",
            other.to_js_string()
        ))),
    }
}

/// Element `index`, read without holding the borrow across callbacks
fn element(items: &ArrayRef, index: usize) -> Option<Value> {
    items.borrow().get(index).cloned()
}

fn array_push(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let mut items = items.borrow_mut();
    items.extend(args);
    Ok(Value::Number(items.len() as f64))
}

fn array_pop(_: &mut Interpreter, this: &Value, _: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let popped = items.borrow_mut().pop();
    Ok(popped.unwrap_or(Value::Undefined))
}

fn array_shift(_: &mut Interpreter, this: &Value, _: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let mut items = items.borrow_mut();
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    Ok(items.remove(0))
}

fn array_unshift(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let mut items = items.borrow_mut();
    items.splice(0..0, args);
    Ok(Value::Number(items.len() as f64))
}

fn array_join(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let separator = match arg(&args, 0) {
        Value::Undefined => ",".to_string(),
        other => other.to_js_string(),
    };
    let snapshot = items.borrow().clone();
    Ok(Value::from(join_values(&snapshot, &separator)?))
}

fn array_map(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let func = callback(&args)?;
    let mut out = Vec::new();
    let mut index = 0;
    while let Some(item) = element(&items, index) {
        out.push(interp.call_value(&func, vec![item, Value::Number(index as f64), this.clone()])?);
        index += 1;
    }
    Ok(Value::array(out))
}

fn array_filter(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let func = callback(&args)?;
    let mut out = Vec::new();
    let mut index = 0;
    while let Some(item) = element(&items, index) {
        let keep = interp
            .call_value(
                &func,
                vec![item.clone(), Value::Number(index as f64), this.clone()],
            )?
            .is_truthy();
        if keep {
            out.push(item);
        }
        index += 1;
    }
    Ok(Value::array(out))
}

fn array_for_each(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let func = callback(&args)?;
    let mut index = 0;
    while let Some(item) = element(&items, index) {
        interp.call_value(&func, vec![item, Value::Number(index as f64), this.clone()])?;
        index += 1;
    }
    Ok(Value::Undefined)
}

fn array_reduce(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let func = callback(&args)?;
    let mut index = 0;
    let mut acc = if args.len() >= 2 {
        arg(&args, 1)
    } else {
        match element(&items, 0) {
            Some(first) => {
                index = 1;
                first
            }
            None => {
                return Err(ScriptError::type_error(
                    "Reduce of empty array with no initial value",
                ));
            }
        }
    };
    while let Some(item) = element(&items, index) {
        acc = interp.call_value(
            &func,
            vec![acc, item, Value::Number(index as f64), this.clone()],
        )?;
        index += 1;
    }
    Ok(acc)
}

/// First element index for which the callback is truthy
fn find_position(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> Result<Option<(usize, Value)>, ScriptError> {
    let items = this_array(this)?;
    let func = callback(args)?;
    let mut index = 0;
    while let Some(item) = element(&items, index) {
        let hit = interp
            .call_value(
                &func,
                vec![item.clone(), Value::Number(index as f64), this.clone()],
            )?
            .is_truthy();
        if hit {
            return Ok(Some((index, item)));
        }
        index += 1;
    }
    Ok(None)
}

fn array_find(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    Ok(find_position(interp, this, &args)?.map_or(Value::Undefined, |(_, item)| item))
}

fn array_find_index(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::Number(
        find_position(interp, this, &args)?.map_or(-1.0, |(i, _)| i as f64),
    ))
}

fn array_some(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::Bool(find_position(interp, this, &args)?.is_some()))
}

fn array_every(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let func = callback(&args)?;
    let mut index = 0;
    while let Some(item) = element(&items, index) {
        let ok = interp
            .call_value(&func, vec![item, Value::Number(index as f64), this.clone()])?
            .is_truthy();
        if !ok {
            return Ok(Value::Bool(false));
        }
        index += 1;
    }
    Ok(Value::Bool(true))
}

/// SameValueZero: like `===` except NaN equals NaN
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn array_includes(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let needle = arg(&args, 0);
    let found = items.borrow().iter().any(|v| same_value_zero(v, &needle));
    Ok(Value::Bool(found))
}

fn array_index_of(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let needle = arg(&args, 0);
    let items = items.borrow();
    let from = relative_index(&arg(&args, 1), items.len(), 0);
    let position = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, v)| v.strict_equals(&needle))
        .map_or(-1.0, |(i, _)| i as f64);
    Ok(Value::Number(position))
}

fn array_slice(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let items = items.borrow();
    let start = relative_index(&arg(&args, 0), items.len(), 0);
    let end = relative_index(&arg(&args, 1), items.len(), items.len());
    let slice = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Ok(Value::array(slice))
}

fn array_concat(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let mut out = items.borrow().clone();
    for value in args {
        match value {
            Value::Array(other) => out.extend(other.borrow().iter().cloned()),
            other => out.push(other),
        }
    }
    Ok(Value::array(out))
}

fn array_reverse(_: &mut Interpreter, this: &Value, _: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    items.borrow_mut().reverse();
    Ok(this.clone())
}

/// Stable merge sort with a fallible comparator
fn merge_sort<F>(items: Vec<Value>, cmp: &mut F) -> Result<Vec<Value>, ScriptError>
where
    F: FnMut(&Value, &Value) -> Result<Ordering, ScriptError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if cmp(r, l)? == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn array_sort(interp: &mut Interpreter, this: &Value, args: Vec<Value>) -> NativeResult {
    let items = this_array(this)?;
    let snapshot = items.borrow().clone();

    // undefined always sorts last
    let (defined, undefined): (Vec<Value>, Vec<Value>) = snapshot
        .into_iter()
        .partition(|v| !matches!(v, Value::Undefined));

    let sorted = match arg(&args, 0) {
        Value::Undefined => merge_sort(defined, &mut |a, b| {
            Ok(a.to_js_string().cmp(&b.to_js_string()))
        })?,
        func @ Value::Function(_) => merge_sort(defined, &mut |a, b| {
            let n = interp.call_value(&func, vec![a.clone(), b.clone()])?.to_number();
            Ok(if n < 0.0 {
                Ordering::Less
            } else if n > 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            })
        })?,
        _ => {
            return Err(ScriptError::type_error(
                "The comparison function must be either a function or undefined",
            ));
        }
    };

    let mut out = sorted;
    out.extend(undefined);
    *items.borrow_mut() = out;
    Ok(this.clone())
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{Interpreter, RunOptions};

    fn eval_str(source: &str) -> String {
        Interpreter::new(RunOptions::default())
            .run(source)
            .unwrap()
            .to_js_string()
    }

    fn eval_message(source: &str) -> String {
        Interpreter::new(RunOptions::default())
            .run(source)
            .unwrap_err()
            .message()
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(eval_str("'Hello'.toUpperCase()"), "HELLO");
        assert_eq!(eval_str("'  x '.trim()"), "x");
        assert_eq!(eval_str("'a,b,c'.split(',').length"), "3");
        assert_eq!(eval_str("'abc'.split('').join('-')"), "a-b-c");
        assert_eq!(eval_str("'hello'.indexOf('l')"), "2");
        assert_eq!(eval_str("'hello'.slice(-3)"), "llo");
        assert_eq!(eval_str("'5'.padStart(3, '0')"), "005");
        assert_eq!(eval_str("'ab'.repeat(3)"), "ababab");
        assert_eq!(eval_str("'a-b-c'.replace('-', '+')"), "a+b-c");
        assert_eq!(eval_str("'abc'.charAt(1)"), "b");
        assert_eq!(eval_str("'héllo'.length"), "5");
    }

    #[test]
    fn test_replace_with_function() {
        assert_eq!(
            eval_str("'x=1'.replace('1', (m, i) => m + i)"),
            "x=12"
        );
    }

    #[test]
    fn test_repeat_rejects_negative_count() {
        assert_eq!(eval_message("'a'.repeat(-1)"), "Invalid count value: -1");
    }

    #[test]
    fn test_array_methods() {
        assert_eq!(eval_str("[1, 2, 3].map(x => x * 2).join(',')"), "2,4,6");
        assert_eq!(eval_str("[1, 2, 3, 4].filter(x => x % 2 === 0)"), "2,4");
        assert_eq!(eval_str("[1, 2, 3].reduce((a, b) => a + b, 0)"), "6");
        assert_eq!(eval_str("[1, 2, 3].reduce((a, b) => a + b)"), "6");
        assert_eq!(eval_str("[5, 1, 4].find(x => x < 5)"), "1");
        assert_eq!(eval_str("[1, 2].some(x => x > 1)"), "true");
        assert_eq!(eval_str("[1, 2].every(x => x > 1)"), "false");
        assert_eq!(eval_str("[1, NaN].includes(NaN)"), "true");
        assert_eq!(eval_str("[1, NaN].indexOf(NaN)"), "-1");
        assert_eq!(eval_str("[1, 2, 3, 4].slice(1, -1)"), "2,3");
        assert_eq!(eval_str("[1].concat([2, 3], 4)"), "1,2,3,4");
        assert_eq!(eval_str("[1, 2, 3].reverse()"), "3,2,1");
    }

    #[test]
    fn test_push_pop_shift_unshift() {
        let source = r#"
            const a = [2]
            a.push(3, 4)
            a.unshift(1)
            const last = a.pop()
            const first = a.shift()
            const summary = [first, last, a.length]
            summary.join(' ')
        "#;
        assert_eq!(eval_str(source), "1 4 2");
    }

    #[test]
    fn test_reduce_empty_without_initial_value() {
        assert_eq!(
            eval_message("[].reduce((a, b) => a + b)"),
            "Reduce of empty array with no initial value"
        );
    }

    #[test]
    fn test_sort_default_is_string_order() {
        assert_eq!(eval_str("[10, 9, 1, undefined, 2].sort()"), "1,10,2,9,");
    }

    #[test]
    fn test_sort_with_comparator_is_stable() {
        let source = r#"
            const xs = [{k: 1, v: 'a'}, {k: 0, v: 'b'}, {k: 1, v: 'c'}]
            xs.sort((x, y) => x.k - y.k).map(x => x.v).join('')
        "#;
        assert_eq!(eval_str(source), "bac");
    }

    #[test]
    fn test_sort_comparator_error_propagates() {
        assert_eq!(
            eval_message("[2, 1].sort(() => { throw new Error('cmp') })"),
            "cmp"
        );
    }

    #[test]
    fn test_math() {
        assert_eq!(eval_str("Math.max(1, 5, 3)"), "5");
        assert_eq!(eval_str("Math.min()"), "Infinity");
        assert_eq!(eval_str("Math.round(2.5)"), "3");
        assert_eq!(eval_str("Math.round(-2.5)"), "-2");
        assert_eq!(eval_str("Math.floor(Math.PI)"), "3");
        assert_eq!(eval_str("typeof Math.random"), "undefined");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(eval_str("parseInt('42px')"), "42");
        assert_eq!(eval_str("parseInt('ff', 16)"), "255");
        assert_eq!(eval_str("parseInt('0x1A')"), "26");
        assert_eq!(eval_str("parseInt('x')"), "NaN");
        assert_eq!(eval_str("parseFloat('3.14abc')"), "3.14");
        assert_eq!(eval_str("parseFloat('.5e1')"), "5");
        assert_eq!(eval_str("Number('12')"), "12");
        assert_eq!(eval_str("String(null)"), "null");
        assert_eq!(eval_str("Boolean('')"), "false");
        assert_eq!(eval_str("isNaN('abc')"), "true");
        assert_eq!(eval_str("Array.isArray([])"), "true");
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(eval_str("(1.005).toFixed(2)"), "1.00");
        assert_eq!(eval_str("(2.5).toFixed(0)"), "3");
        assert_eq!(eval_str("(3).toFixed(2)"), "3.00");
        assert_eq!(eval_str("(-0.001).toFixed(2)"), "-0.00");
        assert_eq!(eval_str("(-1.5).toFixed(0)"), "-2");
    }

    #[test]
    fn test_json_stringify() {
        assert_eq!(
            eval_str("JSON.stringify({a: 1, b: [true, null, 'x']})"),
            r#"{"a":1,"b":[true,null,"x"]}"#
        );
        assert_eq!(eval_str("JSON.stringify({b: 1, a: 2})"), r#"{"b":1,"a":2}"#);
        assert_eq!(eval_str("JSON.stringify([1], null, 2)"), "[\n  1\n]");
        assert_eq!(eval_str("typeof JSON.stringify(undefined)"), "undefined");
    }

    #[test]
    fn test_property_access_on_undefined() {
        assert_eq!(
            eval_message("let u; u.x"),
            "Cannot read properties of undefined (reading 'x')"
        );
        assert_eq!(
            eval_message("let u; u.x = 1"),
            "Cannot set properties of undefined (setting 'x')"
        );
    }

    #[test]
    fn test_array_length_and_index_writes() {
        assert_eq!(eval_str("const a = []; a[2] = 'x'; a.length"), "3");
        assert_eq!(eval_str("const a = [1, 2, 3]; a.length = 1; a"), "1");
    }

    #[test]
    fn test_error_constructors() {
        assert_eq!(eval_str("String(new TypeError('t'))"), "TypeError: t");
        assert_eq!(eval_str("RangeError('r').name"), "RangeError");
        assert_eq!(eval_str("new Error().message"), "");
    }
}
