//! Runtime values for the clockwork VM.

use std::fmt;
use std::rc::Rc;

use crate::bytecode::object::{ObjString, Object};

/// A runtime value. Heap data is only reachable through [`Object`] handles
/// handed out by the heap.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Object(Object),
}

impl Value {
    pub fn string(string: Rc<ObjString>) -> Self {
        Value::Object(Object::String(string))
    }

    /// `null` and `false` are falsey, everything else is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Object(Object::String(_)))
    }

    /// Numeric value coerced to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&Rc<ObjString>> {
        match self {
            Value::Object(Object::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Object(obj) => write!(f, "{}", obj),
        }
    }
}

/// Format a float the way C's `%g` does: six significant digits, trailing
/// zeros removed, exponent form for very small or large magnitudes.
pub fn format_float(n: f64) -> String {
    const PRECISION: i32 = 6;

    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rust's exponent formatting already rounds to the requested digits, so
    // the exponent it reports is the one `%g` would pick.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::object::Heap;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_falsey() {
        assert!(Value::Null.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Int(0).is_falsey());
        assert!(!Value::Float(0.0).is_falsey());
    }

    #[test]
    fn test_numeric_equality_across_kinds() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Bool(true));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn test_string_equality_is_identity() {
        let mut heap = Heap::new();
        let a = Value::string(heap.intern("hello"));
        let b = Value::string(heap.intern("hello"));
        let c = Value::string(heap.intern("world"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_format_float_like_percent_g() {
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(0.1 + 0.2), "0.3");
        assert_eq!(format_float(1.0 / 3.0), "0.333333");
        assert_eq!(format_float(123456.0), "123456");
        assert_eq!(format_float(1234567.0), "1.23457e+06");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(0.0), "0");
    }

    #[test]
    fn test_display() {
        let mut heap = Heap::new();
        assert_eq!(Value::Int(-42).to_string(), "-42");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::string(heap.intern("hi")).to_string(), "hi");
    }
}
