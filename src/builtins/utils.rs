// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::lexer::Span;
use crate::value::Value;

use anyhow::{bail, Result};

pub fn ensure_args_count(
    span: &Span,
    fcn: &'static str,
    params: &[Ref<Expr>],
    args: &[Value],
    expected: usize,
) -> Result<()> {
    ensure_args_range(span, fcn, params, args, expected, expected)
}

pub fn ensure_args_range(
    span: &Span,
    fcn: &'static str,
    params: &[Ref<Expr>],
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<()> {
    if args.len() < min || args.len() > max {
        let span = match args.len() > max && !params.is_empty() {
            false => span,
            true => params[params.len() - 1].span(),
        };
        let expected = match (min, max) {
            (1, 1) => "1 argument".to_string(),
            (n, m) if n == m => format!("{n} arguments"),
            (n, m) => format!("{n} to {m} arguments"),
        };
        bail!(span.message("error", &format!("`{fcn}` expects {expected}")))
    }
    Ok(())
}

/// Items of an array argument. `undefined` and `null` read as empty.
pub fn collection(v: &Value) -> Option<&[Value]> {
    match v {
        Value::Array(a) => Some(a.as_slice()),
        Value::Undefined | Value::Null => Some(&[]),
        _ => None,
    }
}

/// Integer view of a numeric argument.
pub fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) if n.is_finite() => Some(n.trunc() as i64),
        _ => None,
    }
}

/// Strict equality of two values: structural, NaN never equal.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    a == b
}

/// Loose equality: numbers and numeric strings compare by value,
/// `null` and `undefined` are equal to each other.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match s.trim().parse::<f64>() {
                Ok(m) => m == *n,
                Err(_) => s.trim().is_empty() && *n == 0.0,
            }
        }
        (Value::Bool(x), Value::Number(n)) | (Value::Number(n), Value::Bool(x)) => {
            (if *x { 1.0 } else { 0.0 }) == *n
        }
        _ => strict_equals(a, b),
    }
}

/// Membership used by `in`, `isIn` and `includes`.
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(a) => a.iter().any(|v| strict_equals(v, needle)),
        Value::Object(o) => match needle {
            Value::String(k) => o.contains_key(k.as_ref()),
            _ => false,
        },
        Value::String(s) => match needle {
            Value::String(n) => s.contains(n.as_ref()),
            _ => false,
        },
        _ => false,
    }
}
