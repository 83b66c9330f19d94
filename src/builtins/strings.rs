// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::utils::{as_int, contains, ensure_args_count, ensure_args_range};
use crate::builtins::{BuiltinEnv, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, BuiltinFcn>) {
    m.insert("contains", (contains_fcn, 2));
    m.insert("endsWith", (ends_with, 2));
    m.insert("lower", (lower, 1));
    m.insert("matches", (matches, 2));
    m.insert("split", (split, 2));
    m.insert("startsWith", (starts_with, 2));
    m.insert("substring", (substring, 3));
    m.insert("upper", (upper, 1));
}

fn contains_fcn(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "contains", params, args, 2)?;
    Ok(Value::Bool(match &args[0] {
        Value::String(_) | Value::Array(_) => contains(&args[0], &args[1]),
        _ => false,
    }))
}

fn starts_with(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "startsWith", params, args, 2)?;
    Ok(Value::Bool(match (&args[0], &args[1]) {
        (Value::String(s), Value::String(p)) => s.starts_with(p.as_ref()),
        _ => false,
    }))
}

fn ends_with(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "endsWith", params, args, 2)?;
    Ok(Value::Bool(match (&args[0], &args[1]) {
        (Value::String(s), Value::String(p)) => s.ends_with(p.as_ref()),
        _ => false,
    }))
}

fn lower(span: &Span, params: &[Ref<Expr>], args: &[Value], _env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "lower", params, args, 1)?;
    Ok(match &args[0] {
        Value::String(s) => Value::from(s.to_lowercase()),
        _ => Value::Null,
    })
}

fn upper(span: &Span, params: &[Ref<Expr>], args: &[Value], _env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "upper", params, args, 1)?;
    Ok(match &args[0] {
        Value::String(s) => Value::from(s.to_uppercase()),
        _ => Value::Null,
    })
}

pub fn split_string(s: &str, sep: &str) -> Value {
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::from).collect()
    };
    Value::from(parts)
}

fn split(span: &Span, params: &[Ref<Expr>], args: &[Value], _env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "split", params, args, 2)?;
    Ok(match (&args[0], &args[1]) {
        (Value::String(s), Value::String(sep)) => split_string(s, sep),
        _ => Value::Null,
    })
}

/// Character-based substring. Bounds are clamped and swapped when reversed.
pub fn substring_of(s: &str, start: i64, end: Option<i64>) -> Value {
    let len = s.chars().count() as i64;
    let clamp = |i: i64| i.clamp(0, len);
    let (mut from, mut to) = (clamp(start), clamp(end.unwrap_or(len)));
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }
    Value::from(
        s.chars()
            .skip(from as usize)
            .take((to - from) as usize)
            .collect::<String>(),
    )
}

fn substring(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_range(span, "substring", params, args, 2, 3)?;
    let Value::String(s) = &args[0] else {
        return Ok(Value::Null);
    };
    let Some(start) = as_int(&args[1]) else {
        return Ok(Value::Null);
    };
    let end = match args.get(2) {
        None | Some(Value::Undefined) => None,
        Some(v) => match as_int(v) {
            Some(e) => Some(e),
            None => return Ok(Value::Null),
        },
    };
    Ok(substring_of(s, start, end))
}

#[cfg(feature = "regex")]
fn matches(span: &Span, params: &[Ref<Expr>], args: &[Value], _env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "matches", params, args, 2)?;
    let (Value::String(s), Value::String(pattern)) = (&args[0], &args[1]) else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match regex::Regex::new(pattern) {
        Ok(re) => re.is_match(s),
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "invalid regular expression");
            false
        }
    }))
}

// Without the regex engine only literal patterns can be honoured.
#[cfg(not(feature = "regex"))]
fn matches(span: &Span, params: &[Ref<Expr>], args: &[Value], _env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "matches", params, args, 2)?;
    Ok(Value::Bool(match (&args[0], &args[1]) {
        (Value::String(s), Value::String(pattern)) => s.as_ref() == pattern.as_ref(),
        _ => false,
    }))
}
