// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::utils::{collection, contains, ensure_args_count};
use crate::builtins::{BuiltinEnv, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, BuiltinFcn>) {
    m.insert("hasIntersection", (has_intersection, 2));
    m.insert("intersect", (intersect, 2));
    m.insert("isIn", (is_in, 2));
    m.insert("isSubset", (is_subset, 2));
    m.insert("size", (size, 1));
}

fn is_in(span: &Span, params: &[Ref<Expr>], args: &[Value], _env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "isIn", params, args, 2)?;
    Ok(Value::Bool(contains(&args[1], &args[0])))
}

fn intersect(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "intersect", params, args, 2)?;
    let (Some(a), Some(b)) = (collection(&args[0]), collection(&args[1])) else {
        return Ok(Value::new_array());
    };
    let mut out: Vec<Value> = vec![];
    for v in a {
        if b.contains(v) && !out.contains(v) {
            out.push(v.clone());
        }
    }
    Ok(Value::from(out))
}

fn is_subset(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "isSubset", params, args, 2)?;
    Ok(Value::Bool(
        match (collection(&args[0]), collection(&args[1])) {
            (Some(a), Some(b)) => a.iter().all(|v| b.contains(v)),
            _ => false,
        },
    ))
}

fn has_intersection(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "hasIntersection", params, args, 2)?;
    Ok(Value::Bool(
        match (collection(&args[0]), collection(&args[1])) {
            (Some(a), Some(b)) => a.iter().any(|v| b.contains(v)),
            _ => false,
        },
    ))
}

fn size(span: &Span, params: &[Ref<Expr>], args: &[Value], _env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "size", params, args, 1)?;
    Ok(match &args[0] {
        Value::Array(a) => Value::from(a.len()),
        Value::Object(o) => Value::from(o.len()),
        Value::String(s) => Value::from(s.chars().count()),
        Value::Undefined | Value::Null => Value::from(0usize),
        _ => Value::Null,
    })
}
