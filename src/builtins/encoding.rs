// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::utils::ensure_args_count;
use crate::builtins::{BuiltinEnv, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use data_encoding::BASE64;

pub fn register(m: &mut HashMap<&'static str, BuiltinFcn>) {
    m.insert("base64.decode", (base64_decode, 1));
    m.insert("base64.encode", (base64_encode, 1));
}

fn base64_encode(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    let name = "base64.encode";
    ensure_args_count(span, name, params, args, 1)?;

    Ok(match &args[0] {
        Value::String(s) => Value::from(BASE64.encode(s.as_bytes())),
        _ => Value::Null,
    })
}

fn base64_decode(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    let name = "base64.decode";
    ensure_args_count(span, name, params, args, 1)?;

    let Value::String(encoded) = &args[0] else {
        return Ok(Value::Null);
    };
    // Undecodable text and bytes that are not UTF-8 are both malformed.
    Ok(BASE64
        .decode(encoded.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map_or(Value::Null, Value::from))
}
