// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::utils::{contains, ensure_args_count, ensure_args_range};
use crate::builtins::{BuiltinEnv, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, BuiltinFcn>) {
    m.insert("isAdmin", (is_admin, 0));
    m.insert("isBlacklisted", (is_blacklisted, 1));
}

const ADMIN_ROLE: &str = "admin";

fn is_admin(span: &Span, params: &[Ref<Expr>], args: &[Value], env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "isAdmin", params, args, 0)?;
    let principal = &env.context["P"];
    let admin = Value::from(ADMIN_ROLE);
    Ok(Value::Bool(
        principal["role"] == admin
            || contains(&principal["roles"], &admin)
            || principal["isAdmin"] == Value::Bool(true),
    ))
}

// Without an argument: is the requesting principal or the target resource
// blacklisted. With an id: is that id among the blacklisted ids.
fn is_blacklisted(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_range(span, "isBlacklisted", params, args, 0, 1)?;
    let blacklist = &env.context["blacklist"];
    Ok(Value::Bool(match args.first() {
        None => blacklist["principal"].is_truthy() || blacklist["resource"].is_truthy(),
        Some(id @ Value::String(_)) => contains(&blacklist["ids"], id),
        Some(_) => false,
    }))
}
