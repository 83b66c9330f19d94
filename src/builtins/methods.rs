// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Methods callable on string and array values, e.g. `P.name.toLowerCase()`.

use crate::builtins::strings::split_string;
use crate::builtins::utils::contains;
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::{bail, Result};
use lazy_static::lazy_static;

pub type MethodFcn = fn(&Span, &Value, &[Value]) -> Result<Value>;

#[rustfmt::skip]
lazy_static! {
    pub static ref METHODS: HashMap<&'static str, MethodFcn> = {
	let mut m : HashMap<&'static str, MethodFcn> = HashMap::new();

	m.insert("endsWith", ends_with);
	m.insert("includes", includes);
	m.insert("indexOf", index_of);
	m.insert("join", join);
	m.insert("split", split);
	m.insert("startsWith", starts_with);
	m.insert("toLowerCase", to_lower_case);
	m.insert("toUpperCase", to_upper_case);
	m.insert("trim", trim);

	m
    };
}

fn unsupported(span: &Span, name: &str, receiver: &Value) -> anyhow::Error {
    anyhow::anyhow!(span.message(
        "error",
        &format!("`{name}` is not a method of {}", receiver.type_name())
    ))
}

fn ensure_arity(span: &Span, name: &str, args: &[Value], max: usize) -> Result<()> {
    if args.len() > max {
        bail!(span.message(
            "error",
            &format!("`{name}` expects at most {max} arguments")
        ));
    }
    Ok(())
}

fn includes(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "includes", args, 1)?;
    let needle = args.first().unwrap_or(&Value::Undefined);
    match receiver {
        Value::String(_) | Value::Array(_) => Ok(Value::Bool(contains(receiver, needle))),
        _ => Err(unsupported(span, "includes", receiver)),
    }
}

fn index_of(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "indexOf", args, 1)?;
    let needle = args.first().unwrap_or(&Value::Undefined);
    let idx = match (receiver, needle) {
        (Value::Array(a), _) => a.iter().position(|v| v == needle),
        (Value::String(s), Value::String(n)) => s
            .find(n.as_ref())
            .map(|byte_idx| s[..byte_idx].chars().count()),
        (Value::String(_), _) => None,
        _ => return Err(unsupported(span, "indexOf", receiver)),
    };
    Ok(match idx {
        Some(i) => Value::from(i),
        None => Value::from(-1i64),
    })
}

fn join(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "join", args, 1)?;
    let Value::Array(items) = receiver else {
        return Err(unsupported(span, "join", receiver));
    };
    let sep = match args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(v) => v.to_display_string(),
    };
    let parts: Vec<String> = items
        .iter()
        .map(|v| match v {
            Value::Null | Value::Undefined => String::new(),
            _ => v.to_display_string(),
        })
        .collect();
    Ok(Value::from(parts.join(&sep)))
}

fn string_receiver<'a>(span: &Span, name: &str, receiver: &'a Value) -> Result<&'a str> {
    match receiver {
        Value::String(s) => Ok(s.as_ref()),
        _ => Err(unsupported(span, name, receiver)),
    }
}

fn split(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "split", args, 1)?;
    let s = string_receiver(span, "split", receiver)?;
    Ok(match args.first() {
        None | Some(Value::Undefined) => Value::from(vec![Value::from(s)]),
        Some(Value::String(sep)) => split_string(s, sep),
        Some(_) => Value::Null,
    })
}

fn starts_with(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "startsWith", args, 1)?;
    let s = string_receiver(span, "startsWith", receiver)?;
    Ok(Value::Bool(match args.first() {
        Some(Value::String(p)) => s.starts_with(p.as_ref()),
        _ => false,
    }))
}

fn ends_with(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "endsWith", args, 1)?;
    let s = string_receiver(span, "endsWith", receiver)?;
    Ok(Value::Bool(match args.first() {
        Some(Value::String(p)) => s.ends_with(p.as_ref()),
        _ => false,
    }))
}

fn to_lower_case(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "toLowerCase", args, 0)?;
    Ok(Value::from(string_receiver(span, "toLowerCase", receiver)?.to_lowercase()))
}

fn to_upper_case(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "toUpperCase", args, 0)?;
    Ok(Value::from(string_receiver(span, "toUpperCase", receiver)?.to_uppercase()))
}

fn trim(span: &Span, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_arity(span, "trim", args, 0)?;
    Ok(Value::from(string_receiver(span, "trim", receiver)?.trim()))
}
