// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{ArithOp, BoolOp};
use crate::builtins::utils::{contains, loose_equals, strict_equals};
use crate::error::EvalError;
use crate::lexer::Span;
use crate::value::Value;

use core::cmp::Ordering;

pub(super) fn arith(span: &Span, op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if lhs.is_undefined() || rhs.is_undefined() {
        return Ok(Value::Undefined);
    }

    let (l, r) = match (op, lhs, rhs) {
        (ArithOp::Add, Value::String(_), _) | (ArithOp::Add, _, Value::String(_)) => {
            let mut s = lhs.to_display_string();
            s.push_str(&rhs.to_display_string());
            return Ok(Value::from(s));
        }
        (_, Value::Number(l), Value::Number(r)) => (*l, *r),
        _ => {
            let sym = match op {
                ArithOp::Add => "+",
                ArithOp::Sub => "-",
                ArithOp::Mul => "*",
                ArithOp::Div => "/",
                ArithOp::Mod => "%",
            };
            return Err(span.eval_error(&format!(
                "operator `{sym}` not supported between {} and {}",
                lhs.type_name(),
                rhs.type_name()
            )));
        }
    };

    Ok(Value::Number(match op {
        ArithOp::Add => l + r,
        ArithOp::Sub => l - r,
        ArithOp::Mul => l * r,
        ArithOp::Div | ArithOp::Mod if r == 0.0 => {
            return Err(span.eval_error("division by zero"));
        }
        ArithOp::Div => l / r,
        ArithOp::Mod => l % r,
    }))
}

fn ordering(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

pub(super) fn compare(op: BoolOp, lhs: &Value, rhs: &Value) -> bool {
    match op {
        BoolOp::StrictEq => strict_equals(lhs, rhs),
        BoolOp::StrictNe => !strict_equals(lhs, rhs),
        BoolOp::LooseEq => loose_equals(lhs, rhs),
        BoolOp::LooseNe => !loose_equals(lhs, rhs),
        BoolOp::In => contains(rhs, lhs),
        BoolOp::Lt => ordering(lhs, rhs) == Some(Ordering::Less),
        BoolOp::Le => matches!(ordering(lhs, rhs), Some(Ordering::Less | Ordering::Equal)),
        BoolOp::Gt => ordering(lhs, rhs) == Some(Ordering::Greater),
        BoolOp::Ge => matches!(
            ordering(lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}
