// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Expr;
use crate::error::EvalError;
use crate::lexer::Span;
use crate::value::Value;

use super::eval::Evaluator;

impl<'a> Evaluator<'a> {
    pub(super) fn eval_member(
        &mut self,
        span: &Span,
        object: &Expr,
        property: &str,
    ) -> Result<Value, EvalError> {
        let object = self.evaluate_value(object)?;
        Ok(self.read_property(span, &object, property))
    }

    pub(super) fn eval_index(
        &mut self,
        span: &Span,
        object: &Expr,
        index: &Expr,
    ) -> Result<Value, EvalError> {
        let object = self.evaluate_value(object)?;
        let index = self.evaluate_value(index)?;
        Ok(match (&object, &index) {
            (Value::Array(_), Value::Number(_)) => object[&index].clone(),
            (Value::String(s), Value::Number(n)) => {
                if n.fract() == 0.0 && *n >= 0.0 {
                    s.chars()
                        .nth(*n as usize)
                        .map_or(Value::Undefined, |c| Value::from(c.to_string()))
                } else {
                    Value::Undefined
                }
            }
            (_, Value::String(key)) => self.read_property(span, &object, key),
            (Value::Undefined | Value::Null, _) => {
                self.read_property(span, &object, &index.to_display_string())
            }
            _ => Value::Undefined,
        })
    }

    // Reading from undefined or null is recorded and yields undefined.
    pub(super) fn read_property(&mut self, span: &Span, object: &Value, property: &str) -> Value {
        match object {
            Value::Object(_) => object[property].clone(),
            Value::Array(a) if property == "length" => Value::from(a.len()),
            Value::String(s) if property == "length" => Value::from(s.chars().count()),
            Value::Undefined | Value::Null => {
                self.record(span.eval_error(&format!(
                    "cannot read property `{property}` of {}",
                    object.type_name()
                )));
                Value::Undefined
            }
            _ => Value::Undefined,
        }
    }
}
