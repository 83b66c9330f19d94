// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, LogicalOp, UnaryOp};
use crate::clock::Clock;
use crate::error::EvalError;
use crate::value::Value;

pub(super) struct Evaluator<'a> {
    pub(super) context: &'a Value,
    pub(super) clock: &'a dyn Clock,
    variables: Vec<VariableBinding>,
    diagnostics: Vec<EvalError>,
}

struct VariableBinding {
    name: String,
    value: Value,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(context: &'a Value, clock: &'a dyn Clock) -> Self {
        Self {
            context,
            clock,
            variables: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(super) fn evaluate_value(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Array { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate_value(item)?);
                }
                Ok(Value::from(values))
            }
            Expr::Ident { name, .. } => Ok(self.eval_identifier(name)),
            Expr::Member {
                span,
                object,
                property,
            } => self.eval_member(span, object, property.text()),
            Expr::Index {
                span,
                object,
                index,
            } => self.eval_index(span, object, index),
            Expr::Call { span, fcn, params } => self.eval_call(span, fcn, params),
            Expr::Lambda { span, .. } => Err(span.eval_error(
                "arrow functions can only be passed to all, exists, exists_one, filter or map",
            )),
            Expr::UnaryExpr { span, op, expr } => {
                let value = self.evaluate_value(expr)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        Value::Undefined => Ok(Value::Undefined),
                        v => Err(span.eval_error(&format!("cannot negate {}", v.type_name()))),
                    },
                }
            }
            Expr::ArithExpr { span, op, lhs, rhs } => {
                let lhs = self.evaluate_value(lhs)?;
                let rhs = self.evaluate_value(rhs)?;
                super::operators::arith(span, *op, &lhs, &rhs)
            }
            Expr::BoolExpr { op, lhs, rhs, .. } => {
                let lhs = self.evaluate_value(lhs)?;
                let rhs = self.evaluate_value(rhs)?;
                Ok(Value::Bool(super::operators::compare(*op, &lhs, &rhs)))
            }
            Expr::LogicalExpr { op, lhs, rhs, .. } => {
                let left = self.evaluate_value(lhs)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.evaluate_value(rhs),
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.evaluate_value(test)?.is_truthy() {
                    self.evaluate_value(consequent)
                } else {
                    self.evaluate_value(alternate)
                }
            }
        }
    }

    fn eval_identifier(&self, name: &str) -> Value {
        match self.lookup_variable(name) {
            Some(v) => v,
            None => self.context[name].clone(),
        }
    }

    pub(super) fn record(&mut self, error: EvalError) {
        tracing::debug!(error = %error, "recovered evaluation error");
        self.diagnostics.push(error);
    }

    pub(super) fn take_diagnostics(&mut self) -> Vec<EvalError> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(super) fn push_variable(&mut self, name: &str, value: Value) {
        self.variables.push(VariableBinding {
            name: name.to_string(),
            value,
        });
    }

    pub(super) fn pop_variable(&mut self) {
        let _ = self.variables.pop();
    }

    pub(super) fn lookup_variable(&self, name: &str) -> Option<Value> {
        self.variables
            .iter()
            .rev()
            .find(|binding| binding.name == name)
            .map(|binding| binding.value.clone())
    }
}
