// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Condition expression interpreter.
//!
//! Expressions are parsed into an [`Expr`] tree and evaluated by walking it.
//! Every node kind is dispatched explicitly; there is no fallback that hands
//! source text to anything else.

mod access;
mod calls;
mod eval;
mod operators;
mod quantifiers;

#[cfg(test)]
mod tests;

use crate::ast::{Expr, Ref};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, EvalError, ParseError};
use crate::parser::{parse_expression, DEFAULT_MAX_DEPTH};
use crate::value::Value;
use eval::Evaluator;

/// Evaluates expressions against one read-only context.
///
/// Soft failures, such as reading a property of `undefined`, do not abort
/// evaluation. They are collected and can be drained with
/// [`Interpreter::take_diagnostics`].
pub struct Interpreter<'a> {
    context: &'a Value,
    clock: &'a dyn Clock,
    max_depth: usize,
    diagnostics: Vec<EvalError>,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a Value, clock: &'a dyn Clock) -> Self {
        Self {
            context,
            clock,
            max_depth: DEFAULT_MAX_DEPTH,
            diagnostics: vec![],
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn context(&self) -> &'a Value {
        self.context
    }

    /// Parse `text`, reporting errors under `name`.
    pub fn parse(&self, name: &str, text: &str) -> Result<Ref<Expr>, ParseError> {
        parse_expression(name, text, self.max_depth)
    }

    /// Evaluate a parsed expression.
    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let mut evaluator = Evaluator::new(self.context, self.clock);
        let result = evaluator.evaluate_value(expr);
        self.diagnostics.append(&mut evaluator.take_diagnostics());
        result
    }

    /// Parse and evaluate `text`.
    pub fn eval_str(&mut self, name: &str, text: &str) -> Result<Value, Error> {
        let expr = self.parse(name, text)?;
        Ok(self.eval_expr(&expr)?)
    }

    /// Parse and evaluate `text`, coercing the result with truthiness.
    pub fn eval_bool_str(&mut self, name: &str, text: &str) -> Result<bool, Error> {
        Ok(self.eval_str(name, text)?.is_truthy())
    }

    pub fn take_diagnostics(&mut self) -> Vec<EvalError> {
        std::mem::take(&mut self.diagnostics)
    }
}

/// Evaluate a single expression against `context` using the system clock.
pub fn evaluate(expr: &str, context: &Value) -> Result<Value, Error> {
    Interpreter::new(context, &SystemClock).eval_str("<expr>", expr)
}
